//! One scrape run: walk the listing, filter out known profiles, fetch the
//! new ones and persist them.
//!
//! Only a failure to fetch the first listing page or to write the database
//! or snapshot aborts the run. Individual profile failures are logged and
//! skipped so the rest of the run is still recorded.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate, NaiveDateTime};
use profwatch_core::{AppConfig, ProfileRecord};
use profwatch_scraper::{
    extract_links, extract_profile, listing_is_exhausted, ProfileClient, ScraperError,
};
use profwatch_store::{
    snapshot_path, write_snapshot, KnownProfiles, LinkEntry, LinkIndex, LinkIndexUpdate,
    ProfileDatabase,
};
use url::Url;

/// Listing walk stops after this many pages in a row without profile links.
const MAX_CONSECUTIVE_EMPTY_PAGES: u32 = 3;

/// Progress of a run, in the order the steps happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum RunState {
    Start,
    ListingFetched,
    LinksFiltered,
    ProfilesProcessed,
    Written,
    Done,
}

impl RunState {
    fn advance(&mut self, next: Self) {
        debug_assert!(next > *self, "run state moved backwards: {self:?} -> {next:?}");
        tracing::debug!(from = ?*self, to = ?next, "run state");
        *self = next;
    }
}

/// Result of fetching and extracting one candidate profile.
#[derive(Debug)]
pub(crate) enum ProfileOutcome {
    Recorded(ProfileRecord),
    Failed { url: String, error: ScraperError },
}

#[derive(Debug)]
pub(crate) struct RunReport {
    pub state: RunState,
    /// Distinct profile links found across all listing pages.
    pub links_found: usize,
    /// Links not yet in the database.
    pub candidates: usize,
    /// Profiles appended to the database during this run.
    pub new_profiles: usize,
    /// Candidate URLs whose fetch failed; they stay unknown and are retried
    /// on the next run.
    pub failed: Vec<String>,
    /// `None` when the index could not be written.
    pub link_index: Option<LinkIndexUpdate>,
    /// Path of the snapshot written, if any profiles were new.
    pub snapshot: Option<PathBuf>,
}

impl RunReport {
    pub(crate) fn summary(&self) -> String {
        let mut line = format!("found {} new profiles", self.new_profiles);
        if !self.failed.is_empty() {
            line.push_str(&format!(" ({} failed)", self.failed.len()));
        }
        line
    }
}

/// Entry point for `profwatch run`.
///
/// # Errors
///
/// Returns an error if the database cannot be loaded, the first listing page
/// cannot be fetched, or the results cannot be written.
pub(crate) async fn run_command(config: &AppConfig) -> anyhow::Result<()> {
    let client = ProfileClient::from_config(config).context("failed to build HTTP client")?;
    let database = ProfileDatabase::new(config.database_path());
    let mut known = database.load_known().with_context(|| {
        format!(
            "failed to load known profiles from {}",
            database.path().display()
        )
    })?;

    let report = run_once(config, &client, &mut known, Local::now().naive_local()).await?;
    println!("{}", report.summary());
    Ok(())
}

/// Runs one scrape against the listing in `config`.
///
/// `known` holds the URLs already in the database and gains every URL
/// written during the run. `now` stamps the link index; its date names the
/// snapshot and is recorded as each profile's scrape date.
///
/// # Errors
///
/// Returns an error if the first listing page cannot be fetched (nothing is
/// written in that case), or if appending to the database or writing the
/// snapshot fails.
pub(crate) async fn run_once(
    config: &AppConfig,
    client: &ProfileClient,
    known: &mut KnownProfiles,
    now: NaiveDateTime,
) -> anyhow::Result<RunReport> {
    let today = now.date();
    let mut state = RunState::Start;
    tracing::info!(
        listing = %config.listing_url,
        known = known.len(),
        "starting scrape run"
    );

    let entries = walk_listing(config, client, now).await?;
    state.advance(RunState::ListingFetched);

    let link_index = update_link_index(config, &entries);

    let candidates = known.unseen(entries.iter().map(|entry| entry.profile_url.as_str()));
    tracing::info!(
        links = entries.len(),
        new = candidates.len(),
        "filtered listing links against database"
    );
    state.advance(RunState::LinksFiltered);

    let total = candidates.len();
    let mut outcomes = Vec::with_capacity(total);
    for (index, url) in candidates.into_iter().enumerate() {
        tracing::info!(url = %url, "fetching profile {}/{total}", index + 1);
        outcomes.push(process_profile(client, url, today).await);
    }
    state.advance(RunState::ProfilesProcessed);

    let mut records = Vec::with_capacity(outcomes.len());
    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome {
            ProfileOutcome::Recorded(record) => records.push(record),
            ProfileOutcome::Failed { url, error } => {
                tracing::error!(url = %url, error = %error, "failed to fetch profile, skipping");
                failed.push(url);
            }
        }
    }
    if !failed.is_empty() {
        tracing::warn!(
            failed = failed.len(),
            total,
            "some profiles could not be fetched"
        );
    }

    let database = ProfileDatabase::new(config.database_path());
    let written = database.append(known, &records).with_context(|| {
        format!(
            "failed to append profiles to {}",
            database.path().display()
        )
    })?;

    let path = snapshot_path(config.data_dir(), &config.snapshot_prefix, today);
    let wrote_snapshot = write_snapshot(&path, &written)
        .with_context(|| format!("failed to write snapshot {}", path.display()))?;
    let snapshot = wrote_snapshot.then_some(path);
    state.advance(RunState::Written);

    let report = RunReport {
        state: RunState::Done,
        links_found: entries.len(),
        candidates: total,
        new_profiles: written.len(),
        failed,
        link_index,
        snapshot,
    };
    state.advance(report.state);
    tracing::info!(
        new_profiles = report.new_profiles,
        failed = report.failed.len(),
        links = report.links_found,
        candidates = report.candidates,
        link_index = ?report.link_index,
        snapshot = ?report.snapshot,
        "{}",
        report.summary()
    );
    Ok(report)
}

/// Fetches every listing page and returns the distinct profile links found.
///
/// A failure on the first page is fatal. Later pages end the walk early
/// when they fail, report no ads, or come back empty too many times in a row.
async fn walk_listing(
    config: &AppConfig,
    client: &ProfileClient,
    now: NaiveDateTime,
) -> anyhow::Result<Vec<LinkEntry>> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    let mut consecutive_empty = 0u32;

    for page in 1..=config.listing_max_pages {
        let page_url = listing_page_url(&config.listing_url, page);
        tracing::info!(url = %page_url, page, "fetching listing page");

        let html = match client.fetch(page_url.as_str()).await {
            Ok(html) => html,
            Err(err) if page == 1 => {
                return Err(anyhow::Error::new(err)
                    .context(format!("failed to fetch listing page {page_url}")));
            }
            Err(err) => {
                tracing::warn!(
                    url = %page_url,
                    error = %err,
                    "listing page failed, keeping links found so far"
                );
                break;
            }
        };

        if listing_is_exhausted(&html) {
            tracing::info!(url = %page_url, "listing reports no more ads");
            break;
        }

        let links = extract_links(&html, &page_url, &config.profile_link_pattern);
        if links.is_empty() {
            consecutive_empty += 1;
            tracing::info!(
                url = %page_url,
                consecutive_empty,
                "no profile links on listing page"
            );
            if consecutive_empty >= MAX_CONSECUTIVE_EMPTY_PAGES {
                break;
            }
            continue;
        }
        consecutive_empty = 0;

        for link in links {
            if seen.insert(link.clone()) {
                entries.push(LinkEntry {
                    profile_url: link,
                    listing_url: page_url.to_string(),
                    page_number: page,
                    discovered_at: now,
                });
            }
        }
        tracing::info!(links = entries.len(), "profile links found so far");
    }

    Ok(entries)
}

/// URL of listing page `page`: the listing itself for page 1, otherwise the
/// page number appended as a path segment.
fn listing_page_url(listing: &Url, page: u32) -> Url {
    if page <= 1 {
        return listing.clone();
    }
    let mut url = listing.clone();
    let path = format!("{}/{page}", listing.path().trim_end_matches('/'));
    url.set_path(&path);
    url
}

fn update_link_index(config: &AppConfig, entries: &[LinkEntry]) -> Option<LinkIndexUpdate> {
    if entries.is_empty() {
        return Some(LinkIndexUpdate::Appended(0));
    }
    let index = LinkIndex::new(config.link_index_path());
    match index.update(entries) {
        Ok(update) => Some(update),
        Err(err) => {
            tracing::warn!(error = %err, "failed to update link index");
            None
        }
    }
}

async fn process_profile(client: &ProfileClient, url: String, today: NaiveDate) -> ProfileOutcome {
    match client.fetch(&url).await {
        Ok(html) => {
            let record = extract_profile(&html, &url, today);
            if record.title.is_empty() && record.username.is_empty() {
                tracing::warn!(url = %url, "profile page had no title or username");
            }
            tracing::info!(
                url = %url,
                images = record.image_count(),
                "scraped profile"
            );
            ProfileOutcome::Recorded(record)
        }
        Err(error) => ProfileOutcome::Failed { url, error },
    }
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
