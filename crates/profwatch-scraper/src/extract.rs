//! HTML extraction for listing and profile pages.
//!
//! Extraction never fails: a missing element yields an empty field so a
//! visited profile can still be recorded as known.

use std::collections::HashSet;

use chrono::NaiveDate;
use profwatch_core::ProfileRecord;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Notice the site renders past the last populated listing page.
const NO_ADS_NOTICE: &str = "No ads were found";

/// Only thumbnails served from the upload store are profile images.
const IMAGE_PATH_MARKER: &str = "uploads";

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("valid CSS selector")
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(root: ElementRef<'_>, css: &'static str) -> String {
    root.select(&selector(css))
        .next()
        .map(element_text)
        .unwrap_or_default()
}

/// Returns the profile links on a listing page, in page order.
///
/// An anchor is a candidate only when its `href` contains `link_pattern`.
/// Hrefs are resolved against `page_url`, fragments are dropped, and each
/// URL appears once even if the page links it several times.
#[must_use]
pub fn extract_links(html: &str, page_url: &Url, link_pattern: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let anchors = selector("a[href]");

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if !href.contains(link_pattern) {
            continue;
        }
        let Ok(mut resolved) = page_url.join(href) else {
            tracing::debug!(href, "skipping unresolvable profile link");
            continue;
        };
        resolved.set_fragment(None);

        let resolved = String::from(resolved);
        if seen.insert(resolved.clone()) {
            links.push(resolved);
        }
    }

    links
}

/// Returns `true` when the listing page reports that it has no ads.
#[must_use]
pub fn listing_is_exhausted(html: &str) -> bool {
    let document = Html::parse_document(html);
    document
        .select(&selector("div#info_message"))
        .any(|notice| element_text(notice).contains(NO_ADS_NOTICE))
}

/// Finds the innermost `div.row` whose text contains `label`.
fn labelled_row<'a>(root: ElementRef<'a>, label: &str) -> Option<ElementRef<'a>> {
    let rows = selector("div.row");
    root.select(&rows)
        .filter(|row| element_text(*row).contains(label))
        .find(|row| {
            !row
                .select(&rows)
                .any(|inner| element_text(inner).contains(label))
        })
}

fn labelled_value(root: ElementRef<'_>, label: &str) -> String {
    labelled_row(root, label)
        .map(|row| first_text(row, "div.ad_detail_column"))
        .unwrap_or_default()
}

/// Parses a profile page into a [`ProfileRecord`] for `url`.
///
/// Fields are read from the `div.webpanelcontent3` content panel; when the
/// panel is missing the whole document is searched instead. Absent fields
/// are left empty.
#[must_use]
pub fn extract_profile(html: &str, url: &str, scrape_date: NaiveDate) -> ProfileRecord {
    let document = Html::parse_document(html);
    let panel_selector = selector("div.webpanelcontent3");
    let panel = document
        .select(&panel_selector)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut record = ProfileRecord::empty(url, scrape_date);
    record.title = first_text(panel, "a[href=\"#\"]");
    record.description = first_text(panel, "div.ad_detail_column");
    record.price = labelled_value(panel, "Price:");
    record.phone = first_text(panel, "a.phone_value");
    record.skype = first_text(panel, "a.skype_value");
    record.kik = labelled_value(panel, "KiK:");
    record.posted_time = labelled_value(panel, "Posted:");
    record.posted_by = labelled_row(panel, "Posted by:")
        .map(|row| first_text(row, "a"))
        .unwrap_or_default();
    record.username.clone_from(&record.posted_by);
    record.image_urls = extract_image_urls(panel, url);
    record
}

fn extract_image_urls(panel: ElementRef<'_>, page_url: &str) -> Vec<String> {
    let base = Url::parse(page_url).ok();
    panel
        .select(&selector("div.ad-thumbnail-image img[src]"))
        .filter_map(|img| img.value().attr("src").map(str::trim))
        .filter(|src| src.contains(IMAGE_PATH_MARKER))
        .map(|src| match base.as_ref().and_then(|b| b.join(src).ok()) {
            Some(resolved) => String::from(resolved),
            None => src.to_string(),
        })
        .collect()
}
