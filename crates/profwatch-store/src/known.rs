//! The set of profile URLs already recorded in the cumulative database.

use std::collections::HashSet;
use std::path::Path;

use profwatch_core::ProfileRecord;

use crate::csv_file::{header_name, URL_COLUMN};
use crate::error::StoreError;

/// Profile URLs already recorded, loaded from the database at startup.
///
/// The set is an explicit value: it is loaded once, passed into a run, and
/// updated only after records have been written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownProfiles {
    urls: HashSet<String>,
}

impl KnownProfiles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the `profile_url` column of the CSV database at `path`.
    ///
    /// A missing or empty file yields an empty set. Cells are decoded
    /// lossily so a database saved in a legacy encoding still loads; blank
    /// cells are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Csv`] if the file cannot be parsed, or
    /// [`StoreError::Schema`] if it has rows but no `profile_url` column.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no existing database, starting empty");
            return Ok(Self::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| StoreError::csv(path, e))?;

        let headers = reader
            .byte_headers()
            .map_err(|e| StoreError::csv(path, e))?
            .clone();
        if headers.is_empty() {
            return Ok(Self::new());
        }

        let column = headers
            .iter()
            .position(|h| header_name(h) == URL_COLUMN)
            .ok_or_else(|| StoreError::Schema {
                path: path.to_path_buf(),
                reason: format!("missing `{URL_COLUMN}` column"),
            })?;

        let mut urls = HashSet::new();
        for row in reader.byte_records() {
            let row = row.map_err(|e| StoreError::csv(path, e))?;
            if let Some(cell) = row.get(column) {
                let url = String::from_utf8_lossy(cell).trim().to_string();
                if !url.is_empty() {
                    urls.insert(url);
                }
            }
        }

        tracing::info!(path = %path.display(), known = urls.len(), "loaded known profiles");
        Ok(Self { urls })
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Marks `profile` as known. Returns `false` if its URL already was.
    pub fn record(&mut self, profile: &ProfileRecord) -> bool {
        self.urls.insert(profile.url.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Filters `links` down to URLs that are not yet known, keeping the
    /// first occurrence of each and preserving order.
    #[must_use]
    pub fn unseen<'a, I>(&self, links: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen_this_run = HashSet::new();
        links
            .into_iter()
            .filter(|url| !self.contains(url))
            .filter(|url| seen_this_run.insert(*url))
            .map(str::to_string)
            .collect()
    }
}

impl FromIterator<String> for KnownProfiles {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}
