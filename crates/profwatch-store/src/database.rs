//! Append-only cumulative profile database.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use profwatch_core::ProfileRecord;

use crate::csv_file::{append_rows, check_header, read_rows};
use crate::error::StoreError;
use crate::known::KnownProfiles;

/// The CSV file holding every profile ever recorded.
///
/// Rows are only ever appended. A URL already present is never written again,
/// so a re-scrape of a known profile is a no-op rather than an update.
#[derive(Debug, Clone)]
pub struct ProfileDatabase {
    path: PathBuf,
}

impl ProfileDatabase {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the set of URLs already in the database.
    ///
    /// An existing, non-empty database must have the expected column layout,
    /// so a file that later appends would misalign is rejected up front.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Schema`] for a file with different columns;
    /// otherwise see [`KnownProfiles::load`].
    pub fn load_known(&self) -> Result<KnownProfiles, StoreError> {
        if self.path.is_file() {
            check_header(&self.path)?;
        }
        KnownProfiles::load(&self.path)
    }

    /// Appends every record whose URL is not in `known`, then marks the
    /// written URLs as known.
    ///
    /// Records sharing a URL within `records` are written once. Returns the
    /// records actually written. When nothing is new the file is not touched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be opened or written; `known`
    /// is left unchanged in that case.
    pub fn append<'a>(
        &self,
        known: &mut KnownProfiles,
        records: &'a [ProfileRecord],
    ) -> Result<Vec<&'a ProfileRecord>, StoreError> {
        let mut batch_urls = HashSet::new();
        let fresh: Vec<&ProfileRecord> = records
            .iter()
            .filter(|r| !known.contains(&r.url))
            .filter(|r| batch_urls.insert(r.url.as_str()))
            .collect();

        if fresh.is_empty() {
            return Ok(fresh);
        }

        append_rows(&self.path, &fresh)?;
        for record in &fresh {
            known.record(record);
        }

        tracing::info!(
            path = %self.path.display(),
            appended = fresh.len(),
            "appended profiles to database"
        );
        Ok(fresh)
    }

    /// Reads every record in the database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Csv`] if the file cannot be parsed, or
    /// [`StoreError::Schema`] if a row has an unparseable `scrape_date`.
    pub fn read_all(&self) -> Result<Vec<ProfileRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        read_rows(&self.path)?
            .into_iter()
            .map(|row| {
                row.into_record().map_err(|reason| StoreError::Schema {
                    path: self.path.clone(),
                    reason,
                })
            })
            .collect()
    }
}
