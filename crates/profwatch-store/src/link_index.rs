//! Spreadsheet index of every profile link discovered on the listing.
//!
//! An xlsx workbook cannot be appended in place, so an update loads the
//! existing sheet, adds the unseen links and rewrites the file through a
//! temporary sibling that is renamed over the original.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Reader, Xlsx};
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Workbook, XlsxError};

use crate::error::StoreError;

const HEADERS: [&str; 4] = ["profile_url", "listing_url", "page_number", "discovered_at"];
const PAGE_NUMBER_COLUMN: usize = 2;

/// One discovered profile link and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    pub profile_url: String,
    pub listing_url: String,
    pub page_number: u32,
    pub discovered_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkIndexUpdate {
    /// The index now holds this many more links.
    Appended(usize),
    /// The existing index could not be read and was left untouched.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct LinkIndex {
    path: PathBuf,
}

impl LinkIndex {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the data rows of the index as text cells, header excluded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Spreadsheet`] if the workbook cannot be opened
    /// or its first sheet cannot be read.
    pub fn rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut workbook: Xlsx<_> =
            open_workbook(&self.path).map_err(|e: calamine::XlsxError| self.error(&e))?;
        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(|e| self.error(&e))?,
            None => return Ok(Vec::new()),
        };

        Ok(range
            .rows()
            .map(|row| row.iter().map(ToString::to_string).collect::<Vec<_>>())
            .filter(|cells| cells.first().is_some_and(|url| !url.is_empty()))
            .filter(|cells| cells.first().map(String::as_str) != Some(HEADERS[0]))
            .collect())
    }

    /// Adds the entries whose `profile_url` is not yet in the index.
    ///
    /// A file that exists but cannot be read is not overwritten; the update
    /// is skipped with a warning so earlier rows are never lost.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the updated workbook cannot be written.
    pub fn update(&self, entries: &[LinkEntry]) -> Result<LinkIndexUpdate, StoreError> {
        let existing = match self.rows() {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(error = %err, "link index unreadable, leaving it untouched");
                return Ok(LinkIndexUpdate::Skipped);
            }
        };

        let mut indexed: HashSet<&str> = existing
            .iter()
            .filter_map(|cells| cells.first().map(String::as_str))
            .collect();
        let fresh: Vec<&LinkEntry> = entries
            .iter()
            .filter(|entry| indexed.insert(entry.profile_url.as_str()))
            .collect();

        if fresh.is_empty() {
            tracing::info!("no new profile links for the index");
            return Ok(LinkIndexUpdate::Appended(0));
        }

        self.save(&existing, &fresh)?;
        tracing::info!(
            path = %self.path.display(),
            added = fresh.len(),
            "updated link index"
        );
        Ok(LinkIndexUpdate::Appended(fresh.len()))
    }

    fn save(&self, existing: &[Vec<String>], fresh: &[&LinkEntry]) -> Result<(), StoreError> {
        let tmp_path = self.path.with_extension("xlsx.tmp");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let xlsx = |e: XlsxError| self.error(&e);

        for (col, header) in (0u16..).zip(HEADERS) {
            sheet.write_string(0, col, header).map_err(xlsx)?;
        }

        let mut rows = 1u32..;
        for (cells, row) in existing.iter().zip(rows.by_ref()) {
            for (index, (col, cell)) in (0u16..).zip(cells).enumerate() {
                match cell.parse::<f64>() {
                    Ok(number) if index == PAGE_NUMBER_COLUMN => {
                        sheet.write_number(row, col, number).map_err(xlsx)?;
                    }
                    _ => {
                        sheet.write_string(row, col, cell).map_err(xlsx)?;
                    }
                }
            }
        }
        for (entry, row) in fresh.iter().zip(rows) {
            sheet.write_string(row, 0, &entry.profile_url).map_err(xlsx)?;
            sheet.write_string(row, 1, &entry.listing_url).map_err(xlsx)?;
            sheet
                .write_number(row, 2, entry.page_number)
                .map_err(xlsx)?;
            let discovered_at = entry.discovered_at.format("%Y-%m-%d %H:%M:%S").to_string();
            sheet.write_string(row, 3, discovered_at).map_err(xlsx)?;
        }

        workbook.save(&tmp_path).map_err(xlsx)?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::io(&self.path, e))
    }

    fn error(&self, err: &dyn std::fmt::Display) -> StoreError {
        StoreError::Spreadsheet {
            path: self.path.clone(),
            reason: err.to_string(),
        }
    }
}
