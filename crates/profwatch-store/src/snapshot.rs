//! Dated per-run snapshot files.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use profwatch_core::ProfileRecord;

use crate::csv_file::append_rows;
use crate::error::StoreError;

/// Path of the snapshot for `date`: `<dir>/<prefix>YYYY_MM_DD.csv`.
#[must_use]
pub fn snapshot_path(dir: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!("{prefix}{}.csv", date.format("%Y_%m_%d")))
}

/// Writes `records` to the snapshot file at `path`.
///
/// Returns `false` without creating a file when `records` is empty. If a
/// snapshot for the same date already exists the rows are appended, so the
/// file accumulates everything discovered that day.
///
/// # Errors
///
/// Returns [`StoreError`] if the file cannot be opened or written.
pub fn write_snapshot(path: &Path, records: &[&ProfileRecord]) -> Result<bool, StoreError> {
    if records.is_empty() {
        tracing::info!("no new profiles, snapshot omitted");
        return Ok(false);
    }
    append_rows(path, records)?;
    tracing::info!(
        path = %path.display(),
        profiles = records.len(),
        "wrote snapshot"
    );
    Ok(true)
}
