//! Row format shared by the cumulative database and the snapshot files.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use chrono::NaiveDate;
use profwatch_core::ProfileRecord;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub(crate) const URL_COLUMN: &str = "profile_url";

/// Column order on disk. Must match the field order of [`ProfileRow`].
pub(crate) const COLUMNS: [&str; 13] = [
    URL_COLUMN,
    "title",
    "username",
    "description",
    "price",
    "phone",
    "skype",
    "kik",
    "posted_by",
    "posted_time",
    "images",
    "image_count",
    "scrape_date",
];

pub(crate) const IMAGE_DELIMITER: char = '|';
const DATE_FORMAT: &str = "%Y-%m-%d";

/// One CSV row. Field order is the column order on disk, see [`COLUMNS`].
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ProfileRow {
    pub profile_url: String,
    pub title: String,
    pub username: String,
    pub description: String,
    pub price: String,
    pub phone: String,
    pub skype: String,
    pub kik: String,
    pub posted_by: String,
    pub posted_time: String,
    pub images: String,
    pub image_count: usize,
    pub scrape_date: String,
}

impl From<&ProfileRecord> for ProfileRow {
    fn from(record: &ProfileRecord) -> Self {
        let mut images = String::new();
        for (i, url) in record.image_urls.iter().enumerate() {
            if i > 0 {
                images.push(IMAGE_DELIMITER);
            }
            images.push_str(url);
        }
        Self {
            profile_url: record.url.clone(),
            title: record.title.clone(),
            username: record.username.clone(),
            description: record.description.clone(),
            price: record.price.clone(),
            phone: record.phone.clone(),
            skype: record.skype.clone(),
            kik: record.kik.clone(),
            posted_by: record.posted_by.clone(),
            posted_time: record.posted_time.clone(),
            images,
            image_count: record.image_count(),
            scrape_date: record.scrape_date.format(DATE_FORMAT).to_string(),
        }
    }
}

impl ProfileRow {
    pub(crate) fn into_record(self) -> Result<ProfileRecord, String> {
        let scrape_date = NaiveDate::parse_from_str(&self.scrape_date, DATE_FORMAT)
            .map_err(|e| {
                format!(
                    "bad scrape_date {:?} for {}: {e}",
                    self.scrape_date, self.profile_url
                )
            })?;
        let image_urls = if self.images.is_empty() {
            Vec::new()
        } else {
            self.images
                .split(IMAGE_DELIMITER)
                .map(str::to_string)
                .collect()
        };
        Ok(ProfileRecord {
            url: self.profile_url,
            title: self.title,
            username: self.username,
            description: self.description,
            price: self.price,
            phone: self.phone,
            skype: self.skype,
            kik: self.kik,
            posted_by: self.posted_by,
            posted_time: self.posted_time,
            image_urls,
            scrape_date,
        })
    }
}

/// Normalizes a raw header cell: lossy UTF-8, byte-order mark and
/// surrounding whitespace removed.
pub(crate) fn header_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_start_matches('\u{feff}')
        .trim()
        .to_string()
}

/// Checks that the CSV file at `path` has exactly the [`COLUMNS`] header.
///
/// An empty file passes, since the header is written on first append.
///
/// # Errors
///
/// Returns [`StoreError::Schema`] when the header differs, or
/// [`StoreError::Csv`] when it cannot be read.
pub(crate) fn check_header(path: &Path) -> Result<(), StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| StoreError::csv(path, e))?;
    let headers = reader
        .byte_headers()
        .map_err(|e| StoreError::csv(path, e))?;
    if headers.is_empty() {
        return Ok(());
    }

    let found: Vec<String> = headers.iter().map(header_name).collect();
    if found.iter().map(String::as_str).eq(COLUMNS) {
        Ok(())
    } else {
        Err(StoreError::Schema {
            path: path.to_path_buf(),
            reason: format!(
                "columns are [{}], expected [{}]",
                found.join(","),
                COLUMNS.join(",")
            ),
        })
    }
}

/// Appends `records` to the CSV file at `path`, creating it if needed.
///
/// The header row is written only when the file is new or empty. An existing
/// file must carry exactly the [`COLUMNS`] header, otherwise nothing is
/// written. If the existing file does not end in a newline one is added
/// first so the new rows never merge into the last existing row.
///
/// # Errors
///
/// Returns [`StoreError::Schema`] for a file with a different header, or
/// [`StoreError::Io`] / [`StoreError::Csv`] if reading or writing fails.
pub(crate) fn append_rows(path: &Path, records: &[&ProfileRecord]) -> Result<(), StoreError> {
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;

    let len = file.metadata().map_err(|e| StoreError::io(path, e))?.len();
    if len > 0 {
        check_header(path)?;
    }
    if len > 0 && !ends_with_newline(&mut file).map_err(|e| StoreError::io(path, e))? {
        file.write_all(b"\n").map_err(|e| StoreError::io(path, e))?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(len == 0)
        .from_writer(file);
    for record in records {
        writer
            .serialize(ProfileRow::from(*record))
            .map_err(|e| StoreError::csv(path, e))?;
    }
    writer.flush().map_err(|e| StoreError::io(path, e))?;

    let file = writer
        .into_inner()
        .map_err(|e| StoreError::io(path, e.into_error()))?;
    file.sync_all().map_err(|e| StoreError::io(path, e))
}

fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Reads every row of the CSV file at `path`.
pub(crate) fn read_rows(path: &Path) -> Result<Vec<ProfileRow>, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| StoreError::csv(path, e))?;
    reader
        .deserialize::<ProfileRow>()
        .map(|row| row.map_err(|e| StoreError::csv(path, e)))
        .collect()
}
