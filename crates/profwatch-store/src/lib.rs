//! File-backed persistence: the known-profile set, the cumulative profile
//! database, dated snapshots and the link index spreadsheet.

mod csv_file;
pub mod database;
pub mod error;
pub mod known;
pub mod link_index;
pub mod snapshot;

pub use database::ProfileDatabase;
pub use error::StoreError;
pub use known::KnownProfiles;
pub use link_index::{LinkEntry, LinkIndex, LinkIndexUpdate};
pub use snapshot::{snapshot_path, write_snapshot};
