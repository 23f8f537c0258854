pub mod client;
pub mod error;
pub mod extract;
pub mod pacer;
pub(crate) mod rate_limit;

pub use client::ProfileClient;
pub use error::ScraperError;
pub use extract::{extract_links, extract_profile, listing_is_exhausted};
pub use pacer::RequestPacer;
