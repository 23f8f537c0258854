use std::path::Path;

use profwatch_core::AppConfig;
use profwatch_scraper::ProfileClient;
use url::Url;

/// Config pointing at `listing` with every file under `dir`.
pub(crate) fn test_config(listing: &str, dir: &Path) -> AppConfig {
    AppConfig {
        listing_url: Url::parse(listing).unwrap(),
        data_dir: dir.to_path_buf(),
        database_file: "Profile Detail.csv".to_string(),
        link_index_file: "Profile Links.xlsx".to_string(),
        snapshot_prefix: "new_profiles_".to_string(),
        log_file: "scraper.log".to_string(),
        log_level: "info".to_string(),
        request_timeout_secs: 5,
        user_agent: "profwatch-test/1.0".to_string(),
        inter_request_delay_ms: 0,
        max_retries: 0,
        retry_backoff_base_ms: 1,
        listing_max_pages: 1,
        profile_link_pattern: "/ads/details/".to_string(),
    }
}

/// Client with no pacing delay and no retries.
pub(crate) fn test_client() -> ProfileClient {
    ProfileClient::new(5, "profwatch-test/1.0", 0, 0, 1).unwrap()
}
