use std::path::{Path, PathBuf};

use url::Url;

#[derive(Clone)]
pub struct AppConfig {
    pub listing_url: Url,
    pub data_dir: PathBuf,
    pub database_file: String,
    pub link_index_file: String,
    pub snapshot_prefix: String,
    pub log_file: String,
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub inter_request_delay_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub listing_max_pages: u32,
    pub profile_link_pattern: String,
}

impl AppConfig {
    /// Returns a copy rooted at `dir` instead of the configured data directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    #[must_use]
    pub fn link_index_path(&self) -> PathBuf {
        self.data_dir.join(&self.link_index_file)
    }

    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(&self.log_file)
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("listing_url", &self.listing_url.as_str())
            .field("data_dir", &self.data_dir)
            .field("database_file", &self.database_file)
            .field("link_index_file", &self.link_index_file)
            .field("snapshot_prefix", &self.snapshot_prefix)
            .field("log_file", &self.log_file)
            .field("log_level", &self.log_level)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("inter_request_delay_ms", &self.inter_request_delay_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("listing_max_pages", &self.listing_max_pages)
            .field("profile_link_pattern", &self.profile_link_pattern)
            .finish()
    }
}
