use std::path::PathBuf;

use url::Url;

use crate::app_config::AppConfig;
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let listing_url = parse_listing_url(&require("PROFWATCH_LISTING_URL")?)?;

    let data_dir = PathBuf::from(or_default("PROFWATCH_DATA_DIR", "."));
    let database_file = or_default("PROFWATCH_DATABASE_FILE", "Profile Detail.csv");
    let link_index_file = or_default("PROFWATCH_LINK_INDEX_FILE", "Profile Links.xlsx");
    let snapshot_prefix = or_default("PROFWATCH_SNAPSHOT_PREFIX", "new_profiles_");
    let log_file = or_default("PROFWATCH_LOG_FILE", "scraper.log");
    let log_level = or_default("PROFWATCH_LOG_LEVEL", "info");

    let request_timeout_secs = parse_u64("PROFWATCH_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("PROFWATCH_USER_AGENT", DEFAULT_USER_AGENT);
    let inter_request_delay_ms = parse_u64("PROFWATCH_INTER_REQUEST_DELAY_MS", "1000")?;
    let max_retries = parse_u32("PROFWATCH_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("PROFWATCH_RETRY_BACKOFF_BASE_MS", "500")?;

    let listing_max_pages = parse_u32("PROFWATCH_LISTING_MAX_PAGES", "1")?;
    if listing_max_pages == 0 {
        return Err(invalid(
            "PROFWATCH_LISTING_MAX_PAGES",
            "must be at least 1".to_string(),
        ));
    }

    let profile_link_pattern = or_default("PROFWATCH_PROFILE_LINK_PATTERN", "/ads/details/");
    if profile_link_pattern.trim().is_empty() {
        return Err(invalid(
            "PROFWATCH_PROFILE_LINK_PATTERN",
            "must not be empty".to_string(),
        ));
    }

    Ok(AppConfig {
        listing_url,
        data_dir,
        database_file,
        link_index_file,
        snapshot_prefix,
        log_file,
        log_level,
        request_timeout_secs,
        user_agent,
        inter_request_delay_ms,
        max_retries,
        retry_backoff_base_ms,
        listing_max_pages,
        profile_link_pattern,
    })
}

/// Parse the listing URL, accepting only absolute `http`/`https` URLs.
fn parse_listing_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar {
        var: "PROFWATCH_LISTING_URL".to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme \"{other}\""))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
