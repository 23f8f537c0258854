//! Rate-limited HTTP client for listing and profile pages.

use std::time::Duration;

use profwatch_core::AppConfig;
use reqwest::Client;
use url::Url;

use crate::error::ScraperError;
use crate::pacer::RequestPacer;
use crate::rate_limit::retry_with_backoff;

/// HTTP client used for every page the scraper touches.
///
/// All requests go through one [`RequestPacer`], so the listing page and
/// profile pages share the same inter-request delay. Transient errors are
/// retried with exponential backoff up to `max_retries` additional attempts,
/// and each retry is paced like any other request.
pub struct ProfileClient {
    client: Client,
    pacer: RequestPacer,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    /// Base delay in milliseconds for exponential backoff: `backoff_base_ms * 2^attempt`.
    backoff_base_ms: u64,
}

impl ProfileClient {
    /// Creates a `ProfileClient` with configured timeout, `User-Agent`, pacing
    /// and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        inter_request_delay_ms: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            pacer: RequestPacer::new(Duration::from_millis(inter_request_delay_ms)),
            max_retries,
            backoff_base_ms,
        })
    }

    /// Builds a client from the scraper settings in [`AppConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, ScraperError> {
        Self::new(
            config.request_timeout_secs,
            &config.user_agent,
            config.inter_request_delay_ms,
            config.max_retries,
            config.retry_backoff_base_ms,
        )
    }

    /// Fetches `url` and returns the response body as text.
    ///
    /// Invalid UTF-8 in the body is replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidUrl`]: `url` is not an absolute URL (not retried).
    /// - [`ScraperError::NotFound`]: HTTP 404 (not retried).
    /// - [`ScraperError::RateLimited`]: HTTP 429 after all retries exhausted.
    /// - [`ScraperError::UnexpectedStatus`]: any other non-2xx status
    ///   (500/502/503/504 retried, the rest not).
    /// - [`ScraperError::Http`]: network failure or timeout after all retries exhausted.
    pub async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        let url = Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;

        let url = &url;
        retry_with_backoff(self.max_retries, self.backoff_base_ms, move || {
            self.pacer.run(self.fetch_once(url))
        })
        .await
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, ScraperError> {
        tracing::debug!(url = %url, "fetching page");

        let response = self
            .client
            .get(url.clone())
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            return Err(ScraperError::RateLimited {
                url: url.to_string(),
                retry_after_secs,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ScraperError::NotFound {
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
