//! Retry utilities for page fetches.
//!
//! Transient failures (network errors, 429, and gateway-style 5xx statuses)
//! are retried with exponential backoff. Everything else is returned to the
//! caller on the first failure.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// HTTP statuses that indicate a transient server-side condition.
const RETRIABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable errors:
/// - [`ScraperError::RateLimited`]: HTTP 429.
/// - [`ScraperError::Http`]: connection reset, timeout, DNS failure.
/// - [`ScraperError::UnexpectedStatus`] with a status in [`RETRIABLE_STATUSES`].
///
/// [`ScraperError::NotFound`] and [`ScraperError::InvalidUrl`] are never retried.
pub(crate) fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } | ScraperError::Http(_) => true,
        ScraperError::UnexpectedStatus { status, .. } => RETRIABLE_STATUSES.contains(status),
        ScraperError::NotFound { .. } | ScraperError::InvalidUrl { .. } => false,
    }
}

/// Delay before retry number `attempt + 1`: `backoff_base_ms * 2^attempt`,
/// raised to the server's `Retry-After` when that is longer.
fn backoff_delay(err: &ScraperError, backoff_base_ms: u64, attempt: u32) -> Duration {
    let backoff_ms = backoff_base_ms.saturating_mul(1u64 << attempt.min(62));
    let retry_after_ms = match err {
        ScraperError::RateLimited {
            retry_after_secs: Some(secs),
            ..
        } => secs.saturating_mul(1000),
        _ => 0,
    };
    Duration::from_millis(backoff_ms.max(retry_after_ms))
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// Attempts the operation at most `max_retries + 1` times. Non-retriable
/// errors are returned immediately; when retries are exhausted the last error
/// is returned.
///
/// # Backoff schedule (example with `backoff_base_ms = 500`)
///
/// | Attempt | Sleep before next attempt |
/// |---------|--------------------------|
/// | 0 (initial) | none |
/// | 1 (first retry) | 500 ms |
/// | 2 (second retry) | 1 s |
/// | 3 (third retry) | 2 s |
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay = backoff_delay(&err, backoff_base_ms, attempt);
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
