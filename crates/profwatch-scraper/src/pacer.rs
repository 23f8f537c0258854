//! Fixed-delay request pacing.
//!
//! Every request made through a [`RequestPacer`] starts at least `delay`
//! after the previous one finished. The first request is not delayed.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
pub struct RequestPacer {
    delay: Duration,
    last_finished: Mutex<Option<Instant>>,
}

impl RequestPacer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_finished: Mutex::new(None),
        }
    }

    /// Runs `request` once the delay since the previous request has elapsed.
    ///
    /// The lock is held for the whole request so callers sharing a pacer are
    /// serialised.
    pub async fn run<F>(&self, request: F) -> F::Output
    where
        F: Future,
    {
        let mut last_finished = self.last_finished.lock().await;
        if let Some(previous) = *last_finished {
            tokio::time::sleep_until(previous + self.delay).await;
        }
        let output = request.await;
        *last_finished = Some(Instant::now());
        output
    }
}
