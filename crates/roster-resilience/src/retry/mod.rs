//! Bounded fixed-delay retry.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy: a fixed number of attempts separated by a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay slept between two consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a fixed-delay policy.
    #[must_use]
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Runs `f` until it succeeds, attempts are exhausted, or it fails with
    /// an error `retriable` rejects. The last error is returned on failure.
    ///
    /// At least one attempt is always made, even when `max_attempts` is 0.
    pub async fn execute_if<F, Fut, T, E, P>(&self, mut f: F, retriable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Succeeded on attempt {}/{}", attempt, max_attempts);
                    }
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts && retriable(&e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = self.delay.as_millis() as u64,
                        "Attempt failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(attempt, max_attempts, "Giving up: {}", e);
                    return Err(e);
                }
            }
        }
    }
}
