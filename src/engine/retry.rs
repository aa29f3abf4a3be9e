//! Bounded exponential backoff for outbound backend calls.

use crate::backend::{BackendError, BackendResult};
use crate::config::RetrySettings;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retry policy: bounded attempts with exponential backoff, no jitter, so
/// behaviour stays deterministic under test.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with explicit bounds.
    #[must_use]
    pub const fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            initial_delay,
            max_delay,
        }
    }

    /// Delay before the retry following the given 0-indexed attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Runs an operation, retrying transient failures until the attempt
    /// budget is exhausted. Non-transient failures return immediately.
    ///
    /// # Errors
    ///
    /// Returns the last [`BackendError`] once attempts are exhausted or a
    /// non-transient failure occurs.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> BackendResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BackendResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let out_of_attempts = attempt + 1 >= self.max_attempts;
                    if !error.is_transient() || out_of_attempts {
                        return Err(error);
                    }
                    let delay = self.delay_for(attempt);
                    debug!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "retrying after transient backend failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_millis(settings.initial_delay_ms),
            Duration::from_millis(settings.max_delay_ms),
        )
    }
}
