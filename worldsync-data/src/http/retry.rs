//! Bounded exponential backoff for idempotent requests.

use std::future::Future;
use std::time::Duration;

use log::warn;

use super::FetchError;

/// Statuses treated as transient upstream failures.
pub const RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay, doubled on each retry.
pub const DEFAULT_BACKOFF_FACTOR: Duration = Duration::from_secs(1);

/// Default ceiling for a single delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Outcome of one failed attempt.
#[derive(Debug)]
pub(crate) enum AttemptError {
    /// Worth retrying; carries a description for logs and the final error.
    Retryable(String),
    /// Retrying cannot help.
    Fatal(FetchError),
}

/// Retry schedule shared by every outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_factor: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Set the number of retries after the first attempt.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay.
    #[must_use]
    pub const fn with_backoff_factor(mut self, backoff_factor: Duration) -> Self {
        self.backoff_factor = backoff_factor;
        self
    }

    /// Set the ceiling for a single delay.
    #[must_use]
    pub const fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Number of retries after the first attempt.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether `status` should be retried.
    #[must_use]
    pub fn is_retryable_status(status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }

    /// Delay before retry number `retry` (zero-based): `factor * 2^retry`,
    /// capped at the configured maximum.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        2_u32
            .checked_pow(retry)
            .and_then(|multiplier| self.backoff_factor.checked_mul(multiplier))
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }

    /// Drive `attempt` until it succeeds, fails fatally, or runs out of retries.
    pub(crate) async fn run<T, F, Fut>(&self, url: &str, mut attempt: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut retry = 0_u32;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Retryable(reason)) if retry >= self.max_retries => {
                    return Err(FetchError::Transient {
                        url: url.to_owned(),
                        attempts: retry.saturating_add(1),
                        reason,
                    });
                }
                Err(AttemptError::Retryable(reason)) => {
                    let delay = self.delay_for(retry);
                    warn!(
                        "request to {url} failed ({reason}); retry {} of {} in {delay:?}",
                        retry.saturating_add(1),
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    retry = retry.saturating_add(1);
                }
            }
        }
    }
}
