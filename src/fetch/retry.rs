//! Retry loop and error classification for stage-2 fetches
//!
//! Every attempt waits for the shared rate limiter first. Only timeouts are
//! retried, after a linear backoff of `attempt * base`; anything else ends
//! the loop at once.

use crate::fetch::rate_limiter::RateLimiter;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Why fetching one URL failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("failed to extract article: {0}")]
    Extract(String),

    #[error("malformed URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// How many attempts to make and how long to back off between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Backoff unit; attempt `n` is followed by `n * base`
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Sleep after failed attempt `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(attempt)
    }
}

/// Runs `op` until it succeeds, fails permanently, or attempts run out
///
/// `op` receives the 1-based attempt number. The last error is returned when
/// every attempt failed.
pub async fn fetch_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    limiter: &RateLimiter,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        limiter.tick().await;

        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !err.is_retryable() || attempt >= attempts {
            return Err(err);
        }

        let backoff = policy.backoff(attempt);
        tracing::debug!(attempt, ?backoff, "Attempt failed: {}, retrying", err);
        tokio::time::sleep(backoff).await;
        attempt += 1;
    }
}
