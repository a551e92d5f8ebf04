//! Per-key retry with exponential backoff
//!
//! Every time key gets its own attempt budget. A key that exhausts the
//! budget is abandoned, never the batch: the executor records the failure
//! and moves on to the remaining keys.

use std::future::Future;
use tracing::{debug, warn};

use crate::downloader::config::{
    backoff_with_base, DEFAULT_BACKOFF_BASE_SECS, DEFAULT_MAX_ATTEMPTS,
};
use crate::fetcher::{FetcherError, FetcherResult};

/// Retry policy applied to each request key independently
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base_secs: u64,
}

impl RetryPolicy {
    /// Create a policy. A `max_attempts` of 0 is clamped to 1: every key
    /// gets at least one try.
    pub fn new(max_attempts: u32, backoff_base_secs: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base_secs,
        }
    }

    /// Policy that tries exactly once, with no waiting
    pub fn single_attempt() -> Self {
        Self::new(1, DEFAULT_BACKOFF_BASE_SECS)
    }

    /// Number of attempts before a key is given up on
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `operation` until it succeeds, runs out of attempts, or fails
    /// with an error that retrying cannot fix.
    ///
    /// Retryable failure of attempt `i` waits `base^i` seconds before the
    /// next try. No wait follows the final attempt; the last error is
    /// returned as is.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> FetcherResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FetcherResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("Request succeeded on attempt {}", attempt + 1);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        "Network error on attempt {}/{}: {}",
                        attempt + 1,
                        self.max_attempts,
                        e
                    );
                    last_error = Some(e);

                    if attempt + 1 < self.max_attempts {
                        let backoff = backoff_with_base(self.backoff_base_secs, attempt);
                        debug!("Retrying after {:?}", backoff);
                        tokio::time::sleep(backoff).await;
                    }
                }
                // A body that failed to decode once will fail every time
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| FetcherError::NetworkError("all attempts exhausted".to_string())))
    }
}

impl Default for RetryPolicy {
    /// The monthly defaults: 3 attempts, 2s backoff base
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF_BASE_SECS)
    }
}
