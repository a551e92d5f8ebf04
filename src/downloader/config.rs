//! Download configuration constants

use std::time::Duration;

/// Default number of concurrent requests in flight.
/// The SENAMHI endpoints sit behind a small PHP frontend; two workers keep
/// a batch moving without tripping its connection shedding.
pub const DEFAULT_POOL_SIZE: usize = 2;

/// Maximum accepted pool size.
/// Above this the endpoint starts refusing connections, which only turns
/// into retries and a slower batch overall.
pub const MAX_POOL_SIZE: usize = 8;

/// Default attempts per time key.
/// 3 attempts with exponential backoff recovers from transient network
/// failures (total extra wait 1s + 2s before giving up on a key).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base for exponential backoff, in seconds.
/// Attempt `i` failing waits `base^i` seconds: 1s, 2s, 4s, ...
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 2;

/// Default per-request timeout.
/// The endpoints normally answer in under a second; 10 seconds keeps a
/// wedged connection from stalling a worker slot indefinitely.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default reading hour for daily requests (HH:MM).
/// 18:00 is the evening observation, the last one published for every
/// station on a given day.
pub const DEFAULT_HOUR: &str = "18:00";

/// Calculate exponential backoff delay for the default base
pub fn calculate_backoff(attempt: u32) -> Duration {
    backoff_with_base(DEFAULT_BACKOFF_BASE_SECS, attempt)
}

/// Calculate exponential backoff delay: `base^attempt` seconds
pub fn backoff_with_base(base_secs: u64, attempt: u32) -> Duration {
    Duration::from_secs(base_secs.saturating_pow(attempt))
}
