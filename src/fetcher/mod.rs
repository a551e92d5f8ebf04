//! Station reading fetcher implementations

use crate::RawReading;
use async_trait::async_trait;
use chrono::NaiveDate;

pub mod parser;
pub mod senamhi;

pub use parser::SenamhiParser;
pub use senamhi::{SenamhiClient, SenamhiFetcher};

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Network error (connection failure, timeout, or non-success status)
    #[error("network error: {0}")]
    NetworkError(String),

    /// Response parse error (body could not be decoded as JSON)
    #[error("parse error: {0}")]
    ParseError(String),
}

impl FetcherError {
    /// Whether a repeated attempt at the same request could succeed.
    ///
    /// Network failures are transient. A body that failed to decode will
    /// decode the same way on every retry, so parse errors fail fast.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetcherError::NetworkError(_))
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Data fetcher trait for retrieving station readings (one time key per call)
#[async_trait]
pub trait StationFetcher: Send + Sync {
    /// Fetch readings for a single time key, filtered to the stations of
    /// interest.
    ///
    /// # Arguments
    /// * `key` - Time key: the calendar day, or the first day of the month
    ///
    /// # Returns
    /// Filtered readings in API response order. An empty vector is a valid
    /// result: the request succeeded but no station of interest reported
    /// for this key.
    async fn fetch(&self, key: NaiveDate) -> FetcherResult<Vec<RawReading>>;
}
