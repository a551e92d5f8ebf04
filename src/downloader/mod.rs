//! Download orchestration
//!
//! This module provides the batch download engine: one HTTP request per
//! time key, a bounded worker pool, per-key retry, and completion-order
//! aggregation into a date-sorted CSV.
//!
//! # Overview
//!
//! The downloader orchestrates the complete batch workflow:
//!
//! 1. **Job Creation**: Describe the window and stations with [`job::DownloadJob`]
//! 2. **Execution**: Process the job using [`executor::BatchExecutor`]
//! 3. **Retry**: Each key gets its own attempt budget via [`retry::RetryPolicy`]
//! 4. **Progress Tracking**: Per-completion updates with [`progress::ProgressState`]
//!
//! # Quick Start
//!
//! ```no_run
//! use hydro_data_downloader::downloader::{BatchExecutor, DownloadJob};
//! use hydro_data_downloader::fetcher::SenamhiFetcher;
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let job = DownloadJob::daily(
//!     NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 10, 13).unwrap(),
//!     ["MUELLE ENAFER"],
//!     "./readings.csv",
//! );
//!
//! let fetcher = Arc::new(SenamhiFetcher::for_job(&job)?);
//! let report = BatchExecutor::new().run(fetcher, &job, None).await?;
//!
//! if report.nothing_collected() {
//!     println!("no readings for this window");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`executor`] - Batch executor with bounded concurrency and aggregation
//! - [`job`] - Job specification and validation
//! - [`retry`] - Per-key retry policy with exponential backoff
//! - [`progress`] - Progress counters and formatting
//! - [`config`] - Configuration constants and backoff calculation
//!
//! # Error Handling
//!
//! A failing key is not a failing batch. Network errors are retried with
//! backoff and the key is abandoned once its attempts run out; parse
//! errors abandon the key immediately. The batch itself only returns
//! `Err` for invalid jobs and output failures.
//!
//! # Related Modules
//!
//! - [`crate::fetcher`] - Request execution against the SENAMHI endpoints
//! - [`crate::output`] - CSV writing

pub mod config;
pub mod executor;
pub mod job;
pub mod progress;
pub mod retry;

pub use executor::{BatchExecutor, RunReport};
pub use job::DownloadJob;
pub use progress::ProgressState;
pub use retry::RetryPolicy;

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Validation error
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Output error
    #[error("output error: {0}")]
    OutputError(String),
}
