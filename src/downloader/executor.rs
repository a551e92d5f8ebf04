//! Batch download executor
//!
//! Fans one request per time key out over a bounded worker pool and folds
//! the results back together in completion order. The fold is the only
//! owner of the collected data, so no locking is involved: whichever key
//! finishes first is appended first, and a single date sort at the end
//! puts the dataset in chronological order.

use crate::downloader::config::{DEFAULT_POOL_SIZE, MAX_POOL_SIZE};
use crate::downloader::progress::ProgressState;
use crate::downloader::retry::RetryPolicy;
use crate::downloader::{DownloadError, DownloadJob};
use crate::fetcher::StationFetcher;
use crate::output::csv::CsvRecordsWriter;
use crate::output::{OutputWriter, RecordsWriter};
use crate::StationRecord;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Summary of one finished batch run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Keys the window contained
    pub keys_total: u64,
    /// Keys given up on after exhausting their attempts
    pub keys_failed: u64,
    /// Readings collected across all successful keys
    pub records_collected: u64,
    /// Where the CSV was written; `None` when nothing was collected
    pub output_path: Option<PathBuf>,
}

impl RunReport {
    /// True when the run finished without collecting a single reading.
    ///
    /// A valid terminal state, not an error: the window may be empty, the
    /// stations may not have reported, or every key may have failed.
    pub fn nothing_collected(&self) -> bool {
        self.records_collected == 0
    }
}

/// Batch executor orchestrates the complete download workflow
pub struct BatchExecutor {
    pool_size: usize,
    retry: RetryPolicy,
}

impl BatchExecutor {
    /// Create an executor with the default pool size and retry policy
    pub fn new() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the worker pool size, clamped to `1..=MAX_POOL_SIZE`
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.clamp(1, MAX_POOL_SIZE);
        self
    }

    /// Set the per-key retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Execute a batch download job
    ///
    /// Every time key in the job's window becomes one request, run through
    /// the retry policy. Keys that fail are logged and skipped; the batch
    /// itself only errors on invalid jobs or output failures. When nothing
    /// at all was collected the CSV is not created and the report says so.
    pub async fn run(
        &self,
        fetcher: Arc<dyn StationFetcher>,
        job: &DownloadJob,
        progress_bar: Option<ProgressBar>,
    ) -> Result<RunReport, DownloadError> {
        let span = tracing::info_span!(
            "batch_download",
            granularity = %job.granularity,
            start = %job.start,
            end = %job.end
        );
        let _enter = span.enter();

        info!("Starting batch download job");

        job.validate().map_err(DownloadError::ValidationError)?;

        let keys: Vec<_> = job.date_range().collect();
        let mut progress = ProgressState::new(keys.len() as u64, job.stations.len() as u64);

        info!(
            keys = keys.len(),
            stations = job.stations.len(),
            pool_size = self.pool_size,
            "Dispatching requests"
        );

        let retry = self.retry;
        let mut outcomes = stream::iter(keys)
            .map(|key| {
                let fetcher = Arc::clone(&fetcher);
                async move {
                    let result = retry.run(|| fetcher.fetch(key)).await;
                    (key, result)
                }
            })
            .buffer_unordered(self.pool_size);

        let mut records: Vec<StationRecord> = Vec::new();

        while let Some((key, result)) = outcomes.next().await {
            match result {
                Ok(readings) => {
                    progress.record_success(readings.len() as u64);
                    records.extend(
                        readings
                            .into_iter()
                            .map(|reading| StationRecord::new(key, reading)),
                    );
                }
                Err(e) => {
                    warn!("Giving up on {}: {}", job.granularity.format_key(key), e);
                    progress.record_failure();
                }
            }

            if let Some(pb) = &progress_bar {
                pb.inc(1);
                pb.set_message(format!("{} records", progress.records_collected));
            }
            info!("{}", progress.format_progress());
        }

        // Completion order is arbitrary; a stable date sort restores
        // chronology while keeping each key's response order intact.
        records.sort_by_key(|record| record.fecha);

        let report = if records.is_empty() {
            warn!("No records collected; skipping CSV output");
            RunReport {
                keys_total: progress.keys_total,
                keys_failed: progress.keys_failed,
                records_collected: 0,
                output_path: None,
            }
        } else {
            let mut writer = CsvRecordsWriter::new(&job.output_path, job.granularity)
                .map_err(|e| DownloadError::OutputError(e.to_string()))?;
            writer
                .write_records(&records)
                .map_err(|e| DownloadError::OutputError(e.to_string()))?;
            writer
                .close()
                .map_err(|e| DownloadError::OutputError(e.to_string()))?;

            RunReport {
                keys_total: progress.keys_total,
                keys_failed: progress.keys_failed,
                records_collected: progress.records_collected,
                output_path: Some(job.output_path.clone()),
            }
        };

        info!(
            keys_total = report.keys_total,
            keys_failed = report.keys_failed,
            records_collected = report.records_collected,
            "Batch download job completed"
        );

        Ok(report)
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}
