//! Download job specification and validation

use crate::downloader::config::{DEFAULT_HOUR, DEFAULT_TIMEOUT};
use crate::{DateRange, Granularity, StationFilter};
use chrono::{NaiveDate, NaiveTime};
use std::path::PathBuf;
use std::time::Duration;

/// Download job specification
///
/// Describes one batch run: the time window, the stations to keep, and
/// where the CSV goes. The window is inclusive on both ends.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// Request granularity
    pub granularity: Granularity,
    /// First date of the window (inclusive)
    pub start: NaiveDate,
    /// Last date of the window (inclusive)
    pub end: NaiveDate,
    /// Stations whose readings are kept
    pub stations: StationFilter,
    /// Reading hour for daily requests, HH:MM. Monthly requests ignore it.
    pub hour: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Output CSV path
    pub output_path: PathBuf,
}

impl DownloadJob {
    /// Create a daily job with the default hour and timeout
    pub fn daily<I, S>(
        start: NaiveDate,
        end: NaiveDate,
        stations: I,
        output_path: impl Into<PathBuf>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            granularity: Granularity::Daily,
            start,
            end,
            stations: StationFilter::new(stations),
            hour: DEFAULT_HOUR.to_string(),
            timeout: DEFAULT_TIMEOUT,
            output_path: output_path.into(),
        }
    }

    /// Create a monthly job with the default timeout
    pub fn monthly<I, S>(
        start: NaiveDate,
        end: NaiveDate,
        stations: I,
        output_path: impl Into<PathBuf>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            granularity: Granularity::Monthly,
            start,
            end,
            stations: StationFilter::new(stations),
            hour: DEFAULT_HOUR.to_string(),
            timeout: DEFAULT_TIMEOUT,
            output_path: output_path.into(),
        }
    }

    /// Override the reading hour for daily requests
    pub fn with_hour(mut self, hour: impl Into<String>) -> Self {
        self.hour = hour.into();
        self
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Time keys of the window in chronological order
    pub fn date_range(&self) -> DateRange {
        DateRange::new(self.start, self.end, self.granularity)
    }

    /// Validate job parameters
    ///
    /// A start after the end is not rejected here: such a window simply
    /// contains no keys and the run reports nothing collected.
    pub fn validate(&self) -> Result<(), String> {
        if self.stations.is_empty() {
            return Err("Station list cannot be empty".to_string());
        }

        if NaiveTime::parse_from_str(&self.hour, "%H:%M").is_err() {
            return Err(format!("Invalid hour '{}': expected HH:MM", self.hour));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err("Output path cannot be empty".to_string());
        }

        Ok(())
    }
}
