//! # Hydro Data Downloader Library
//!
//! A library for batch-downloading historical hydrological station readings
//! (water levels and related measurements) from SENAMHI's public monitoring
//! endpoints. Designed for building local, analysis-ready datasets from many
//! small time-windowed requests.
//!
//! ## Features
//!
//! - **Two request granularities**: daily readings (one request per calendar
//!   day) and monthly summaries (one request per month)
//! - **Station filtering**: responses are reduced to a configured set of
//!   station names before anything is kept
//! - **Bounded-concurrency batching**: a small worker pool fetches many query
//!   keys in parallel without overloading the remote service
//! - **Retry with backoff**: transient network failures are retried with
//!   exponential backoff; malformed responses fail fast
//! - **Partial-failure tolerance**: a failed key never aborts the run; it
//!   simply contributes zero records
//! - **Date-sorted CSV output**: the full result set is aggregated, sorted by
//!   date, and written in one pass
//!
//! ## Quick Start
//!
//! ```no_run
//! use hydro_data_downloader::downloader::{BatchExecutor, DownloadJob, RetryPolicy};
//! use hydro_data_downloader::fetcher::SenamhiFetcher;
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Monthly lake-level readings for one station, all of 2023
//! let job = DownloadJob::monthly(
//!     NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
//!     ["ENLACE HUANCHO"],
//!     "./readings.csv",
//! );
//!
//! let fetcher = Arc::new(SenamhiFetcher::for_job(&job)?);
//! let report = BatchExecutor::new()
//!     .with_retry_policy(RetryPolicy::default())
//!     .run(fetcher, &job, None)
//!     .await?;
//!
//! println!("collected {} records", report.records_collected);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several core modules:
//!
//! - [`date_range`] - Query key generation (daily dates, first-of-month dates)
//! - [`fetcher`] - The SENAMHI HTTP client, payload extraction, and the
//!   fetch seam the executor is tested through
//! - [`downloader`] - Batch scheduling, retry policy, progress tracking, and
//!   result aggregation
//! - [`output`] - CSV writing for the final dataset
//! - [`cli`] - Command-line interface
//!
//! ## Data Types
//!
//! - [`Granularity`] - Daily or monthly request mode
//! - [`StationFilter`] - The set of station names a run keeps
//! - [`RawReading`] - One station reading as returned by the provider
//! - [`StationRecord`] - A reading bound to the date of the query that
//!   produced it; the unit of the final dataset

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Query key generation over date intervals
pub mod date_range;

/// Batch scheduling, retry, and aggregation
pub mod downloader;

/// SENAMHI client and payload extraction
pub mod fetcher;

/// Data output writers
pub mod output;

// Re-export commonly used types
pub use date_range::DateRange;

/// Request granularity: one key per day or one key per month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// One request per calendar day.
    Daily,
    /// One request per month, keyed by the first of the month.
    Monthly,
}

impl Granularity {
    /// Format a query key the way the provider expects it in a request body.
    ///
    /// Daily keys render as `YYYY-MM-DD`, monthly keys as `YYYY-MM`.
    pub fn format_key(&self, key: NaiveDate) -> String {
        match self {
            Granularity::Daily => key.format("%Y-%m-%d").to_string(),
            Granularity::Monthly => key.format("%Y-%m").to_string(),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Granularity::Daily),
            "monthly" => Ok(Granularity::Monthly),
            _ => Err(format!("Invalid granularity: {s}")),
        }
    }
}

/// The set of station names a run keeps; everything else in a response is
/// discarded. Built once at run start and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationFilter {
    names: HashSet<String>,
}

impl StationFilter {
    /// Build a filter from any collection of station names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `name` is one of the configured stations.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of configured stations.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no stations are configured.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate the configured names (arbitrary order).
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// One station reading as returned by the provider.
///
/// The provider's payloads are loosely structured; every field is carried
/// verbatim as a string and a missing field is the empty string, never an
/// error. `nom_cuenca` only appears in daily payloads and `dato_ant` only in
/// monthly payloads; the unused one stays empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawReading {
    /// Zonal office code (`codZonal`).
    pub cod_zonal: String,
    /// Station code (`codEsta`).
    pub cod_esta: String,
    /// Station name (`nomEsta`); the field the station filter matches on.
    pub nom_esta: String,
    /// Hydrographic unit (`uniHidrografica`).
    pub uni_hidrografica: String,
    /// Department (`nomDepa`).
    pub nom_depa: String,
    /// Basin (`nomCuenca`), daily payloads only.
    pub nom_cuenca: String,
    /// Sector (`nomSector`).
    pub nom_sector: String,
    /// Measured value (`dato`).
    pub dato: String,
    /// Previous-period value (`datoAnt`), monthly payloads only.
    pub dato_ant: String,
    /// Measurement unit (`unidad`).
    pub unidad: String,
    /// Anomaly value (`datAnomalia`).
    pub dat_anomalia: String,
    /// Anomaly unit (`uniAnomalia`).
    pub uni_anomalia: String,
    /// Trend indicator (`tendencia`).
    pub tendencia: String,
    /// Red alert threshold (`umbralRojo`).
    pub umbral_rojo: String,
    /// Water body (`cuerpoAgua`).
    pub cuerpo_agua: String,
}

/// A [`RawReading`] bound to the date of the query key that produced it.
///
/// The date is the sort key of the final dataset. Monthly keys carry the
/// first of the month.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    /// Date derived from the originating query key.
    pub fecha: NaiveDate,
    /// The reading itself.
    pub reading: RawReading,
}

impl StationRecord {
    /// Bind a reading to its originating query key.
    pub fn new(fecha: NaiveDate, reading: RawReading) -> Self {
        Self { fecha, reading }
    }
}
