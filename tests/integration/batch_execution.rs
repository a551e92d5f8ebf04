//! Integration tests for batch download execution
//!
//! These tests drive [`BatchExecutor`] with stub fetchers to verify
//! aggregation, ordering, failure isolation, and CSV output without
//! touching the network.

use async_trait::async_trait;
use chrono::NaiveDate;
use hydro_data_downloader::downloader::{
    BatchExecutor, DownloadError, DownloadJob, RetryPolicy,
};
use hydro_data_downloader::fetcher::{FetcherError, FetcherResult, StationFetcher};
use hydro_data_downloader::RawReading;
use indicatif::ProgressBar;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn reading(station: &str, dato: &str) -> RawReading {
    RawReading {
        nom_esta: station.to_string(),
        dato: dato.to_string(),
        ..RawReading::default()
    }
}

fn read_column(path: &Path, index: usize) -> Vec<String> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|record| record.unwrap().get(index).unwrap().to_string())
        .collect()
}

/// Fetcher that returns one reading per key after a per-key delay
struct DelayedFetcher {
    delays: HashMap<NaiveDate, u64>,
}

#[async_trait]
impl StationFetcher for DelayedFetcher {
    async fn fetch(&self, key: NaiveDate) -> FetcherResult<Vec<RawReading>> {
        let delay = self.delays.get(&key).copied().unwrap_or(0);
        tokio::time::sleep(Duration::from_secs(delay)).await;
        Ok(vec![reading("MUELLE ENAFER", "3810.42")])
    }
}

/// Fetcher that fails for a fixed set of keys
struct PartialFetcher {
    failing: HashSet<NaiveDate>,
}

#[async_trait]
impl StationFetcher for PartialFetcher {
    async fn fetch(&self, key: NaiveDate) -> FetcherResult<Vec<RawReading>> {
        if self.failing.contains(&key) {
            Err(FetcherError::NetworkError("connection reset".to_string()))
        } else {
            Ok(vec![reading("MUELLE ENAFER", "3810.42")])
        }
    }
}

/// Fetcher whose responses never match any station of interest
struct EmptyFetcher;

#[async_trait]
impl StationFetcher for EmptyFetcher {
    async fn fetch(&self, _key: NaiveDate) -> FetcherResult<Vec<RawReading>> {
        Ok(Vec::new())
    }
}

/// Fetcher that returns two stations per key
struct TwoStationFetcher;

#[async_trait]
impl StationFetcher for TwoStationFetcher {
    async fn fetch(&self, _key: NaiveDate) -> FetcherResult<Vec<RawReading>> {
        Ok(vec![
            reading("MUELLE ENAFER", "3810.42"),
            reading("PUENTE RAMIS", "1.85"),
        ])
    }
}

/// Fetcher that records the highest number of in-flight requests
#[derive(Default)]
struct ConcurrencyProbe {
    current: AtomicUsize,
    max_seen: AtomicUsize,
}

#[async_trait]
impl StationFetcher for ConcurrencyProbe {
    async fn fetch(&self, _key: NaiveDate) -> FetcherResult<Vec<RawReading>> {
        let in_flight = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(in_flight, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![reading("MUELLE ENAFER", "3810.42")])
    }
}

/// Test that collected records come out date-sorted even when later keys
/// complete first
#[tokio::test(start_paused = true)]
async fn test_records_are_date_sorted_regardless_of_completion_order() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("daily.csv");

    // Earlier keys take longer, so completion order is reversed
    let mut delays = HashMap::new();
    delays.insert(date(2024, 8, 1), 8);
    delays.insert(date(2024, 8, 2), 4);
    delays.insert(date(2024, 8, 3), 2);
    delays.insert(date(2024, 8, 4), 1);

    let job = DownloadJob::daily(
        date(2024, 8, 1),
        date(2024, 8, 4),
        ["MUELLE ENAFER"],
        &output_path,
    );
    let executor = BatchExecutor::new().with_pool_size(4);

    let report = executor
        .run(Arc::new(DelayedFetcher { delays }), &job, None)
        .await
        .unwrap();

    assert_eq!(report.keys_total, 4);
    assert_eq!(report.keys_failed, 0);
    assert_eq!(report.records_collected, 4);
    assert_eq!(report.output_path.as_deref(), Some(output_path.as_path()));

    let fechas = read_column(&output_path, 0);
    assert_eq!(
        fechas,
        vec!["2024-08-01", "2024-08-02", "2024-08-03", "2024-08-04"]
    );
}

/// Test that a failing key is dropped without aborting the rest of the batch
#[tokio::test]
async fn test_failed_keys_do_not_abort_the_batch() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("daily.csv");

    let failing = HashSet::from([date(2024, 8, 2)]);
    let job = DownloadJob::daily(
        date(2024, 8, 1),
        date(2024, 8, 3),
        ["MUELLE ENAFER"],
        &output_path,
    );
    let executor = BatchExecutor::new().with_retry_policy(RetryPolicy::single_attempt());

    let report = executor
        .run(Arc::new(PartialFetcher { failing }), &job, None)
        .await
        .unwrap();

    assert_eq!(report.keys_total, 3);
    assert_eq!(report.keys_failed, 1);
    assert_eq!(report.records_collected, 2);
    assert!(output_path.exists());

    let fechas = read_column(&output_path, 0);
    assert_eq!(fechas, vec!["2024-08-01", "2024-08-03"]);
}

/// Test that a batch where every key fails ends as a valid empty run
#[tokio::test]
async fn test_all_keys_failing_is_nothing_collected() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("daily.csv");

    let failing = HashSet::from([date(2024, 8, 1), date(2024, 8, 2), date(2024, 8, 3)]);
    let job = DownloadJob::daily(
        date(2024, 8, 1),
        date(2024, 8, 3),
        ["MUELLE ENAFER"],
        &output_path,
    );
    let executor = BatchExecutor::new().with_retry_policy(RetryPolicy::single_attempt());

    let report = executor
        .run(Arc::new(PartialFetcher { failing }), &job, None)
        .await
        .unwrap();

    assert!(report.nothing_collected());
    assert_eq!(report.keys_failed, 3);
    assert_eq!(report.records_collected, 0);
    assert!(report.output_path.is_none());
    assert!(!output_path.exists(), "No CSV should be written");
}

/// Test that responses matching no station are a valid empty run, not a failure
#[tokio::test]
async fn test_empty_responses_are_not_failures() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("daily.csv");

    let job = DownloadJob::daily(
        date(2024, 8, 1),
        date(2024, 8, 3),
        ["MUELLE ENAFER"],
        &output_path,
    );
    let executor = BatchExecutor::new();

    let report = executor.run(Arc::new(EmptyFetcher), &job, None).await.unwrap();

    assert!(report.nothing_collected());
    assert_eq!(report.keys_failed, 0, "Empty responses are completions");
    assert_eq!(report.keys_total, 3);
    assert!(!output_path.exists());
}

/// Test that every key contributes exactly once and per-key response order
/// survives the date sort
#[tokio::test]
async fn test_no_duplicate_keys_and_stable_order_within_key() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("daily.csv");

    let job = DownloadJob::daily(
        date(2024, 8, 1),
        date(2024, 8, 3),
        ["MUELLE ENAFER", "PUENTE RAMIS"],
        &output_path,
    );
    let executor = BatchExecutor::new();

    let report = executor
        .run(Arc::new(TwoStationFetcher), &job, None)
        .await
        .unwrap();

    assert_eq!(report.records_collected, 6);

    let fechas = read_column(&output_path, 0);
    let stations = read_column(&output_path, 3);

    let mut seen = HashSet::new();
    for (fecha, station) in fechas.iter().zip(&stations) {
        assert!(
            seen.insert((fecha.clone(), station.clone())),
            "Duplicate row for {fecha} / {station}"
        );
    }

    // Within each date the response order is preserved
    for rows in fechas.chunks(2).zip(stations.chunks(2)) {
        let (pair_dates, pair_stations) = rows;
        assert_eq!(pair_dates[0], pair_dates[1]);
        assert_eq!(pair_stations, ["MUELLE ENAFER", "PUENTE RAMIS"]);
    }
}

/// Test that the executor never exceeds the configured pool size
#[tokio::test(start_paused = true)]
async fn test_pool_size_bounds_in_flight_requests() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("daily.csv");

    let job = DownloadJob::daily(
        date(2024, 8, 1),
        date(2024, 8, 6),
        ["MUELLE ENAFER"],
        &output_path,
    );
    let probe = Arc::new(ConcurrencyProbe::default());
    let executor = BatchExecutor::new().with_pool_size(2);

    let report = executor.run(probe.clone(), &job, None).await.unwrap();

    assert_eq!(report.records_collected, 6);
    assert!(
        probe.max_seen.load(Ordering::SeqCst) <= 2,
        "Pool size should cap concurrent requests at 2"
    );
}

/// Test that an empty station list is rejected before any request is made
#[tokio::test]
async fn test_empty_station_list_fails_validation() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("daily.csv");

    let stations: [&str; 0] = [];
    let job = DownloadJob::daily(date(2024, 8, 1), date(2024, 8, 2), stations, &output_path);
    let executor = BatchExecutor::new();

    let result = executor.run(Arc::new(EmptyFetcher), &job, None).await;

    assert!(matches!(result, Err(DownloadError::ValidationError(_))));
    assert!(!output_path.exists());
}

/// Test that an inverted window completes immediately with zero keys
#[tokio::test]
async fn test_inverted_window_collects_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("daily.csv");

    let job = DownloadJob::daily(
        date(2024, 8, 10),
        date(2024, 8, 1),
        ["MUELLE ENAFER"],
        &output_path,
    );
    let executor = BatchExecutor::new();

    let report = executor.run(Arc::new(EmptyFetcher), &job, None).await.unwrap();

    assert!(report.nothing_collected());
    assert_eq!(report.keys_total, 0);
    assert!(!output_path.exists());
}

/// Test that a provided progress bar ends at one tick per key
#[tokio::test]
async fn test_progress_bar_tracks_completed_keys() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("daily.csv");

    let failing = HashSet::from([date(2024, 8, 2)]);
    let job = DownloadJob::daily(
        date(2024, 8, 1),
        date(2024, 8, 3),
        ["MUELLE ENAFER"],
        &output_path,
    );
    let executor = BatchExecutor::new().with_retry_policy(RetryPolicy::single_attempt());
    let pb = ProgressBar::new(3);

    executor
        .run(Arc::new(PartialFetcher { failing }), &job, Some(pb.clone()))
        .await
        .unwrap();

    // Failed keys still count as completed work
    assert_eq!(pb.position(), 3);
    pb.finish_and_clear();
}
