//! Integration tests for retry behavior and backoff timing
//!
//! The clock is paused so the exponential waits can be asserted exactly
//! without slowing the suite down.

use async_trait::async_trait;
use chrono::NaiveDate;
use hydro_data_downloader::downloader::{BatchExecutor, DownloadJob, RetryPolicy};
use hydro_data_downloader::fetcher::{FetcherError, FetcherResult, StationFetcher};
use hydro_data_downloader::RawReading;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn reading(station: &str) -> RawReading {
    RawReading {
        nom_esta: station.to_string(),
        dato: "3810.42".to_string(),
        ..RawReading::default()
    }
}

/// Fetcher that fails with a network error a fixed number of times, then succeeds
struct FlakyFetcher {
    calls: AtomicU32,
    failures_before_success: u32,
}

impl FlakyFetcher {
    fn failing(failures_before_success: u32) -> Self {
        Self {
            calls: AtomicU32::new(0),
            failures_before_success,
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StationFetcher for FlakyFetcher {
    async fn fetch(&self, _key: NaiveDate) -> FetcherResult<Vec<RawReading>> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures_before_success {
            return Err(FetcherError::NetworkError("connection reset".to_string()));
        }
        Ok(vec![reading("MUELLE ENAFER")])
    }
}

/// Fetcher that always returns an undecodable-body error
#[derive(Default)]
struct ParseFetcher {
    calls: AtomicU32,
}

#[async_trait]
impl StationFetcher for ParseFetcher {
    async fn fetch(&self, _key: NaiveDate) -> FetcherResult<Vec<RawReading>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FetcherError::ParseError("expected value at line 1".to_string()))
    }
}

/// Fetcher that fails the first attempt for every key, then succeeds
struct PerKeyFlaky {
    calls: Mutex<HashMap<NaiveDate, u32>>,
}

impl PerKeyFlaky {
    fn failing_once() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl StationFetcher for PerKeyFlaky {
    async fn fetch(&self, key: NaiveDate) -> FetcherResult<Vec<RawReading>> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let counter = calls.entry(key).or_insert(0);
            *counter += 1;
            *counter
        };
        if attempt == 1 {
            return Err(FetcherError::NetworkError("connection reset".to_string()));
        }
        Ok(vec![reading("MUELLE ENAFER")])
    }
}

/// Test the monthly retry profile: two transient failures then success
#[tokio::test(start_paused = true)]
async fn test_retry_succeeds_after_transient_failures() {
    let fetcher = FlakyFetcher::failing(2);
    let policy = RetryPolicy::new(3, 2);

    let started = Instant::now();
    let readings = policy
        .run(|| fetcher.fetch(date(2024, 2, 1)))
        .await
        .unwrap();

    assert_eq!(readings.len(), 1);
    assert_eq!(fetcher.calls(), 3);
    // Attempt 0 waits 2^0 = 1s, attempt 1 waits 2^1 = 2s
    assert_eq!(started.elapsed(), Duration::from_secs(3));
}

/// Test that attempts stop at the limit and the last error surfaces
#[tokio::test(start_paused = true)]
async fn test_retry_gives_up_after_max_attempts() {
    let fetcher = FlakyFetcher::failing(u32::MAX);
    let policy = RetryPolicy::new(3, 2);

    let started = Instant::now();
    let err = policy
        .run(|| fetcher.fetch(date(2024, 2, 1)))
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::NetworkError(_)));
    assert_eq!(fetcher.calls(), 3);
    // No wait after the final attempt
    assert_eq!(started.elapsed(), Duration::from_secs(3));
}

/// Test that an undecodable body is not retried
#[tokio::test(start_paused = true)]
async fn test_parse_error_fails_fast() {
    let fetcher = ParseFetcher::default();
    let policy = RetryPolicy::new(3, 2);

    let started = Instant::now();
    let err = policy
        .run(|| fetcher.fetch(date(2024, 2, 1)))
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::ParseError(_)));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

/// Test the daily profile: a single attempt, no backoff
#[tokio::test(start_paused = true)]
async fn test_single_attempt_policy_never_retries() {
    let fetcher = FlakyFetcher::failing(u32::MAX);
    let policy = RetryPolicy::single_attempt();

    let started = Instant::now();
    let err = policy
        .run(|| fetcher.fetch(date(2024, 8, 1)))
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::NetworkError(_)));
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

/// Test that the backoff base controls how fast waits grow
#[tokio::test(start_paused = true)]
async fn test_backoff_base_controls_wait_growth() {
    let fetcher = FlakyFetcher::failing(u32::MAX);
    let policy = RetryPolicy::new(3, 3);

    let started = Instant::now();
    let _ = policy.run(|| fetcher.fetch(date(2024, 2, 1))).await;

    // 3^0 + 3^1 = 4 seconds of waiting across three attempts
    assert_eq!(started.elapsed(), Duration::from_secs(4));
}

/// Test that each key gets its own attempt budget inside a batch
#[tokio::test(start_paused = true)]
async fn test_executor_retries_each_key_independently() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("monthly.csv");

    let fetcher = Arc::new(PerKeyFlaky::failing_once());
    let job = DownloadJob::monthly(
        date(2023, 1, 1),
        date(2023, 3, 1),
        ["MUELLE ENAFER"],
        &output_path,
    );
    let executor = BatchExecutor::new()
        .with_pool_size(1)
        .with_retry_policy(RetryPolicy::new(2, 2));

    let report = executor.run(fetcher.clone(), &job, None).await.unwrap();

    assert_eq!(report.keys_total, 3);
    assert_eq!(report.keys_failed, 0);
    assert_eq!(report.records_collected, 3);
    assert_eq!(
        fetcher.total_calls(),
        6,
        "Each key should need exactly two attempts"
    );
}
