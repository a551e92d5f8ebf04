//! Download command implementation

use crate::downloader::config::{
    DEFAULT_BACKOFF_BASE_SECS, DEFAULT_HOUR, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT, MAX_POOL_SIZE,
};
use crate::downloader::{BatchExecutor, DownloadError, DownloadJob, RetryPolicy, RunReport};
use crate::fetcher::SenamhiFetcher;
use crate::Granularity;
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::CliError;

/// Default output file for daily downloads
const DEFAULT_DAILY_OUTPUT: &str = "datos_estaciones.csv";

/// Default output file for monthly downloads
const DEFAULT_MONTHLY_OUTPUT: &str = "datos_mensuales_estaciones.csv";

/// Parse a date argument in YYYY-MM-DD format
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("'{s}' is not a valid date (expected YYYY-MM-DD)"))
}

/// Parse an hour argument in HH:MM format
fn parse_hour(s: &str) -> Result<String, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| format!("'{s}' is not a valid hour (expected HH:MM)"))?;
    Ok(s.to_string())
}

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value == 0 {
        return Err("Concurrency must be at least 1".to_string());
    }
    if value > MAX_POOL_SIZE {
        return Err(format!(
            "Concurrency {value} exceeds maximum of {MAX_POOL_SIZE}"
        ));
    }
    Ok(value)
}

/// Hydro Data Downloader CLI
#[derive(Parser, Debug)]
#[command(name = "hydro-data-downloader")]
#[command(about = "Download hydrological station readings from the SENAMHI API", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format for the run summary (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Number of concurrent requests (default: 2, max: 8)
    ///
    /// The station endpoints are slow and drop connections under load. Two
    /// in-flight requests is the highest setting that stays reliable across
    /// long windows; raise it only for short backfills.
    #[arg(long, global = true, default_value = "2", value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Attempts per time key before giving up (default: 3 monthly, 1 daily)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,

    /// Backoff base in seconds; attempt i waits base^i before the next try
    #[arg(long, global = true, default_value_t = DEFAULT_BACKOFF_BASE_SECS)]
    pub backoff_base: u64,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Output CSV path (default depends on the subcommand)
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Resolve the output path, falling back to the per-granularity default
    fn output_path(&self, granularity: Granularity) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => match granularity {
                Granularity::Daily => PathBuf::from(DEFAULT_DAILY_OUTPUT),
                Granularity::Monthly => PathBuf::from(DEFAULT_MONTHLY_OUTPUT),
            },
        }
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download daily water-level readings (one request per day)
    Daily(DailyArgs),

    /// Download monthly water-level readings (one request per month)
    Monthly(MonthlyArgs),
}

/// Arguments for the daily download
#[derive(Parser, Debug)]
pub struct DailyArgs {
    /// Station name to keep; repeat the flag for several stations
    #[arg(long = "station", required = true)]
    pub stations: Vec<String>,

    /// First day of the window (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub start_date: NaiveDate,

    /// Last day of the window, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub end_date: NaiveDate,

    /// Reading hour to request (HH:MM)
    #[arg(long, default_value = DEFAULT_HOUR, value_parser = parse_hour)]
    pub hour: String,
}

/// Arguments for the monthly download
#[derive(Parser, Debug)]
pub struct MonthlyArgs {
    /// Station name to keep; repeat the flag for several stations
    #[arg(long = "station", required = true)]
    pub stations: Vec<String>,

    /// Any day inside the first month of the window (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub start_date: NaiveDate,

    /// Any day inside the last month of the window, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub end_date: NaiveDate,
}

/// Output format options
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

// ─── Run summary output ──────────────────────────────────────────────────────

/// Output the run summary as JSON
fn output_json(job: &DownloadJob, result: &Result<RunReport, DownloadError>) {
    let (success, keys_total, keys_failed, records, output_path, err) = match result {
        Ok(report) => (
            true,
            report.keys_total,
            report.keys_failed,
            report.records_collected,
            report.output_path.as_ref().map(|p| p.display().to_string()),
            None,
        ),
        Err(e) => (false, 0, 0, 0, None, Some(e.to_string())),
    };

    let output = serde_json::json!({
        "success": success,
        "granularity": job.granularity.to_string(),
        "start": job.start.to_string(),
        "end": job.end.to_string(),
        "stations": job.stations.len(),
        "keys_total": keys_total,
        "keys_failed": keys_failed,
        "records_collected": records,
        "output_path": output_path,
        "error": err,
    });

    println!("{}", serde_json::to_string(&output).unwrap());
}

/// Output the run summary in human-readable format
fn output_human(job: &DownloadJob, result: &Result<RunReport, DownloadError>) {
    match result {
        Ok(report) if report.nothing_collected() => {
            println!("\nDownload finished with no readings collected.");
            println!("Granularity: {}", job.granularity);
            println!("Keys attempted: {}", report.keys_total);
            if report.keys_failed > 0 {
                println!("Keys failed: {}", report.keys_failed);
            }
            println!("No CSV file was written.");
        }
        Ok(report) => {
            println!("\nDownload completed successfully!");
            println!("Granularity: {}", job.granularity);
            println!("Records collected: {}", report.records_collected);
            if report.keys_failed > 0 {
                println!("Keys failed: {}/{}", report.keys_failed, report.keys_total);
            }
            if let Some(path) = &report.output_path {
                println!("Output: {}", path.display());
            }
        }
        Err(e) => {
            eprintln!("\nDownload failed!");
            eprintln!("Error: {e}");
            error!("Download failed: {}", e);
        }
    }
}

// ─── Shared job execution ────────────────────────────────────────────────────

/// Common download execution: fetcher setup, batch run, summary rendering
async fn execute_download_job(
    cli: &Cli,
    job: DownloadJob,
    retry: RetryPolicy,
) -> Result<(), CliError> {
    info!(
        "Starting {} download: {} to {} ({} stations)",
        job.granularity,
        job.start,
        job.end,
        job.stations.len()
    );

    let fetcher = Arc::new(SenamhiFetcher::for_job(&job)?);
    let executor = BatchExecutor::new()
        .with_pool_size(cli.concurrency)
        .with_retry_policy(retry);

    let progress = create_progress_bar(&job);

    let result = executor.run(fetcher, &job, Some(progress.clone())).await;

    progress.finish_and_clear();

    match cli.output_format {
        OutputFormat::Json => output_json(&job, &result),
        OutputFormat::Human => output_human(&job, &result),
    }

    result.map(|_| ()).map_err(CliError::DownloadError)
}

// ─── Args execute implementations ────────────────────────────────────────────

impl DailyArgs {
    /// Execute the daily download command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let job = DownloadJob::daily(
            self.start_date,
            self.end_date,
            self.stations.iter().cloned(),
            cli.output_path(Granularity::Daily),
        )
        .with_hour(self.hour.as_str())
        .with_timeout(Duration::from_secs(cli.timeout));

        let retry = RetryPolicy::new(cli.max_attempts.unwrap_or(1), cli.backoff_base);
        execute_download_job(cli, job, retry).await
    }
}

impl MonthlyArgs {
    /// Execute the monthly download command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let job = DownloadJob::monthly(
            self.start_date,
            self.end_date,
            self.stations.iter().cloned(),
            cli.output_path(Granularity::Monthly),
        )
        .with_timeout(Duration::from_secs(cli.timeout));

        let retry = RetryPolicy::new(
            cli.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            cli.backoff_base,
        );
        execute_download_job(cli, job, retry).await
    }
}

// ─── Progress bar ────────────────────────────────────────────────────────────

/// Create progress bar with style
fn create_progress_bar(job: &DownloadJob) -> ProgressBar {
    let total_keys = job.date_range().count() as u64;

    let pb = ProgressBar::new(total_keys);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .expect("hardcoded template is valid")
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Downloading {} readings", job.granularity));
    pb
}
