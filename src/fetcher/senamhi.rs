//! SENAMHI HTTP client and fetcher
//!
//! Provides the HTTP transport for the daily and monthly information
//! endpoints of the SENAMHI hydrological API, plus the [`StationFetcher`]
//! implementation that ties transport and parsing together.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::downloader::DownloadJob;
use crate::fetcher::{FetcherError, FetcherResult, SenamhiParser, StationFetcher};
use crate::{Granularity, RawReading, StationFilter};

/// Daily readings endpoint
pub const DAILY_ENDPOINT: &str =
    "https://www.senamhi.gob.pe/include/ajax-informacion-diaria.php";

/// Monthly readings endpoint
pub const MONTHLY_ENDPOINT: &str =
    "https://www.senamhi.gob.pe/include/ajax-informacion-mensual.php";

/// Accept header the endpoints expect from browser callers
const ACCEPT_VALUE: &str = "application/json, text/javascript, */*; q=0.01";

/// User-Agent the endpoints expect; requests without one get an error page
const USER_AGENT_VALUE: &str = "Mozilla/5.0";

/// HTTP client for the SENAMHI information endpoints
pub struct SenamhiClient {
    client: Client,
    daily_url: String,
    monthly_url: String,
}

impl SenamhiClient {
    /// Create a new client with the given per-request timeout.
    ///
    /// The timeout covers the whole request, connect through body read.
    pub fn new(timeout: Duration) -> FetcherResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            FetcherError::NetworkError(format!("failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            daily_url: DAILY_ENDPOINT.to_string(),
            monthly_url: MONTHLY_ENDPOINT.to_string(),
        })
    }

    /// Create with custom endpoint URLs (for testing)
    pub fn with_urls(
        timeout: Duration,
        daily_url: impl Into<String>,
        monthly_url: impl Into<String>,
    ) -> FetcherResult<Self> {
        let mut client = Self::new(timeout)?;
        client.daily_url = daily_url.into();
        client.monthly_url = monthly_url.into();
        Ok(client)
    }

    /// Fetch the daily response body for one calendar day.
    ///
    /// # Arguments
    /// * `fecha` - Calendar day to request
    /// * `hora` - Reading hour as HH:MM, the way the endpoint expects it
    pub async fn fetch_daily(&self, fecha: NaiveDate, hora: &str) -> FetcherResult<Value> {
        let params = [
            ("fecha", fecha.format("%Y-%m-%d").to_string()),
            ("hora", hora.to_string()),
        ];
        self.post_form(&self.daily_url, &params).await
    }

    /// Fetch the monthly response body for one month, keyed by any day in it.
    pub async fn fetch_monthly(&self, fecha: NaiveDate) -> FetcherResult<Value> {
        let params = [("fecha", fecha.format("%Y-%m").to_string())];
        self.post_form(&self.monthly_url, &params).await
    }

    /// Execute one form-encoded POST and decode the JSON body.
    ///
    /// Failures map onto the two-way error split the retry layer acts on:
    /// everything up to and including reading the body is a network error,
    /// a body that will not decode is a parse error.
    async fn post_form(&self, url: &str, params: &[(&str, String)]) -> FetcherResult<Value> {
        debug!("Making POST request to: {} with {} params", url, params.len());

        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, ACCEPT_VALUE)
            .header(reqwest::header::USER_AGENT, USER_AGENT_VALUE)
            .form(params)
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetcherError::NetworkError(format!(
                "server returned {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        serde_json::from_str(&body)
            .map_err(|e| FetcherError::ParseError(format!("failed to decode response: {}", e)))
    }
}

/// [`StationFetcher`] backed by the SENAMHI information endpoints
pub struct SenamhiFetcher {
    client: SenamhiClient,
    granularity: Granularity,
    hour: String,
    stations: StationFilter,
}

impl SenamhiFetcher {
    /// Create a fetcher from its parts.
    pub fn new(
        client: SenamhiClient,
        granularity: Granularity,
        hour: impl Into<String>,
        stations: StationFilter,
    ) -> Self {
        Self {
            client,
            granularity,
            hour: hour.into(),
            stations,
        }
    }

    /// Create a fetcher configured for one download job.
    pub fn for_job(job: &DownloadJob) -> FetcherResult<Self> {
        Ok(Self::new(
            SenamhiClient::new(job.timeout)?,
            job.granularity,
            job.hour.clone(),
            job.stations.clone(),
        ))
    }
}

#[async_trait]
impl StationFetcher for SenamhiFetcher {
    /// Fetch one key's readings and filter them to the stations of interest.
    ///
    /// The hour only participates in daily requests; the monthly endpoint
    /// keys on year and month alone.
    async fn fetch(&self, key: NaiveDate) -> FetcherResult<Vec<RawReading>> {
        let body = match self.granularity {
            Granularity::Daily => self.client.fetch_daily(key, &self.hour).await?,
            Granularity::Monthly => self.client.fetch_monthly(key).await?,
        };

        let readings = SenamhiParser::extract_readings(&body, self.granularity);
        Ok(SenamhiParser::filter_stations(readings, &self.stations))
    }
}
