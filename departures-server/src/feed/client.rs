//! Upstream departures client.
//!
//! The engine talks to the feed only through [`FeedClient`]. Pacing is the
//! caller's job: the client issues exactly one request per call and does no
//! retrying or concurrency limiting of its own.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::{RawDeparture, StationId};

use super::convert::convert_departures;
use super::error::FeedError;
use super::types::MvgDeparture;

/// Default base URL for the MVG departures API.
const DEFAULT_BASE_URL: &str = "https://www.mvg.de/api/bgw-pt/v3";

/// Transport types requested from the API.
const TRANSPORT_TYPES: &str = "UBAHN,TRAM,SBAHN,BUS,REGIONAL_BUS,BAHN";

/// Source of raw departures for a station.
///
/// Implementations must be safe to call concurrently, although the fetch
/// scheduler only ever calls them one at a time.
pub trait FeedClient: Send + Sync + 'static {
    /// Fetch the current departures board for a station.
    fn fetch(
        &self,
        station: &StationId,
    ) -> impl Future<Output = Result<Vec<RawDeparture>, FeedError>> + Send;
}

/// Configuration for the MVG client.
#[derive(Debug, Clone)]
pub struct MvgConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of departures requested per station
    pub fetch_limit: u16,
}

impl MvgConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
            fetch_limit: 50,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the number of departures requested per station.
    pub fn with_fetch_limit(mut self, limit: u16) -> Self {
        self.fetch_limit = limit;
        self
    }
}

impl Default for MvgConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP client for the MVG departures API.
#[derive(Debug, Clone)]
pub struct MvgClient {
    http: reqwest::Client,
    base_url: String,
    fetch_limit: u16,
}

impl MvgClient {
    /// Create a new client with the given configuration.
    pub fn new(config: MvgConfig) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("departures-server/0.1"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            fetch_limit: config.fetch_limit,
        })
    }

    /// Fetch departures for a station or stop-point.
    ///
    /// The API only knows whole stations, so a stop-point id is queried by
    /// its base station; the returned departures carry their stop-point.
    pub async fn get_departures(
        &self,
        station: &StationId,
    ) -> Result<Vec<RawDeparture>, FeedError> {
        let url = format!("{}/departures", self.base_url);
        let global_id = station.base_station();

        let response = self
            .http
            .get(&url)
            .query(&[
                ("globalId", global_id.as_str().to_string()),
                ("limit", self.fetch_limit.to_string()),
                ("transportTypes", TRANSPORT_TYPES.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FeedError::RateLimited);
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FeedError::StationNotFound(global_id.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::ApiError {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = response.text().await?;

        let items: Vec<MvgDeparture> =
            serde_json::from_str(&body).map_err(|e| FeedError::Json {
                message: e.to_string(),
                body: Some(body.chars().take(500).collect()),
            })?;

        Ok(convert_departures(station, items))
    }
}

impl FeedClient for MvgClient {
    async fn fetch(&self, station: &StationId) -> Result<Vec<RawDeparture>, FeedError> {
        self.get_departures(station).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = MvgConfig::new()
            .with_base_url("http://localhost:8080")
            .with_timeout(60)
            .with_fetch_limit(20);

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.fetch_limit, 20);
    }

    #[test]
    fn config_defaults() {
        let config = MvgConfig::default();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.fetch_limit, 50);
    }

    #[test]
    fn client_creation_trims_base_url() {
        let client = MvgClient::new(MvgConfig::new().with_base_url("http://localhost:8080/"))
            .unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }
}
