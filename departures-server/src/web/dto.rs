//! Data transfer objects for web responses.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::StationCacheEntry;
use crate::domain::{ApiStatus, FetchStatus, StationId};

/// One route in the route listing.
#[derive(Debug, Serialize)]
pub struct RouteSummary {
    pub path: String,
    pub title: String,
    pub stops: usize,
    pub api_status: ApiStatus,
    pub last_update: Option<DateTime<Utc>>,
    pub viewer_count: usize,
}

#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    pub routes: Vec<RouteSummary>,
}

/// Fetch status of one cached station.
#[derive(Debug, Serialize)]
pub struct StationStatus {
    pub station_id: StationId,
    pub status: FetchStatus,
    pub fetched_at: DateTime<Utc>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub departures: usize,
}

impl From<&StationCacheEntry> for StationStatus {
    fn from(entry: &StationCacheEntry) -> Self {
        Self {
            station_id: entry.station_id.clone(),
            status: entry.status,
            fetched_at: entry.fetched_at,
            last_success_at: entry.last_success_at,
            error: entry.error_detail.clone(),
            departures: entry.departures.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StationsResponse {
    pub stations: Vec<StationStatus>,
}

/// Body returned for a route that has not published yet.
#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub state: &'static str,
}

impl PendingResponse {
    pub fn new() -> Self {
        Self { state: "pending" }
    }
}

impl Default for PendingResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
