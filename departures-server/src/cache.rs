//! Shared cache of raw station departures.
//!
//! One entry per station id, written only by the fetch scheduler and read by
//! every route poller. Entries are overwritten in place and never evicted;
//! readers judge staleness from `fetched_at` and `status`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{FetchStatus, RawDeparture, StationId};

/// Latest fetch result for one station.
#[derive(Debug, Clone, PartialEq)]
pub struct StationCacheEntry {
    pub station_id: StationId,

    /// Departures served to readers. After a failed fetch these are the
    /// departures of the last successful one.
    pub departures: Vec<RawDeparture>,

    /// When the latest fetch attempt finished.
    pub fetched_at: DateTime<Utc>,

    pub status: FetchStatus,

    /// Reason of the latest failure; `None` after a success.
    pub error_detail: Option<String>,

    /// When the departures were last refreshed successfully.
    pub last_success_at: Option<DateTime<Utc>>,
}

impl StationCacheEntry {
    /// Entry for a successful fetch.
    pub fn success(
        station_id: StationId,
        departures: Vec<RawDeparture>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            station_id,
            departures,
            fetched_at,
            status: FetchStatus::Success,
            error_detail: None,
            last_success_at: Some(fetched_at),
        }
    }

    /// Entry for a failed fetch.
    ///
    /// Status, timestamp and error are overwritten; the departures of
    /// `previous` (if any) are kept as the served payload.
    pub fn failure(
        station_id: StationId,
        previous: Option<&StationCacheEntry>,
        error_detail: impl Into<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            station_id,
            departures: previous.map(|p| p.departures.clone()).unwrap_or_default(),
            fetched_at,
            status: FetchStatus::Error,
            error_detail: Some(error_detail.into()),
            last_success_at: previous.and_then(|p| p.last_success_at),
        }
    }

    /// Whether the served departures come from an earlier fetch.
    pub fn is_stale(&self) -> bool {
        self.status == FetchStatus::Error
    }
}

/// Thread-safe station cache.
///
/// Cheap to clone; clones share the same map.
#[derive(Clone, Default)]
pub struct StationCache {
    inner: Arc<RwLock<HashMap<StationId, Arc<StationCacheEntry>>>>,
}

impl StationCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a station's entry.
    ///
    /// `None` means the station has not been fetched yet, which readers must
    /// treat differently from an entry with an `Error` status.
    pub async fn get(&self, station_id: &StationId) -> Option<Arc<StationCacheEntry>> {
        let guard = self.inner.read().await;
        guard.get(station_id).cloned()
    }

    /// Insert or replace the entry for its station.
    pub async fn put(&self, entry: StationCacheEntry) {
        let mut guard = self.inner.write().await;
        guard.insert(entry.station_id.clone(), Arc::new(entry));
    }

    /// Number of stations in the cache.
    pub async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.len()
    }

    /// Check if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        let guard = self.inner.read().await;
        guard.is_empty()
    }

    /// All cached station ids, sorted.
    pub async fn station_ids(&self) -> Vec<StationId> {
        let guard = self.inner.read().await;
        let mut ids: Vec<_> = guard.keys().cloned().collect();
        ids.sort();
        ids
    }
}
