//! Process-wide fetch scheduler.
//!
//! Every global cycle, each distinct station referenced by any route is
//! fetched exactly once, one request at a time with a fixed gap between
//! requests. Upstream load therefore depends on the number of distinct
//! stations, never on the number of routes or viewers.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::{StationCache, StationCacheEntry};
use crate::domain::{RouteConfiguration, StationId};
use crate::feed::FeedClient;
use crate::lifecycle::TaskHandle;

/// Smallest interval the scheduler will tick at.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Timing of the fetch scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Time between the starts of successive cycles.
    pub interval: Duration,

    /// Pause between two upstream calls within a cycle.
    pub call_gap: Duration,
}

impl SchedulerSettings {
    pub fn new(interval: Duration, call_gap: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            call_gap,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), Duration::ZERO)
    }
}

/// Outcome of one fetch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub failed: usize,
}

impl CycleReport {
    pub fn total(&self) -> usize {
        self.fetched + self.failed
    }
}

/// Distinct station ids referenced by any route, in first-seen order.
pub fn distinct_stations(routes: &[RouteConfiguration]) -> Vec<StationId> {
    let mut seen = HashSet::new();
    routes
        .iter()
        .flat_map(|r| r.station_ids())
        .filter(|id| seen.insert((*id).clone()))
        .cloned()
        .collect()
}

/// Fetches every configured station once per cycle into the shared cache.
pub struct SharedFetchScheduler<F> {
    client: F,
    cache: StationCache,
    stations: Vec<StationId>,
    settings: SchedulerSettings,
}

impl<F: FeedClient> SharedFetchScheduler<F> {
    /// Create a scheduler for the stations referenced by `routes`.
    pub fn new(
        client: F,
        cache: StationCache,
        routes: &[RouteConfiguration],
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            client,
            cache,
            stations: distinct_stations(routes),
            settings,
        }
    }

    /// Stations fetched each cycle.
    pub fn stations(&self) -> &[StationId] {
        &self.stations
    }

    pub fn settings(&self) -> SchedulerSettings {
        self.settings
    }

    /// Fetch every station once, sequentially.
    ///
    /// A failing station never aborts the cycle; its failure is recorded in
    /// the cache and the next station is fetched.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for (i, station) in self.stations.iter().enumerate() {
            if i > 0 && !self.settings.call_gap.is_zero() {
                tokio::time::sleep(self.settings.call_gap).await;
            }

            if self.fetch_station(station).await {
                report.fetched += 1;
            } else {
                report.failed += 1;
            }
        }

        report
    }

    /// Fetch one station and record the result. Returns whether it succeeded.
    async fn fetch_station(&self, station: &StationId) -> bool {
        match self.client.fetch(station).await {
            Ok(departures) => {
                debug!(station = %station, count = departures.len(), "fetched departures");
                self.cache
                    .put(StationCacheEntry::success(
                        station.clone(),
                        departures,
                        Utc::now(),
                    ))
                    .await;
                true
            }
            Err(e) => {
                let previous = self.cache.get(station).await;
                warn!(
                    station = %station,
                    reason = %e.reason(),
                    error = %e,
                    kept = previous.as_ref().map_or(0, |p| p.departures.len()),
                    "fetch failed, keeping last known departures"
                );
                self.cache
                    .put(StationCacheEntry::failure(
                        station.clone(),
                        previous.as_deref(),
                        e.reason(),
                        Utc::now(),
                    ))
                    .await;
                false
            }
        }
    }

    /// Run cycles on the configured interval until stopped.
    ///
    /// The first cycle starts immediately. A cycle that overruns the
    /// interval delays the next one; missed ticks are not replayed.
    pub fn start(self) -> TaskHandle {
        info!(
            stations = self.stations.len(),
            interval_secs = self.settings.interval.as_secs_f64(),
            "starting fetch scheduler"
        );

        TaskHandle::spawn("fetch-scheduler", move |mut shutdown| async move {
            let mut interval = tokio::time::interval(self.settings.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.requested() => break,
                    _ = interval.tick() => {}
                }

                tokio::select! {
                    _ = shutdown.requested() => break,
                    report = self.run_cycle() => {
                        debug!(
                            fetched = report.fetched,
                            failed = report.failed,
                            "fetch cycle done"
                        );
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FetchStatus, RawDeparture, StopConfiguration};
    use crate::feed::FeedError;
    use chrono::Duration as ChronoDuration;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    /// Feed double that records calls and fails on demand.
    #[derive(Clone, Default)]
    struct ScriptedFeed {
        calls: Arc<Mutex<Vec<StationId>>>,
        failing: Arc<Mutex<HashSet<StationId>>>,
        boards: Arc<Mutex<HashMap<StationId, Vec<RawDeparture>>>>,
    }

    impl ScriptedFeed {
        fn set_board(&self, station: &StationId, lines: &[&str]) {
            let now = Utc::now();
            let deps = lines
                .iter()
                .map(|l| RawDeparture::new(*l, "Somewhere", now + ChronoDuration::minutes(5)))
                .collect();
            self.boards.lock().unwrap().insert(station.clone(), deps);
        }

        fn fail(&self, station: &StationId) {
            self.failing.lock().unwrap().insert(station.clone());
        }

        fn recover(&self, station: &StationId) {
            self.failing.lock().unwrap().remove(station);
        }

        fn calls(&self) -> Vec<StationId> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl FeedClient for ScriptedFeed {
        async fn fetch(&self, station: &StationId) -> Result<Vec<RawDeparture>, FeedError> {
            self.calls.lock().unwrap().push(station.clone());
            if self.failing.lock().unwrap().contains(station) {
                return Err(FeedError::ApiError {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            Ok(self
                .boards
                .lock()
                .unwrap()
                .get(station)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn id(s: &str) -> StationId {
        StationId::parse(s).unwrap()
    }

    fn route(path: &str, stations: &[&str]) -> RouteConfiguration {
        let stops = stations
            .iter()
            .map(|s| StopConfiguration::new(id(s), *s))
            .collect();
        RouteConfiguration::new(path, stops)
    }

    fn fast() -> SchedulerSettings {
        SchedulerSettings::new(Duration::from_millis(20), Duration::ZERO)
    }

    #[test]
    fn distinct_stations_in_first_seen_order() {
        let routes = vec![
            route("/a", &["de:1:1", "de:2:2"]),
            route("/b", &["de:2:2", "de:3:3", "de:1:1"]),
        ];
        let ids: Vec<_> = distinct_stations(&routes);
        let ids: Vec<_> = ids.iter().map(|s| s.as_str()).collect();
        assert_eq!(ids, vec!["de:1:1", "de:2:2", "de:3:3"]);
    }

    #[test]
    fn stop_point_is_fetched_separately() {
        let routes = vec![
            route("/a", &["de:09162:1108"]),
            route("/b", &["de:09162:1108:1:1"]),
        ];
        assert_eq!(distinct_stations(&routes).len(), 2);
    }

    #[tokio::test]
    async fn fetch_fan_in_one_call_per_distinct_station() {
        // Four routes sharing two stations.
        let routes = vec![
            route("/a", &["de:1:1"]),
            route("/b", &["de:1:1", "de:2:2"]),
            route("/c", &["de:2:2"]),
            route("/d", &["de:2:2", "de:1:1"]),
        ];
        let feed = ScriptedFeed::default();
        let scheduler =
            SharedFetchScheduler::new(feed.clone(), StationCache::new(), &routes, fast());

        let report = scheduler.run_cycle().await;

        assert_eq!(report.total(), 2);
        let mut calls = feed.calls();
        calls.sort();
        assert_eq!(calls, vec![id("de:1:1"), id("de:2:2")]);
    }

    #[tokio::test]
    async fn failure_does_not_skip_remaining_stations() {
        let routes = vec![route("/", &["de:1:1", "de:2:2", "de:3:3"])];
        let feed = ScriptedFeed::default();
        feed.fail(&id("de:1:1"));
        feed.set_board(&id("de:3:3"), &["U2"]);
        let cache = StationCache::new();
        let scheduler = SharedFetchScheduler::new(feed.clone(), cache.clone(), &routes, fast());

        let report = scheduler.run_cycle().await;

        assert_eq!(report, CycleReport { fetched: 2, failed: 1 });
        assert_eq!(feed.calls().len(), 3);
        assert_eq!(
            cache.get(&id("de:1:1")).await.unwrap().status,
            FetchStatus::Error
        );
        assert_eq!(cache.get(&id("de:3:3")).await.unwrap().departures.len(), 1);
    }

    #[tokio::test]
    async fn failure_keeps_last_known_good_departures() {
        let routes = vec![route("/", &["de:1:1"])];
        let feed = ScriptedFeed::default();
        feed.set_board(&id("de:1:1"), &["U2", "U5"]);
        let cache = StationCache::new();
        let scheduler = SharedFetchScheduler::new(feed.clone(), cache.clone(), &routes, fast());

        scheduler.run_cycle().await;
        scheduler.run_cycle().await;
        let good = cache.get(&id("de:1:1")).await.unwrap();

        feed.fail(&id("de:1:1"));
        scheduler.run_cycle().await;
        let entry = cache.get(&id("de:1:1")).await.unwrap();

        assert_eq!(entry.status, FetchStatus::Error);
        assert_eq!(entry.departures, good.departures);
        assert_eq!(entry.error_detail.as_deref(), Some("Service unavailable"));
        assert_eq!(entry.last_success_at, good.last_success_at);
        assert!(entry.fetched_at >= good.fetched_at);

        feed.recover(&id("de:1:1"));
        scheduler.run_cycle().await;
        let entry = cache.get(&id("de:1:1")).await.unwrap();
        assert_eq!(entry.status, FetchStatus::Success);
        assert!(entry.error_detail.is_none());
    }

    #[tokio::test]
    async fn first_failure_creates_empty_error_entry() {
        let routes = vec![route("/", &["de:1:1"])];
        let feed = ScriptedFeed::default();
        feed.fail(&id("de:1:1"));
        let cache = StationCache::new();
        let scheduler = SharedFetchScheduler::new(feed, cache.clone(), &routes, fast());

        scheduler.run_cycle().await;

        let entry = cache.get(&id("de:1:1")).await.unwrap();
        assert_eq!(entry.status, FetchStatus::Error);
        assert!(entry.departures.is_empty());
    }

    #[tokio::test]
    async fn call_gap_paces_requests() {
        let routes = vec![route("/", &["de:1:1", "de:2:2", "de:3:3"])];
        let settings = SchedulerSettings::new(Duration::from_secs(60), Duration::from_millis(30));
        let scheduler = SharedFetchScheduler::new(
            ScriptedFeed::default(),
            StationCache::new(),
            &routes,
            settings,
        );

        let started = std::time::Instant::now();
        scheduler.run_cycle().await;

        // Two gaps between three calls, none after the last.
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn started_scheduler_fetches_immediately_and_stops() {
        let routes = vec![route("/", &["de:1:1"])];
        let feed = ScriptedFeed::default();
        let cache = StationCache::new();
        let scheduler = SharedFetchScheduler::new(feed.clone(), cache.clone(), &routes, fast());

        let handle = scheduler.start();
        tokio::time::sleep(Duration::from_millis(70)).await;
        assert!(handle.is_running());
        handle.stop().await;

        let calls = feed.calls().len();
        assert!(calls >= 2, "expected repeated cycles, got {calls}");
        assert!(cache.get(&id("de:1:1")).await.is_some());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(feed.calls().len(), calls);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let settings = SchedulerSettings::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(settings.interval, MIN_INTERVAL);
    }
}
