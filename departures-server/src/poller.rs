//! Per-route poll loop.
//!
//! Each route gets its own poller. A cycle reads the route's stations from
//! the shared cache, groups every stop, assembles a [`RouteViewModel`] and
//! publishes it. Pollers never fetch and never write the cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::broadcast::BroadcastSink;
use crate::cache::{StationCache, StationCacheEntry};
use crate::domain::{
    ApiStatus, FetchStatus, GroupView, PaginationInfo, RouteConfiguration, RouteViewModel,
    StopConfiguration, StopView,
};
use crate::grouping::{GroupingOptions, group_departures_with, header_color};
use crate::lifecycle::TaskHandle;

/// Smallest interval a poller will tick at.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Result of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A new view was published.
    Published,
    /// The route has no stops, or at least one stop has no cache entry
    /// yet; nothing was published.
    NoDataYet,
    /// Another cycle of this route was still running.
    Busy,
}

/// Latest published view of a route, readable from outside the poller.
///
/// Cheap to clone; clones share the same snapshot.
#[derive(Clone, Default)]
pub struct RouteState {
    snapshot: Arc<RwLock<Option<Arc<RouteViewModel>>>>,
}

impl RouteState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently published view, if any.
    pub async fn snapshot(&self) -> Option<Arc<RouteViewModel>> {
        self.snapshot.read().await.clone()
    }

    /// Aggregate status of the latest view; `Unknown` before the first one.
    pub async fn api_status(&self) -> ApiStatus {
        self.snapshot
            .read()
            .await
            .as_ref()
            .map_or(ApiStatus::Unknown, |v| v.api_status)
    }

    /// When the latest view was published.
    pub async fn last_update(&self) -> Option<DateTime<Utc>> {
        self.snapshot.read().await.as_ref().map(|v| v.last_update)
    }

    async fn replace(&self, view: Arc<RouteViewModel>) {
        *self.snapshot.write().await = Some(view);
    }
}

/// Clears the busy flag when a cycle ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Builds and publishes the view of one route.
pub struct RoutePoller<S> {
    route: Arc<RouteConfiguration>,
    cache: StationCache,
    sink: S,
    interval: Duration,
    state: RouteState,
    options: GroupingOptions,
    busy: AtomicBool,
}

impl<S: BroadcastSink> RoutePoller<S> {
    /// Create a poller running on the route's interval, or `default_interval`
    /// if the route does not override it.
    pub fn new(
        route: Arc<RouteConfiguration>,
        cache: StationCache,
        sink: S,
        default_interval: Duration,
    ) -> Self {
        let interval = route
            .effective_refresh_interval(default_interval)
            .max(MIN_INTERVAL);

        Self {
            route,
            cache,
            sink,
            interval,
            state: RouteState::new(),
            options: GroupingOptions::default(),
            busy: AtomicBool::new(false),
        }
    }

    /// Set the grouping options used for every stop.
    pub fn with_grouping_options(mut self, options: GroupingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn route(&self) -> &RouteConfiguration {
        &self.route
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Handle to the route's latest view.
    pub fn state(&self) -> RouteState {
        self.state.clone()
    }

    /// Run one cycle at the current time.
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle as if the current time were `now`.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> CycleOutcome {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            debug!(route = %self.route.path, "previous cycle still running");
            return CycleOutcome::Busy;
        };

        if self.route.stops.is_empty() {
            debug!(route = %self.route.path, "route has no stops");
            return CycleOutcome::NoDataYet;
        }

        let mut entries = Vec::with_capacity(self.route.stops.len());
        for stop in &self.route.stops {
            match self.cache.get(&stop.station_id).await {
                Some(entry) => entries.push(entry),
                None => {
                    debug!(
                        route = %self.route.path,
                        station = %stop.station_id,
                        "no data yet"
                    );
                    return CycleOutcome::NoDataYet;
                }
            }
        }

        let previous = self.state.last_update().await;
        let last_update = previous.map_or(now, |prev| prev.max(now));

        let view = Arc::new(self.build_view(&entries, last_update, now));
        self.state.replace(view.clone()).await;
        self.sink.publish(&self.route.path, view);

        CycleOutcome::Published
    }

    fn build_view(
        &self,
        entries: &[Arc<StationCacheEntry>],
        last_update: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RouteViewModel {
        let mut stops = Vec::with_capacity(entries.len());
        let mut failed_stops = Vec::new();
        let mut any_error = false;

        for (stop, entry) in self.route.stops.iter().zip(entries) {
            if entry.status == FetchStatus::Error {
                any_error = true;
            }

            match group_departures_with(&entry.departures, stop, now, self.options) {
                Ok(groups) => {
                    let groups = groups
                        .into_iter()
                        .map(|group| {
                            let color = self.header_color_for(stop, &group.label);
                            GroupView::new(group, color, self.departures_per_page())
                        })
                        .collect();

                    stops.push(StopView {
                        station_id: stop.station_id.clone(),
                        station_name: stop.station_name.clone(),
                        status: entry.status,
                        fetched_at: entry.fetched_at,
                        is_stale: entry.is_stale(),
                        groups,
                    });
                }
                Err(e) => {
                    warn!(
                        route = %self.route.path,
                        stop = %stop.station_name,
                        error = %e,
                        "failed to process stop"
                    );
                    failed_stops.push(stop.station_name.clone());
                    any_error = true;
                }
            }
        }

        let display = &self.route.display;
        RouteViewModel {
            route_path: self.route.path.clone(),
            title: display.title.clone(),
            stops,
            failed_stops,
            last_update,
            api_status: if any_error {
                ApiStatus::Error
            } else {
                ApiStatus::Success
            },
            pagination: PaginationInfo {
                enabled: display.pagination_enabled,
                departures_per_page: display.departures_per_page,
                page_rotation_seconds: display.page_rotation_seconds,
            },
        }
    }

    fn departures_per_page(&self) -> Option<usize> {
        let display = &self.route.display;
        display
            .pagination_enabled
            .then_some(display.departures_per_page)
    }

    /// Header colour of a group; stop settings override route settings.
    fn header_color_for(&self, stop: &StopConfiguration, label: &str) -> Option<String> {
        let display = &self.route.display;
        let enabled = stop
            .random_header_colors
            .unwrap_or(display.random_header_colors);
        if !enabled {
            return None;
        }

        let brightness = stop
            .header_background_brightness
            .unwrap_or(display.header_background_brightness);
        Some(header_color(
            label,
            stop.random_color_salt.unwrap_or(0),
            brightness,
        ))
    }

    /// Run cycles on the route's interval until stopped.
    ///
    /// The first cycle starts immediately.
    pub fn start(self) -> TaskHandle {
        info!(
            route = %self.route.path,
            stops = self.route.stops.len(),
            interval_secs = self.interval.as_secs_f64(),
            "starting route poller"
        );

        let name = format!("poller {}", self.route.path);
        TaskHandle::spawn(name, move |mut shutdown| async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.requested() => break,
                    _ = interval.tick() => {}
                }

                tokio::select! {
                    _ = shutdown.requested() => break,
                    outcome = self.run_cycle() => {
                        debug!(
                            route = %self.route.path,
                            ?outcome,
                            viewers = self.sink.viewer_count(&self.route.path),
                            "poll cycle done"
                        );
                    }
                }
            }
        })
    }
}
