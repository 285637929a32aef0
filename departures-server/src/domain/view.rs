//! View-ready output of the aggregation engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RawDeparture, StationId};

/// Outcome of the most recent fetch of a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Success,
    Error,
}

/// Route-level rollup of station fetch health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Success,
    Error,
    #[default]
    Unknown,
}

/// A labelled bucket of departures for one stop.
///
/// Departures are filtered, sorted by effective time and truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionGroup {
    pub label: String,
    pub departures: Vec<RawDeparture>,
    pub is_ungrouped: bool,
}

impl DirectionGroup {
    pub fn new(label: impl Into<String>, is_ungrouped: bool) -> Self {
        Self {
            label: label.into(),
            departures: Vec::new(),
            is_ungrouped,
        }
    }

    pub fn len(&self) -> usize {
        self.departures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.departures.is_empty()
    }
}

/// A direction group with its presentation data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupView {
    #[serde(flatten)]
    pub group: DirectionGroup,

    /// Generated header background colour (`#rrggbb`), if enabled.
    pub header_color: Option<String>,

    /// Number of pages the group is shown in.
    pub page_count: usize,

    /// Departures per page; equals the group size when not paginated.
    pub page_size: usize,
}

impl GroupView {
    /// Wrap a group, computing its pagination.
    ///
    /// `departures_per_page` of `None` (or zero) shows the group on one page.
    pub fn new(
        group: DirectionGroup,
        header_color: Option<String>,
        departures_per_page: Option<usize>,
    ) -> Self {
        let len = group.len();
        let page_size = match departures_per_page {
            Some(n) if n > 0 => n,
            _ => len.max(1),
        };
        let page_count = if len == 0 { 1 } else { len.div_ceil(page_size) };

        Self {
            group,
            header_color,
            page_count,
            page_size,
        }
    }

    /// The group's departures split into pages.
    pub fn pages(&self) -> impl Iterator<Item = &[RawDeparture]> {
        self.group.departures.chunks(self.page_size)
    }
}

/// One stop's contribution to a route view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopView {
    pub station_id: StationId,
    pub station_name: String,

    /// Status of the station's latest fetch.
    pub status: FetchStatus,

    /// When the station was last fetched.
    pub fetched_at: DateTime<Utc>,

    /// True when the departures are left over from an earlier fetch.
    pub is_stale: bool,

    /// Direction groups in configuration order; empty means "no departures".
    pub groups: Vec<GroupView>,
}

impl StopView {
    pub fn has_departures(&self) -> bool {
        self.groups.iter().any(|g| !g.group.is_empty())
    }

    pub fn departure_count(&self) -> usize {
        self.groups.iter().map(|g| g.group.len()).sum()
    }
}

/// Pagination settings forwarded to viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub enabled: bool,
    pub departures_per_page: usize,
    pub page_rotation_seconds: u64,
}

/// The latest rendered state of a route.
///
/// Replaced wholesale on every poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteViewModel {
    pub route_path: String,
    pub title: String,

    /// Stops in configuration order.
    pub stops: Vec<StopView>,

    /// Names of stops whose processing failed this cycle.
    pub failed_stops: Vec<String>,

    /// When this view was published (poll time, not fetch time).
    pub last_update: DateTime<Utc>,

    pub api_status: ApiStatus,

    pub pagination: PaginationInfo,
}

impl RouteViewModel {
    /// All direction groups of all stops, in display order.
    pub fn direction_groups(&self) -> impl Iterator<Item = &DirectionGroup> {
        self.stops
            .iter()
            .flat_map(|s| s.groups.iter().map(|g| &g.group))
    }

    pub fn has_departures(&self) -> bool {
        self.stops.iter().any(StopView::has_departures)
    }
}
