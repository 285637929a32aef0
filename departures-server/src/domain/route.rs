//! Dashboard route configuration.

use std::time::Duration;

use super::{StationId, StopConfiguration};

/// Presentation settings for a route.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayOptions {
    /// Page title.
    pub title: String,

    /// Whether long groups are split into rotating pages.
    pub pagination_enabled: bool,

    /// Departures per page within a group.
    pub departures_per_page: usize,

    /// Seconds each page stays on screen.
    pub page_rotation_seconds: u64,

    /// Whether group headers get generated background colours.
    pub random_header_colors: bool,

    /// Brightness of generated header colours (0..=1).
    pub header_background_brightness: f64,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            title: "Departures".to_string(),
            pagination_enabled: true,
            departures_per_page: 5,
            page_rotation_seconds: 8,
            random_header_colors: false,
            header_background_brightness: 0.7,
        }
    }
}

/// A dashboard route: one URL path showing an ordered list of stops.
#[derive(Debug, Clone)]
pub struct RouteConfiguration {
    /// URL path the route is served under, starting with `/`.
    pub path: String,

    /// Stops in display order.
    pub stops: Vec<StopConfiguration>,

    /// Presentation settings.
    pub display: DisplayOptions,

    /// Route-specific refresh interval; the global default applies if unset.
    pub refresh_interval: Option<Duration>,
}

impl RouteConfiguration {
    pub fn new(path: impl Into<String>, stops: Vec<StopConfiguration>) -> Self {
        Self {
            path: path.into(),
            stops,
            display: DisplayOptions::default(),
            refresh_interval: None,
        }
    }

    /// Set a route-specific refresh interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// The interval this route's poller runs on.
    pub fn effective_refresh_interval(&self, global: Duration) -> Duration {
        self.refresh_interval.unwrap_or(global)
    }

    /// Station ids referenced by this route, in stop order.
    pub fn station_ids(&self) -> impl Iterator<Item = &StationId> {
        self.stops.iter().map(|s| &s.station_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(id: &str) -> StopConfiguration {
        StopConfiguration::new(StationId::parse(id).unwrap(), id)
    }

    #[test]
    fn refresh_interval_override() {
        let global = Duration::from_secs(30);
        let route = RouteConfiguration::new("/", vec![stop("a")]);
        assert_eq!(route.effective_refresh_interval(global), global);

        let route = route.with_refresh_interval(Duration::from_secs(10));
        assert_eq!(
            route.effective_refresh_interval(global),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn station_ids_in_stop_order() {
        let route = RouteConfiguration::new("/work", vec![stop("b"), stop("a"), stop("b")]);
        let ids: Vec<_> = route.station_ids().map(|s| s.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "b"]);
    }

    #[test]
    fn display_defaults() {
        let display = DisplayOptions::default();
        assert!(display.pagination_enabled);
        assert_eq!(display.departures_per_page, 5);
        assert_eq!(display.page_rotation_seconds, 8);
        assert!(!display.random_header_colors);
        assert_eq!(display.header_background_brightness, 0.7);
    }
}
