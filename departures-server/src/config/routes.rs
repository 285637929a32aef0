//! Routes file loading and validation.
//!
//! The routes file is JSON:
//!
//! ```json
//! {
//!   "routes": [
//!     {
//!       "path": "/",
//!       "title": "Home",
//!       "stops": [
//!         {
//!           "station_id": "de:09162:6",
//!           "station_name": "Hauptbahnhof",
//!           "direction_mappings": [
//!             { "label": "North", "patterns": ["Feldmoching", "U2 Moosach"] }
//!           ],
//!           "exclude_destinations": ["Betriebsfahrt"]
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Direction mappings are a list, not an object, because their order
//! decides which direction a departure lands in.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::domain::{
    DEFAULT_MAX_DEPARTURES_PER_ROUTE, DEFAULT_MAX_DEPARTURES_PER_STOP, DEFAULT_UNGROUPED_TITLE,
    DirectionMapping, DisplayOptions, Pattern, RouteConfiguration, StationId, StopConfiguration,
};

use super::error::ConfigError;

/// Top level of the routes file.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutesFile {
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteEntry {
    pub path: String,
    pub title: Option<String>,
    pub refresh_interval_seconds: Option<u64>,
    #[serde(default)]
    pub display: DisplayEntry,
    #[serde(default)]
    pub stops: Vec<StopEntry>,
}

/// Presentation settings; unset fields keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayEntry {
    pub pagination_enabled: Option<bool>,
    pub departures_per_page: Option<usize>,
    pub page_rotation_seconds: Option<u64>,
    pub random_header_colors: Option<bool>,
    pub header_background_brightness: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopEntry {
    pub station_id: String,
    pub station_name: Option<String>,
    #[serde(default)]
    pub direction_mappings: Vec<DirectionEntry>,
    #[serde(default = "default_per_stop")]
    pub max_departures_per_stop: usize,
    #[serde(default = "default_per_route")]
    pub max_departures_per_route: usize,
    #[serde(default)]
    pub departure_leeway_minutes: i64,
    pub max_hours_in_advance: Option<i64>,
    #[serde(default)]
    pub exclude_destinations: Vec<String>,
    pub platform_filter: Option<u32>,
    #[serde(default)]
    pub platform_filter_routes: Vec<String>,
    #[serde(default = "default_show_ungrouped")]
    pub show_ungrouped: bool,
    pub ungrouped_title: Option<String>,
    pub random_header_colors: Option<bool>,
    pub header_background_brightness: Option<f64>,
    pub random_color_salt: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionEntry {
    pub label: String,
    #[serde(default)]
    pub patterns: Vec<String>,
}

fn default_per_stop() -> usize {
    DEFAULT_MAX_DEPARTURES_PER_STOP
}

fn default_per_route() -> usize {
    DEFAULT_MAX_DEPARTURES_PER_ROUTE
}

fn default_show_ungrouped() -> bool {
    true
}

impl RoutesFile {
    /// Read a routes file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate the file and convert it into route configurations.
    pub fn into_routes(self) -> Result<Vec<RouteConfiguration>, ConfigError> {
        if self.routes.is_empty() {
            return Err(ConfigError::NoRoutes);
        }

        let mut seen_paths = HashSet::new();
        let mut routes = Vec::with_capacity(self.routes.len());

        for entry in self.routes {
            if !entry.path.starts_with('/') {
                return Err(ConfigError::InvalidPath(entry.path));
            }
            if !seen_paths.insert(entry.path.clone()) {
                return Err(ConfigError::DuplicatePath(entry.path));
            }
            routes.push(entry.into_route()?);
        }

        Ok(routes)
    }
}

impl RouteEntry {
    fn into_route(self) -> Result<RouteConfiguration, ConfigError> {
        if self.stops.is_empty() {
            return Err(ConfigError::NoStops { route: self.path });
        }

        let stops = self
            .stops
            .into_iter()
            .map(|stop| stop.into_stop(&self.path))
            .collect::<Result<Vec<_>, _>>()?;

        let mut route = RouteConfiguration::new(self.path.clone(), stops);
        route.display = self.display.into_options(self.title);

        if let Some(secs) = self.refresh_interval_seconds {
            if secs == 0 {
                return Err(ConfigError::ZeroRefreshInterval { route: self.path });
            }
            route = route.with_refresh_interval(Duration::from_secs(secs));
        }

        Ok(route)
    }
}

impl DisplayEntry {
    fn into_options(self, title: Option<String>) -> DisplayOptions {
        let defaults = DisplayOptions::default();
        DisplayOptions {
            title: title.unwrap_or(defaults.title),
            pagination_enabled: self
                .pagination_enabled
                .unwrap_or(defaults.pagination_enabled),
            departures_per_page: self
                .departures_per_page
                .filter(|n| *n > 0)
                .unwrap_or(defaults.departures_per_page),
            page_rotation_seconds: self
                .page_rotation_seconds
                .unwrap_or(defaults.page_rotation_seconds),
            random_header_colors: self
                .random_header_colors
                .unwrap_or(defaults.random_header_colors),
            header_background_brightness: self
                .header_background_brightness
                .map(|b| b.clamp(0.0, 1.0))
                .unwrap_or(defaults.header_background_brightness),
        }
    }
}

impl StopEntry {
    fn into_stop(self, route: &str) -> Result<StopConfiguration, ConfigError> {
        let name = self
            .station_name
            .clone()
            .unwrap_or_else(|| self.station_id.clone());

        let station_id =
            StationId::parse(&self.station_id).map_err(|source| ConfigError::InvalidStationId {
                route: route.to_string(),
                stop: name.clone(),
                source,
            })?;

        for (field, value) in [
            ("max_departures_per_stop", self.max_departures_per_stop),
            ("max_departures_per_route", self.max_departures_per_route),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroLimit {
                    route: route.to_string(),
                    stop: name,
                    field,
                });
            }
        }

        if self.departure_leeway_minutes < 0 {
            return Err(ConfigError::NegativeLeeway {
                route: route.to_string(),
                stop: name,
                minutes: self.departure_leeway_minutes,
            });
        }

        let directions: Vec<DirectionMapping> = self
            .direction_mappings
            .into_iter()
            .map(|d| DirectionMapping {
                patterns: d.patterns.iter().map(|p| Pattern::new(p)).collect(),
                label: d.label,
            })
            .collect();
        let exclusions: Vec<Pattern> = self
            .exclude_destinations
            .iter()
            .map(|p| Pattern::new(p))
            .collect();

        let mut all_patterns = directions
            .iter()
            .flat_map(|d| &d.patterns)
            .chain(&exclusions);
        if all_patterns.any(Pattern::is_empty) {
            return Err(ConfigError::EmptyPattern {
                route: route.to_string(),
                stop: name,
            });
        }

        let excluded: HashSet<&str> = exclusions.iter().map(Pattern::normalized).collect();
        if let Some(conflict) = directions
            .iter()
            .flat_map(|d| &d.patterns)
            .find(|p| excluded.contains(p.normalized()))
        {
            return Err(ConfigError::ConflictingPattern {
                route: route.to_string(),
                stop: name,
                pattern: conflict.as_str().to_string(),
            });
        }

        Ok(StopConfiguration {
            station_id,
            station_name: name,
            directions,
            max_departures_per_stop: self.max_departures_per_stop,
            max_departures_per_route: self.max_departures_per_route,
            departure_leeway_minutes: self.departure_leeway_minutes,
            max_hours_in_advance: self.max_hours_in_advance,
            exclusions,
            platform_filter: self.platform_filter,
            platform_filter_routes: self
                .platform_filter_routes
                .iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
            show_ungrouped: self.show_ungrouped,
            ungrouped_title: self
                .ungrouped_title
                .unwrap_or_else(|| DEFAULT_UNGROUPED_TITLE.to_string()),
            random_header_colors: self.random_header_colors,
            header_background_brightness: self
                .header_background_brightness
                .map(|b| b.clamp(0.0, 1.0)),
            random_color_salt: self.random_color_salt,
        })
    }
}

/// Load and validate the routes file at `path`.
pub fn load_routes(path: impl AsRef<Path>) -> Result<Vec<Arc<RouteConfiguration>>, ConfigError> {
    let path = path.as_ref();
    let routes = RoutesFile::load(path)?.into_routes()?;
    info!(
        path = %path.display(),
        routes = routes.len(),
        stops = routes.iter().map(|r| r.stops.len()).sum::<usize>(),
        "loaded routes"
    );
    Ok(routes.into_iter().map(Arc::new).collect())
}
