//! Configuration error types.

use std::path::PathBuf;

use crate::domain::InvalidStationId;

/// Errors raised while loading configuration. All of them are fatal at
/// startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an unusable value
    #[error("invalid value {value:?} for {name}: {message}")]
    InvalidVar {
        name: &'static str,
        value: String,
        message: String,
    },

    /// The routes file could not be read
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The routes file is not valid JSON for the expected shape
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no routes configured")]
    NoRoutes,

    #[error("route path {0:?} must start with '/'")]
    InvalidPath(String),

    #[error("route path {0:?} is configured more than once")]
    DuplicatePath(String),

    #[error("route {route:?} has no stops")]
    NoStops { route: String },

    #[error("route {route:?} has a zero refresh interval")]
    ZeroRefreshInterval { route: String },

    #[error("route {route:?}, stop {stop:?}: {source}")]
    InvalidStationId {
        route: String,
        stop: String,
        #[source]
        source: InvalidStationId,
    },

    #[error("route {route:?}, stop {stop:?}: {field} must be at least 1")]
    ZeroLimit {
        route: String,
        stop: String,
        field: &'static str,
    },

    #[error("route {route:?}, stop {stop:?}: negative leeway {minutes}")]
    NegativeLeeway {
        route: String,
        stop: String,
        minutes: i64,
    },

    #[error("route {route:?}, stop {stop:?}: empty pattern")]
    EmptyPattern { route: String, stop: String },

    /// A pattern selects a direction and excludes departures at the same
    /// time
    #[error("route {route:?}, stop {stop:?}: direction pattern {pattern:?} is also excluded")]
    ConflictingPattern {
        route: String,
        stop: String,
        pattern: String,
    },
}
