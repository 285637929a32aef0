//! Startup configuration.
//!
//! Process settings come from environment variables (optionally seeded from
//! a `.env` file); the dashboards come from a routes JSON file. Both are
//! read once at startup and never reloaded.

mod app;
mod error;
mod routes;

pub use app::{AppConfig, DEFAULT_ROUTES_CONFIG};
pub use error::ConfigError;
pub use routes::{DirectionEntry, DisplayEntry, RouteEntry, RoutesFile, StopEntry, load_routes};
