//! Web layer for the departures dashboard.
//!
//! Serves route snapshots for late-joining viewers, a server-sent event
//! stream of published views, and status listings for health checks.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppState, RouteHandle};
