//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::broadcast::BroadcastSink;
use crate::domain::{ApiStatus, RouteViewModel};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/routes", get(list_routes))
        .route("/api/stations", get(list_stations))
        .route("/api/state", get(root_state))
        .route("/api/state/*path", get(route_state))
        .route("/api/events", get(root_events))
        .route("/api/events/*path", get(route_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// All routes with their status and viewer counts.
async fn list_routes(State(state): State<AppState>) -> Json<RoutesResponse> {
    let mut routes = Vec::with_capacity(state.routes.len());

    for route in state.routes.iter() {
        let snapshot = route.state.snapshot().await;
        routes.push(RouteSummary {
            path: route.config.path.clone(),
            title: route.config.display.title.clone(),
            stops: route.config.stops.len(),
            api_status: snapshot
                .as_ref()
                .map_or(ApiStatus::Unknown, |v| v.api_status),
            last_update: snapshot.as_ref().map(|v| v.last_update),
            viewer_count: state.sink.viewer_count(&route.config.path),
        });
    }

    Json(RoutesResponse { routes })
}

/// Fetch status of every cached station.
async fn list_stations(State(state): State<AppState>) -> Json<StationsResponse> {
    let mut stations = Vec::new();
    for id in state.cache.station_ids().await {
        if let Some(entry) = state.cache.get(&id).await {
            stations.push(StationStatus::from(entry.as_ref()));
        }
    }
    Json(StationsResponse { stations })
}

async fn root_state(State(state): State<AppState>) -> Result<Response, AppError> {
    snapshot_response(&state, "/").await
}

async fn route_state(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    snapshot_response(&state, &route_path(&path)).await
}

async fn root_events(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    events_response(state, "/".to_string()).await
}

async fn route_events(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    events_response(state, route_path(&path)).await
}

/// Route path for a wildcard capture.
fn route_path(captured: &str) -> String {
    format!("/{}", captured.trim_start_matches('/'))
}

/// Latest view of a route, or a pending marker before its first publish.
async fn snapshot_response(state: &AppState, path: &str) -> Result<Response, AppError> {
    let route = state
        .route(path)
        .ok_or_else(|| AppError::route_not_found(path))?;

    Ok(match route.state.snapshot().await {
        Some(view) => Json(view.as_ref()).into_response(),
        None => Json(PendingResponse::new()).into_response(),
    })
}

/// Server-sent event stream of a route's views, starting with the current
/// snapshot.
async fn events_response(
    state: AppState,
    path: String,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let route = state
        .route(&path)
        .ok_or_else(|| AppError::route_not_found(&path))?;

    // Subscribe before reading the snapshot so no publish falls in between.
    let updates = state.sink.subscribe(&path);
    let snapshot = route.state.snapshot().await;
    info!(
        route = %path,
        viewers = state.sink.viewer_count(&path),
        "viewer connected"
    );

    let events = view_stream(snapshot, updates)
        .map(|view| Event::default().event("update").json_data(view.as_ref()));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// The snapshot (if any) followed by every later view. A lagging viewer
/// skips straight to the newest view.
fn view_stream(
    snapshot: Option<Arc<RouteViewModel>>,
    updates: broadcast::Receiver<Arc<RouteViewModel>>,
) -> impl Stream<Item = Arc<RouteViewModel>> {
    let updates = stream::unfold(updates, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(view) => return Some((view, rx)),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "viewer lagged behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    stream::iter(snapshot).chain(updates)
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound { message: String },
}

impl AppError {
    fn route_not_found(path: &str) -> Self {
        AppError::NotFound {
            message: format!("unknown route: {path}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
        };

        warn!(%status, %message, "request failed");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
