//! Application state for the web layer.

use std::sync::Arc;

use crate::broadcast::ChannelSink;
use crate::cache::StationCache;
use crate::domain::RouteConfiguration;
use crate::poller::RouteState;

/// A configured route and its latest published view.
#[derive(Clone)]
pub struct RouteHandle {
    pub config: Arc<RouteConfiguration>,
    pub state: RouteState,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Routes in configuration order.
    pub routes: Arc<Vec<RouteHandle>>,

    /// Fan-out to connected viewers.
    pub sink: ChannelSink,

    /// Station cache, read for status reporting.
    pub cache: StationCache,
}

impl AppState {
    pub fn new(routes: Vec<RouteHandle>, sink: ChannelSink, cache: StationCache) -> Self {
        Self {
            routes: Arc::new(routes),
            sink,
            cache,
        }
    }

    /// Look up a route by its path.
    pub fn route(&self, path: &str) -> Option<&RouteHandle> {
        self.routes.iter().find(|r| r.config.path == path)
    }
}
