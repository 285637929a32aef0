//! Delivery of route views to connected viewers.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::RouteViewModel;

/// Channel capacity per route. Viewers only care about the latest view, so
/// a lagging receiver simply skips ahead.
const CHANNEL_CAPACITY: usize = 16;

/// Destination for published route views.
pub trait BroadcastSink: Send + Sync + 'static {
    /// Deliver a view to every viewer of `route_path`. Must not block on
    /// slow viewers.
    fn publish(&self, route_path: &str, view: Arc<RouteViewModel>);

    /// Number of viewers currently attached to `route_path`.
    fn viewer_count(&self, route_path: &str) -> usize;
}

/// Sink backed by one tokio broadcast channel per route.
///
/// Cheap to clone; clones share the same channels.
#[derive(Clone, Default)]
pub struct ChannelSink {
    channels: Arc<DashMap<String, broadcast::Sender<Arc<RouteViewModel>>>>,
}

impl ChannelSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the channel for a route if it does not exist yet.
    pub fn register(&self, route_path: &str) {
        self.sender(route_path);
    }

    /// Attach a viewer to a route.
    pub fn subscribe(&self, route_path: &str) -> broadcast::Receiver<Arc<RouteViewModel>> {
        self.sender(route_path).subscribe()
    }

    fn sender(&self, route_path: &str) -> broadcast::Sender<Arc<RouteViewModel>> {
        self.channels
            .entry(route_path.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl BroadcastSink for ChannelSink {
    fn publish(&self, route_path: &str, view: Arc<RouteViewModel>) {
        let sender = self.sender(route_path);
        // An error only means nobody is listening right now.
        match sender.send(view) {
            Ok(viewers) => trace!(route = route_path, viewers, "published view"),
            Err(_) => trace!(route = route_path, "no viewers"),
        }
    }

    fn viewer_count(&self, route_path: &str) -> usize {
        self.channels
            .get(route_path)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ApiStatus, PaginationInfo};
    use chrono::Utc;

    fn view(path: &str) -> Arc<RouteViewModel> {
        Arc::new(RouteViewModel {
            route_path: path.to_string(),
            title: "Test".to_string(),
            stops: Vec::new(),
            failed_stops: Vec::new(),
            last_update: Utc::now(),
            api_status: ApiStatus::Success,
            pagination: PaginationInfo {
                enabled: false,
                departures_per_page: 5,
                page_rotation_seconds: 8,
            },
        })
    }

    #[tokio::test]
    async fn viewers_receive_their_route_only() {
        let sink = ChannelSink::new();
        let mut home = sink.subscribe("/");
        let mut work = sink.subscribe("/work");

        sink.publish("/", view("/"));

        let received = home.recv().await.unwrap();
        assert_eq!(received.route_path, "/");
        assert!(work.try_recv().is_err());
    }

    #[test]
    fn publish_without_viewers_is_fine() {
        let sink = ChannelSink::new();
        sink.register("/");
        sink.publish("/", view("/"));
        sink.publish("/unknown", view("/unknown"));
        assert_eq!(sink.viewer_count("/"), 0);
    }

    #[test]
    fn viewer_count_tracks_receivers() {
        let sink = ChannelSink::new();
        assert_eq!(sink.viewer_count("/"), 0);

        let a = sink.subscribe("/");
        let b = sink.subscribe("/");
        assert_eq!(sink.viewer_count("/"), 2);

        drop(a);
        assert_eq!(sink.viewer_count("/"), 1);
        drop(b);
        assert_eq!(sink.viewer_count("/"), 0);
    }

    #[tokio::test]
    async fn every_viewer_gets_the_same_view() {
        let sink = ChannelSink::new();
        let mut a = sink.subscribe("/");
        let mut b = sink.subscribe("/");

        let published = view("/");
        sink.publish("/", published.clone());

        assert!(Arc::ptr_eq(&a.recv().await.unwrap(), &published));
        assert!(Arc::ptr_eq(&b.recv().await.unwrap(), &published));
    }
}
