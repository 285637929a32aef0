//! Upstream departure feed.
//!
//! This module provides the [`FeedClient`] seam the fetch scheduler calls,
//! an HTTP implementation for the MVG departures API, and a file-backed
//! mock for development.
//!
//! Key characteristics of the upstream feed:
//! - It is rate-sensitive: bursts of requests get throttled or blocked, so
//!   callers pace their requests
//! - It only accepts whole-station ids; stop-point filtering happens
//!   client-side using each departure's stop-point id
//! - Times are epoch milliseconds (UTC)

mod client;
mod convert;
mod error;
mod mock;
mod types;

pub use client::{FeedClient, MvgClient, MvgConfig};
pub use convert::{ConversionError, convert_departure, convert_departures};
pub use error::FeedError;
pub use mock::{MockBoard, MockDeparture, MockFeedClient};
pub use types::{MvgDeparture, MvgPlatform};

use crate::domain::{RawDeparture, StationId};

/// The feed selected at startup.
#[derive(Clone)]
pub enum FeedSource {
    Mvg(MvgClient),
    Mock(MockFeedClient),
}

impl FeedClient for FeedSource {
    async fn fetch(&self, station: &StationId) -> Result<Vec<RawDeparture>, FeedError> {
        match self {
            FeedSource::Mvg(client) => client.get_departures(station).await,
            FeedSource::Mock(client) => client.get_departures(station).await,
        }
    }
}
