//! Mock feed client for running without network access.
//!
//! Loads sample departure boards from JSON files and serves them as if
//! they were live API responses. Departure times in the files are given in
//! minutes relative to the moment of the fetch, so the boards never go
//! stale.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::domain::{RawDeparture, StationId};

use super::client::FeedClient;
use super::error::FeedError;

/// A departures board as stored on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct MockBoard {
    pub station_id: StationId,
    pub departures: Vec<MockDeparture>,
}

/// One departure of a mock board.
#[derive(Debug, Clone, Deserialize)]
pub struct MockDeparture {
    pub line: String,
    pub destination: String,
    #[serde(default)]
    pub transport_type: String,
    /// Planned departure, in minutes from now.
    pub minutes_from_now: i64,
    /// Delay in minutes; when set the departure carries real-time data.
    pub delay_minutes: Option<i64>,
    pub platform: Option<String>,
    pub stop_point_id: Option<StationId>,
    #[serde(default)]
    pub cancelled: bool,
}

impl MockDeparture {
    fn materialize(&self, now: chrono::DateTime<Utc>) -> RawDeparture {
        let planned_time = now + Duration::minutes(self.minutes_from_now);
        let realtime_time = self
            .delay_minutes
            .map(|d| planned_time + Duration::minutes(d));

        RawDeparture {
            line: self.line.clone(),
            destination: self.destination.clone(),
            transport_type: self.transport_type.clone(),
            planned_time,
            realtime_time,
            delay_seconds: self.delay_minutes.map(|d| d * 60),
            is_cancelled: self.cancelled,
            platform: self.platform.clone(),
            stop_point_id: self.stop_point_id.clone(),
            messages: Vec::new(),
        }
    }
}

/// Mock feed client that serves data from JSON files.
#[derive(Clone)]
pub struct MockFeedClient {
    /// Pre-loaded boards, keyed by station id.
    boards: Arc<HashMap<StationId, MockBoard>>,
}

impl MockFeedClient {
    /// Create a new mock client by loading every `*.json` board in a directory.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self, FeedError> {
        let boards = load_boards(data_dir.as_ref())?;
        Ok(Self::from_boards(boards))
    }

    /// Create a mock client from boards already in memory.
    pub fn from_boards(boards: Vec<MockBoard>) -> Self {
        let boards = boards
            .into_iter()
            .map(|b| (b.station_id.clone(), b))
            .collect();

        Self {
            boards: Arc::new(boards),
        }
    }

    /// Get departures for a station.
    ///
    /// Stop-point ids fall back to their base station's board.
    pub async fn get_departures(
        &self,
        station: &StationId,
    ) -> Result<Vec<RawDeparture>, FeedError> {
        let board = self
            .board_for(station)
            .ok_or_else(|| FeedError::StationNotFound(station.to_string()))?;

        let now = Utc::now();
        Ok(board.departures.iter().map(|d| d.materialize(now)).collect())
    }

    /// The stations among `stations` that no board can serve.
    pub fn missing_boards(&self, stations: &[StationId]) -> Vec<StationId> {
        stations
            .iter()
            .filter(|s| self.board_for(s).is_none())
            .cloned()
            .collect()
    }

    fn board_for(&self, station: &StationId) -> Option<&MockBoard> {
        self.boards
            .get(station)
            .or_else(|| self.boards.get(&station.base_station()))
    }
}

impl FeedClient for MockFeedClient {
    async fn fetch(&self, station: &StationId) -> Result<Vec<RawDeparture>, FeedError> {
        self.get_departures(station).await
    }
}

fn load_boards(data_dir: &Path) -> Result<Vec<MockBoard>, FeedError> {
    let entries = std::fs::read_dir(data_dir).map_err(|e| FeedError::ApiError {
        status: 0,
        message: format!("Failed to read mock data directory: {}", e),
    })?;

    let mut boards = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| FeedError::ApiError {
            status: 0,
            message: format!("Failed to read directory entry: {}", e),
        })?;

        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }

        let json = std::fs::read_to_string(&path).map_err(|e| FeedError::ApiError {
            status: 0,
            message: format!("Failed to read {:?}: {}", path, e),
        })?;

        let board: MockBoard = serde_json::from_str(&json).map_err(|e| FeedError::Json {
            message: format!("Failed to parse {:?}: {}", path, e),
            body: None,
        })?;

        boards.push(board);
    }

    if boards.is_empty() {
        return Err(FeedError::ApiError {
            status: 0,
            message: format!("No mock board files found in {:?}", data_dir),
        });
    }

    Ok(boards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const BOARD: &str = r#"{
        "station_id": "de:09162:1108",
        "departures": [
            { "line": "U2", "destination": "Feldmoching", "minutes_from_now": 3,
              "delay_minutes": 1, "stop_point_id": "de:09162:1108:1:1" },
            { "line": "59", "destination": "Giesing", "transport_type": "Bus",
              "minutes_from_now": 7 }
        ]
    }"#;

    #[tokio::test]
    async fn load_mock_data() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("board.json"), BOARD).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let client = MockFeedClient::new(dir.path()).unwrap();
        let station = StationId::parse("de:09162:1108").unwrap();
        assert!(client.missing_boards(&[station]).is_empty());
    }

    #[test]
    fn reports_stations_without_boards() {
        let board: MockBoard = serde_json::from_str(BOARD).unwrap();
        let client = MockFeedClient::from_boards(vec![board]);

        let stations = [
            StationId::parse("de:09162:1108:1:1").unwrap(),
            StationId::parse("de:09162:6").unwrap(),
        ];
        assert_eq!(
            client.missing_boards(&stations),
            vec![StationId::parse("de:09162:6").unwrap()]
        );
    }

    #[tokio::test]
    async fn get_departures_relative_to_now() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("board.json"), BOARD).unwrap();
        let client = MockFeedClient::new(dir.path()).unwrap();

        let before = Utc::now();
        let deps = client
            .fetch(&StationId::parse("de:09162:1108").unwrap())
            .await
            .unwrap();

        assert_eq!(deps.len(), 2);
        assert!(deps[0].planned_time >= before + Duration::minutes(3));
        assert_eq!(deps[0].delay_seconds, Some(60));
        assert!(deps[0].is_realtime());
        assert!(!deps[1].is_realtime());
        assert_eq!(deps[1].transport_type, "Bus");
    }

    #[tokio::test]
    async fn stop_point_falls_back_to_station_board() {
        let board: MockBoard = serde_json::from_str(BOARD).unwrap();
        let client = MockFeedClient::from_boards(vec![board]);

        let deps = client
            .fetch(&StationId::parse("de:09162:1108:1:1").unwrap())
            .await
            .unwrap();
        assert_eq!(deps.len(), 2);
    }

    #[tokio::test]
    async fn unknown_station_returns_error() {
        let client = MockFeedClient::from_boards(vec![]);
        let result = client.fetch(&StationId::parse("de:1:2").unwrap()).await;
        assert!(matches!(result, Err(FeedError::StationNotFound(_))));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(MockFeedClient::new(dir.path()).is_err());
    }

    #[tokio::test]
    async fn shipped_boards_cover_example_routes() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/data/mock_boards");
        let client = MockFeedClient::new(dir).unwrap();

        let routes = crate::config::load_routes(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/config/routes.example.json"
        ))
        .unwrap();
        let stations: Vec<StationId> = routes
            .iter()
            .flat_map(|r| r.stops.iter().map(|s| s.station_id.clone()))
            .collect();
        assert!(client.missing_boards(&stations).is_empty());

        let deps = client
            .fetch(&StationId::parse("de:09162:1108:1:1").unwrap())
            .await
            .unwrap();
        assert!(deps.iter().any(|d| d.stop_point_id.is_some()));
    }
}
