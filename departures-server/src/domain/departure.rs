//! Raw departure records as delivered by the feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StationId;

/// One upcoming vehicle departure.
///
/// Immutable once fetched: the engine filters, reorders and truncates lists
/// of departures but never edits a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDeparture {
    /// Line or route label (e.g. "U2", "59").
    pub line: String,

    /// Destination text as shown on the vehicle.
    pub destination: String,

    /// Transport type (e.g. "U-Bahn", "Bus"). May be empty.
    #[serde(default)]
    pub transport_type: String,

    /// Timetabled departure time.
    pub planned_time: DateTime<Utc>,

    /// Observed/forecast departure time, when the feed has real-time data.
    pub realtime_time: Option<DateTime<Utc>>,

    /// Delay in seconds relative to the planned time.
    pub delay_seconds: Option<i64>,

    /// Whether the departure is cancelled.
    #[serde(default)]
    pub is_cancelled: bool,

    /// Platform or stand.
    pub platform: Option<String>,

    /// Stop-point the departure was observed at.
    pub stop_point_id: Option<StationId>,

    /// Free-text service messages attached by the feed.
    #[serde(default)]
    pub messages: Vec<String>,
}

impl RawDeparture {
    /// Create a departure with only the required fields set.
    pub fn new(
        line: impl Into<String>,
        destination: impl Into<String>,
        planned_time: DateTime<Utc>,
    ) -> Self {
        Self {
            line: line.into(),
            destination: destination.into(),
            transport_type: String::new(),
            planned_time,
            realtime_time: None,
            delay_seconds: None,
            is_cancelled: false,
            platform: None,
            stop_point_id: None,
            messages: Vec::new(),
        }
    }

    /// The time the vehicle is expected to leave: real-time if known,
    /// otherwise planned.
    pub fn effective_time(&self) -> DateTime<Utc> {
        self.realtime_time.unwrap_or(self.planned_time)
    }

    /// Whether real-time data is available for this departure.
    pub fn is_realtime(&self) -> bool {
        self.realtime_time.is_some()
    }

    /// Set the real-time departure time.
    pub fn with_realtime(mut self, time: DateTime<Utc>) -> Self {
        self.realtime_time = Some(time);
        self.delay_seconds = Some((time - self.planned_time).num_seconds());
        self
    }

    /// Set the transport type.
    pub fn with_transport_type(mut self, transport_type: impl Into<String>) -> Self {
        self.transport_type = transport_type.into();
        self
    }

    /// Set the stop-point the departure was observed at.
    pub fn with_stop_point(mut self, stop_point: StationId) -> Self {
        self.stop_point_id = Some(stop_point);
        self
    }

    /// Set the platform.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap()
    }

    #[test]
    fn effective_time_prefers_realtime() {
        let dep = RawDeparture::new("U2", "Messestadt Ost", at(10, 0));
        assert_eq!(dep.effective_time(), at(10, 0));
        assert!(!dep.is_realtime());

        let dep = dep.with_realtime(at(10, 3));
        assert_eq!(dep.effective_time(), at(10, 3));
        assert!(dep.is_realtime());
    }

    #[test]
    fn with_realtime_records_delay() {
        let dep = RawDeparture::new("59", "Giesing", at(10, 0)).with_realtime(at(9, 59));
        assert_eq!(dep.delay_seconds, Some(-60));

        let dep = RawDeparture::new("59", "Giesing", at(10, 0))
            .with_realtime(at(10, 0) + Duration::seconds(90));
        assert_eq!(dep.delay_seconds, Some(90));
    }

    #[test]
    fn deserialize_with_defaults() {
        let json = r#"{
            "line": "U2",
            "destination": "Feldmoching",
            "planned_time": "2024-03-15T10:00:00Z",
            "realtime_time": null,
            "delay_seconds": null,
            "platform": "1",
            "stop_point_id": "de:09162:1108:1:1"
        }"#;
        let dep: RawDeparture = serde_json::from_str(json).unwrap();
        assert_eq!(dep.transport_type, "");
        assert!(!dep.is_cancelled);
        assert!(dep.messages.is_empty());
        assert_eq!(
            dep.stop_point_id.as_ref().map(|s| s.as_str()),
            Some("de:09162:1108:1:1")
        );
    }
}
