//! MVG departures API response DTOs.
//!
//! These types map directly to the JSON returned by the departures
//! endpoint. Most fields are optional because the API omits them freely.

use serde::Deserialize;

/// One entry of the departures array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MvgDeparture {
    /// Timetabled departure, milliseconds since the Unix epoch.
    pub planned_departure_time: i64,

    /// Forecast departure, milliseconds since the Unix epoch.
    pub realtime_departure_time: Option<i64>,

    /// Delay in whole minutes.
    pub delay_in_minutes: Option<i64>,

    /// Whether `realtime_departure_time` is backed by live data.
    #[serde(default)]
    pub realtime: bool,

    /// Line label (e.g. "U2", "59").
    pub label: Option<String>,

    /// Destination text.
    pub destination: Option<String>,

    /// Transport type enum (e.g. "UBAHN", "BUS").
    pub transport_type: Option<String>,

    /// Platform; sent as a number for rail and as text for some stands.
    pub platform: Option<MvgPlatform>,

    /// Whether this departure is cancelled.
    #[serde(default)]
    pub cancelled: bool,

    /// Service messages.
    #[serde(default)]
    pub messages: Vec<String>,

    /// Global id of the stop-point the departure leaves from.
    pub stop_point_global_id: Option<String>,
}

/// Platform value, which the API sends as either a number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MvgPlatform {
    Number(i64),
    Text(String),
}

impl MvgPlatform {
    pub fn into_text(self) -> String {
        match self {
            MvgPlatform::Number(n) => n.to_string(),
            MvgPlatform::Text(s) => s,
        }
    }
}
