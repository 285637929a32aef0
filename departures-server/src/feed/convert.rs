//! Conversion from MVG DTOs to domain departures.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::{RawDeparture, StationId};

use super::types::MvgDeparture;

/// Error during DTO to domain conversion.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConversionError {
    /// Timestamp outside the representable range
    #[error("invalid timestamp: {0}")]
    InvalidTime(i64),

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Convert a departures response to domain types.
///
/// Invalid entries are logged and skipped rather than failing the whole
/// board.
pub fn convert_departures(station: &StationId, items: Vec<MvgDeparture>) -> Vec<RawDeparture> {
    let mut results = Vec::with_capacity(items.len());

    for item in items {
        match convert_departure(item) {
            Ok(dep) => results.push(dep),
            Err(e) => warn!(station = %station, error = %e, "skipping departure"),
        }
    }

    results
}

/// Convert a single departure.
pub fn convert_departure(item: MvgDeparture) -> Result<RawDeparture, ConversionError> {
    let planned_time = from_millis(item.planned_departure_time)?;

    // Only trust the forecast when the API flags it as live.
    let realtime_time = match (item.realtime, item.realtime_departure_time) {
        (true, Some(ms)) => Some(from_millis(ms)?),
        _ => None,
    };

    let delay_seconds = match realtime_time {
        Some(rt) => Some((rt - planned_time).num_seconds()),
        None => item.delay_in_minutes.map(|m| m * 60),
    };

    let line = item
        .label
        .filter(|l| !l.is_empty())
        .ok_or(ConversionError::MissingField("label"))?;

    let destination = item
        .destination
        .ok_or(ConversionError::MissingField("destination"))?;

    let stop_point_id = item
        .stop_point_global_id
        .as_deref()
        .and_then(|s| StationId::parse(s).ok());

    Ok(RawDeparture {
        line,
        destination,
        transport_type: item
            .transport_type
            .as_deref()
            .map(transport_type_name)
            .unwrap_or_default(),
        planned_time,
        realtime_time,
        delay_seconds,
        is_cancelled: item.cancelled,
        platform: item.platform.map(|p| p.into_text()),
        stop_point_id,
        messages: item.messages,
    })
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, ConversionError> {
    DateTime::from_timestamp_millis(ms).ok_or(ConversionError::InvalidTime(ms))
}

/// Map the API's transport type enum to a display name.
pub fn transport_type_name(code: &str) -> String {
    match code {
        "UBAHN" => "U-Bahn",
        "SBAHN" => "S-Bahn",
        "BUS" => "Bus",
        "TRAM" => "Tram",
        "BAHN" => "Bahn",
        "REGIONAL_BUS" => "Regionalbus",
        other => other,
    }
    .to_string()
}
