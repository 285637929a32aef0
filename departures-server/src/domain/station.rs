//! Station identifier types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid station identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station id: {reason}")]
pub struct InvalidStationId {
    reason: &'static str,
}

/// Identifier of a whole station or of one stop-point within it.
///
/// Identifiers are opaque to the engine except for one convention: a global
/// id with at least five colon-separated parts whose last two parts are
/// equal (e.g. `de:09162:1108:1:1`) names a physical stop-point, and its
/// first three parts name the station it belongs to.
///
/// # Examples
///
/// ```
/// use departures_server::domain::StationId;
///
/// let station = StationId::parse("de:09162:1108").unwrap();
/// assert!(!station.is_stop_point());
///
/// let point = StationId::parse("de:09162:1108:1:1").unwrap();
/// assert!(point.is_stop_point());
/// assert_eq!(point.base_station(), station);
///
/// assert!(StationId::parse("").is_err());
/// assert!(StationId::parse("de 09162").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationId(String);

impl StationId {
    /// Parse a station identifier.
    ///
    /// The input must be non-empty and contain no whitespace.
    pub fn parse(s: &str) -> Result<Self, InvalidStationId> {
        if s.is_empty() {
            return Err(InvalidStationId {
                reason: "must not be empty",
            });
        }

        if s.chars().any(char::is_whitespace) {
            return Err(InvalidStationId {
                reason: "must not contain whitespace",
            });
        }

        Ok(StationId(s.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identifier names a single stop-point of a station.
    pub fn is_stop_point(&self) -> bool {
        let parts: Vec<&str> = self.0.split(':').collect();
        parts.len() >= 5 && parts[parts.len() - 1] == parts[parts.len() - 2]
    }

    /// The station this identifier belongs to.
    ///
    /// For a stop-point id this is its first three parts; any other id is
    /// returned unchanged.
    pub fn base_station(&self) -> StationId {
        if self.is_stop_point() {
            let base: Vec<&str> = self.0.split(':').take(3).collect();
            StationId(base.join(":"))
        } else {
            self.clone()
        }
    }
}

impl TryFrom<String> for StationId {
    type Error = InvalidStationId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StationId::parse(&value)
    }
}

impl From<StationId> for String {
    fn from(id: StationId) -> Self {
        id.0
    }
}

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({})", self.0)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_ids() {
        assert!(StationId::parse("de:09162:6").is_ok());
        assert!(StationId::parse("de:09162:1108:1:1").is_ok());
        assert!(StationId::parse("900100003").is_ok());
    }

    #[test]
    fn reject_empty_and_whitespace() {
        assert!(StationId::parse("").is_err());
        assert!(StationId::parse(" ").is_err());
        assert!(StationId::parse("de:09162 :6").is_err());
        assert!(StationId::parse("de:09162:6\n").is_err());
    }

    #[test]
    fn stop_point_detection() {
        let id = StationId::parse("de:09162:1108:1:1").unwrap();
        assert!(id.is_stop_point());

        // Last two parts differ
        let id = StationId::parse("de:09162:1108:1:2").unwrap();
        assert!(!id.is_stop_point());

        // Too few parts
        let id = StationId::parse("de:09162:1108").unwrap();
        assert!(!id.is_stop_point());
    }

    #[test]
    fn base_station_of_stop_point() {
        let id = StationId::parse("de:09162:1108:4:4").unwrap();
        assert_eq!(id.base_station().as_str(), "de:09162:1108");

        let id = StationId::parse("de:09162:1108").unwrap();
        assert_eq!(id.base_station(), id);
    }

    #[test]
    fn stop_point_is_distinct_key() {
        let station = StationId::parse("de:09162:1108").unwrap();
        let point = StationId::parse("de:09162:1108:1:1").unwrap();
        assert_ne!(station, point);
    }

    #[test]
    fn serde_roundtrip_validates() {
        let id: StationId = serde_json::from_str("\"de:09162:6\"").unwrap();
        assert_eq!(id.as_str(), "de:09162:6");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"de:09162:6\"");

        let bad: Result<StationId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn display_and_debug() {
        let id = StationId::parse("de:09162:6").unwrap();
        assert_eq!(id.to_string(), "de:09162:6");
        assert_eq!(format!("{:?}", id), "StationId(de:09162:6)");
    }
}
