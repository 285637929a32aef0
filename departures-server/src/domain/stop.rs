//! Per-stop filtering and grouping rules.

use std::fmt;

use unicode_normalization::UnicodeNormalization;

use super::StationId;

/// Default cap on departures shown per direction group and per stop.
pub const DEFAULT_MAX_DEPARTURES_PER_STOP: usize = 20;

/// Default cap on departures of one line within a direction group.
pub const DEFAULT_MAX_DEPARTURES_PER_ROUTE: usize = 2;

/// Label of the bucket collecting departures that match no direction.
pub const DEFAULT_UNGROUPED_TITLE: &str = "Other";

/// A case-insensitive match pattern.
///
/// Patterns are plain text, never regular expressions. How a pattern is
/// tested against a departure is defined in [`crate::grouping`].
#[derive(Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    normalized: String,
}

impl Pattern {
    /// Create a pattern. Surrounding whitespace is ignored.
    pub fn new(text: &str) -> Self {
        let raw = text.trim().to_string();
        let normalized = normalize(&raw);
        Self { raw, normalized }
    }

    /// The pattern as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// NFC-composed, lowercased pattern with runs of whitespace collapsed.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Whether the pattern is empty after trimming.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.raw)
    }
}

/// Compose text to NFC, lowercase it and collapse whitespace runs to
/// single spaces.
///
/// Composition makes `"u\u{308}"` and `"\u{fc}"` compare equal.
pub(crate) fn normalize(text: &str) -> String {
    let composed: String = text.nfc().collect();
    composed
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// One labelled direction and the patterns that select it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionMapping {
    pub label: String,
    pub patterns: Vec<Pattern>,
}

impl DirectionMapping {
    pub fn new(label: impl Into<String>, patterns: &[&str]) -> Self {
        Self {
            label: label.into(),
            patterns: patterns.iter().map(|p| Pattern::new(p)).collect(),
        }
    }
}

/// Filtering and grouping rules for one displayed stop.
///
/// `directions` is ordered: a departure is assigned to the first direction
/// with a matching pattern.
#[derive(Debug, Clone)]
pub struct StopConfiguration {
    /// Station (or stop-point) to read departures for.
    pub station_id: StationId,

    /// Name shown in the stop header.
    pub station_name: String,

    /// Ordered direction mappings.
    pub directions: Vec<DirectionMapping>,

    /// Maximum departures per direction group, and for the stop overall.
    pub max_departures_per_stop: usize,

    /// Maximum departures of a single line within one direction group.
    pub max_departures_per_route: usize,

    /// Departures earlier than now + leeway are not shown.
    pub departure_leeway_minutes: i64,

    /// Departures later than now + this many hours are not shown.
    /// Values below 1 disable the horizon.
    pub max_hours_in_advance: Option<i64>,

    /// Departures matching any of these are dropped before grouping.
    pub exclusions: Vec<Pattern>,

    /// Keep only departures at this platform number.
    pub platform_filter: Option<u32>,

    /// Lines the platform filter applies to; empty means every line.
    pub platform_filter_routes: Vec<String>,

    /// Whether unmatched departures are shown in an extra bucket.
    pub show_ungrouped: bool,

    /// Label of the unmatched bucket.
    pub ungrouped_title: String,

    /// Per-stop override of the route's random header colour setting.
    pub random_header_colors: Option<bool>,

    /// Per-stop override of the header background brightness (0..=1).
    pub header_background_brightness: Option<f64>,

    /// Salt mixed into header colour generation.
    pub random_color_salt: Option<i64>,
}

impl StopConfiguration {
    /// Create a stop configuration with default limits and no directions.
    pub fn new(station_id: StationId, station_name: impl Into<String>) -> Self {
        Self {
            station_id,
            station_name: station_name.into(),
            directions: Vec::new(),
            max_departures_per_stop: DEFAULT_MAX_DEPARTURES_PER_STOP,
            max_departures_per_route: DEFAULT_MAX_DEPARTURES_PER_ROUTE,
            departure_leeway_minutes: 0,
            max_hours_in_advance: None,
            exclusions: Vec::new(),
            platform_filter: None,
            platform_filter_routes: Vec::new(),
            show_ungrouped: true,
            ungrouped_title: DEFAULT_UNGROUPED_TITLE.to_string(),
            random_header_colors: None,
            header_background_brightness: None,
            random_color_salt: None,
        }
    }

    /// Append a direction mapping.
    pub fn with_direction(mut self, label: &str, patterns: &[&str]) -> Self {
        self.directions.push(DirectionMapping::new(label, patterns));
        self
    }

    /// Set both truncation limits.
    pub fn with_limits(mut self, per_stop: usize, per_route: usize) -> Self {
        self.max_departures_per_stop = per_stop;
        self.max_departures_per_route = per_route;
        self
    }

    /// Set whether unmatched departures are shown.
    pub fn with_show_ungrouped(mut self, show: bool) -> Self {
        self.show_ungrouped = show;
        self
    }

    /// Set the leeway in minutes.
    pub fn with_leeway(mut self, minutes: i64) -> Self {
        self.departure_leeway_minutes = minutes;
        self
    }

    /// Set the horizon in hours.
    pub fn with_max_hours_in_advance(mut self, hours: Option<i64>) -> Self {
        self.max_hours_in_advance = hours;
        self
    }

    /// Set the exclusion patterns.
    pub fn with_exclusions(mut self, patterns: &[&str]) -> Self {
        self.exclusions = patterns.iter().map(|p| Pattern::new(p)).collect();
        self
    }

    /// Keep only departures at `platform`, for the listed lines or, with
    /// no lines listed, for every line.
    pub fn with_platform_filter(mut self, platform: u32, lines: &[&str]) -> Self {
        self.platform_filter = Some(platform);
        self.platform_filter_routes = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Whether the platform filter applies to departures of `line`.
    pub fn platform_filter_applies_to(&self, line: &str) -> bool {
        self.platform_filter_routes.is_empty()
            || self.platform_filter_routes.iter().any(|l| l == line)
    }

    /// The horizon in hours, if one is in effect.
    pub fn horizon_hours(&self) -> Option<i64> {
        self.max_hours_in_advance.filter(|h| *h >= 1)
    }
}
