//! Case-insensitive pattern matching against departures.
//!
//! A pattern matches a departure when any of these hold:
//! - the destination contains the pattern (`"Messestadt"`)
//! - the pattern is the line label, or transport type plus line
//!   (`"U2"`, `"Bus 59"`)
//! - the pattern is a line (optionally prefixed by its transport type)
//!   followed by a fragment the destination contains (`"U2 Messestadt"`,
//!   `"Bus 59 Giesing"`)
//!
//! The same rules serve direction assignment and exclusion filtering.
//!
//! Platform text is matched separately by [`platform_matches`].

use crate::domain::{Pattern, RawDeparture, normalize};

/// Normalized text of a departure, computed once per departure.
pub(crate) struct MatchTarget {
    destination: String,
    line: String,
    route: Option<String>,
}

impl MatchTarget {
    pub(crate) fn new(departure: &RawDeparture) -> Self {
        let line = normalize(&departure.line);
        let transport = normalize(&departure.transport_type);
        let route = if transport.is_empty() || line.is_empty() {
            None
        } else {
            Some(format!("{transport} {line}"))
        };

        Self {
            destination: normalize(&departure.destination),
            line,
            route,
        }
    }

    /// Whether a single pattern matches.
    pub(crate) fn matches(&self, pattern: &Pattern) -> bool {
        let p = pattern.normalized();
        if p.is_empty() {
            return false;
        }

        if self.destination.contains(p) {
            return true;
        }

        if self.is_route(p) {
            return true;
        }

        self.route_prefixed_fragment(p)
            .is_some_and(|fragment| self.destination.contains(fragment))
    }

    /// Whether any of the patterns matches.
    pub(crate) fn matches_any(&self, patterns: &[Pattern]) -> bool {
        patterns.iter().any(|p| self.matches(p))
    }

    fn is_route(&self, p: &str) -> bool {
        (!self.line.is_empty() && p == self.line) || self.route.as_deref() == Some(p)
    }

    /// The destination fragment of a `"<route> <fragment>"` pattern whose
    /// route part names this departure's line.
    fn route_prefixed_fragment<'p>(&self, p: &'p str) -> Option<&'p str> {
        if self.line.is_empty() {
            return None;
        }

        strip_word_prefix(p, &self.line).or_else(|| {
            self.route
                .as_deref()
                .and_then(|route| strip_word_prefix(p, route))
        })
    }
}

/// The non-empty remainder of `text` after `prefix` and one space.
fn strip_word_prefix<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(' '))
        .filter(|rest| !rest.is_empty())
}

/// Whether `platform` names platform `number`.
///
/// The number must be the whole text or a standalone token: preceded by
/// the start, whitespace or `"Pos."`, and followed by the end, whitespace,
/// `')'` or `','`. `"Pos. 9"` names 9; `"2 (U9)"` and `"19"` do not.
pub fn platform_matches(platform: &str, number: u32) -> bool {
    let platform = platform.trim();
    let number = number.to_string();
    if platform == number {
        return true;
    }

    platform.match_indices(number.as_str()).any(|(start, _)| {
        let before = &platform[..start];
        let after = &platform[start + number.len()..];
        let opens = before.is_empty()
            || before.ends_with(char::is_whitespace)
            || before.ends_with("Pos.");
        let closes = after.is_empty()
            || after.starts_with(|c: char| c.is_whitespace() || c == ')' || c == ',');
        opens && closes
    })
}

/// Whether a pattern matches a departure.
pub fn matches_pattern(departure: &RawDeparture, pattern: &Pattern) -> bool {
    MatchTarget::new(departure).matches(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn dep(transport: &str, line: &str, destination: &str) -> RawDeparture {
        let t = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        RawDeparture::new(line, destination, t).with_transport_type(transport)
    }

    fn matches(d: &RawDeparture, pattern: &str) -> bool {
        matches_pattern(d, &Pattern::new(pattern))
    }

    #[test]
    fn destination_substring_is_case_insensitive() {
        let d = dep("U-Bahn", "U2", "Messestadt Ost");
        assert!(matches(&d, "Messestadt"));
        assert!(matches(&d, "messestadt ost"));
        assert!(matches(&d, "STADT"));
        assert!(!matches(&d, "Feldmoching"));
    }

    #[test]
    fn whitespace_is_collapsed() {
        let d = dep("U-Bahn", "U2", "Messestadt  Ost");
        assert!(matches(&d, " Messestadt   Ost "));
    }

    #[test]
    fn line_matches_exactly() {
        let d = dep("Bus", "59", "Giesing Bahnhof");
        assert!(matches(&d, "59"));
        assert!(matches(&d, "Bus 59"));
        assert!(!matches(&d, "5"));
        assert!(!matches(&d, "Tram 59"));
    }

    #[test]
    fn line_with_destination_fragment() {
        let d = dep("U-Bahn", "U2", "Messestadt Ost");
        assert!(matches(&d, "U2 Messestadt"));
        assert!(matches(&d, "U-Bahn U2 Messestadt"));
        assert!(!matches(&d, "U3 Messestadt"));
        assert!(!matches(&d, "U2 Feldmoching"));
    }

    #[test]
    fn route_prefix_does_not_fall_back_to_destination() {
        // "N75 Ostbahnhof" must not match a 59 whose destination merely
        // contains "bahnhof".
        let d = dep("Bus", "59", "Giesing Bahnhof");
        assert!(!matches(&d, "N75 Bahnhof"));
    }

    #[test]
    fn composed_and_decomposed_umlauts_match() {
        let precomposed = dep("U-Bahn", "U3", "M\u{00fc}nchner Freiheit");
        assert!(matches(&precomposed, "Mu\u{0308}nchner Freiheit"));

        let decomposed = dep("U-Bahn", "U3", "Mu\u{0308}nchner Freiheit");
        assert!(matches(&decomposed, "M\u{00fc}nchner"));
        assert!(matches(&decomposed, "U3 m\u{00fc}nchner"));
    }

    #[test]
    fn empty_pattern_never_matches() {
        let d = dep("Bus", "59", "Giesing");
        assert!(!matches(&d, ""));
        assert!(!matches(&d, "   "));
    }

    #[test]
    fn missing_transport_type() {
        let d = dep("", "59", "Giesing");
        assert!(matches(&d, "59"));
        assert!(matches(&d, "59 Giesing"));
        assert!(!matches(&d, "Bus 59"));
    }

    #[test]
    fn platform_numbers() {
        assert!(platform_matches("9", 9));
        assert!(platform_matches(" 9 ", 9));
        assert!(platform_matches("Pos. 9", 9));
        assert!(platform_matches("Pos.9", 9));
        assert!(platform_matches("Platform 9", 9));
        assert!(platform_matches("9, 10", 9));
        assert!(platform_matches("2 (U9)", 2));

        assert!(!platform_matches("2 (U9)", 9));
        assert!(!platform_matches("U9", 9));
        assert!(!platform_matches("19", 9));
        assert!(!platform_matches("91", 9));
        assert!(!platform_matches("", 9));
    }

    #[test]
    fn matches_any_pattern() {
        let d = dep("Bus", "59", "Giesing");
        let target = MatchTarget::new(&d);
        let patterns = vec![Pattern::new("Feldmoching"), Pattern::new("Giesing")];
        assert!(target.matches_any(&patterns));
        assert!(!target.matches_any(&patterns[..1]));
        assert!(!target.matches_any(&[]));
    }
}
