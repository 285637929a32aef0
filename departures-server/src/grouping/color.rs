//! Deterministic pastel header colours.
//!
//! The colour depends only on the header text and a salt, so a header keeps
//! its colour across restarts and across every viewer.

/// Generate a stable pastel colour (`#rrggbb`) for a header.
///
/// `brightness` (0..=1) shifts the lightness band; values outside the range
/// are clamped. Changing `salt` reshuffles every colour at once.
pub fn header_color(text: &str, salt: i64, brightness: f64) -> String {
    let hash = seahash::hash(format!("{text}:{salt}").as_bytes());
    let (h, s, l) = hsl_from_hash(hash, brightness.clamp(0.0, 1.0));
    let (r, g, b) = hsl_to_rgb(h, s, l);
    format!("#{:02x}{:02x}{:02x}", to_byte(r), to_byte(g), to_byte(b))
}

/// Hue in degrees, saturation and lightness in percent.
fn hsl_from_hash(hash: u64, brightness: f64) -> (f64, f64, f64) {
    let upper = (hash >> 16) & 0xFFFF;
    let lower = hash & 0xFFFF;
    let hue_base = (upper % 360) as i64;
    let hue_variation = (lower % 60) as i64 - 30;
    let hue = (hue_base + hue_variation).rem_euclid(360) as f64;

    let saturation = 55.0 + (hash % 26) as f64;

    let adjusted = brightness.powf(1.5);
    let lightness_min = 30.0 + adjusted * 45.0;
    let lightness_max = 40.0 + adjusted * 45.0;
    let range = ((lightness_max - lightness_min) as u64).max(1);
    let lightness = lightness_min.trunc() + (hash % range) as f64;

    (hue, saturation, lightness)
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (f64, f64, f64) {
    let h = hue / 360.0;
    let s = saturation / 100.0;
    let l = lightness / 100.0;

    if s == 0.0 {
        return (l, l, l);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    (
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 0.5 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

fn to_byte(component: f64) -> u8 {
    (component.clamp(0.0, 1.0) * 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_hex_color(s: &str) -> bool {
        s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
    }

    #[test]
    fn color_is_deterministic() {
        let a = header_color("Hauptbahnhof -> North", 0, 0.7);
        let b = header_color("Hauptbahnhof -> North", 0, 0.7);
        assert_eq!(a, b);
        assert!(is_hex_color(&a));
    }

    #[test]
    fn salt_changes_color() {
        let colors: std::collections::HashSet<_> = (0..8)
            .map(|salt| header_color("Hauptbahnhof", salt, 0.7))
            .collect();
        assert!(colors.len() > 1);
    }

    #[test]
    fn brightness_is_clamped() {
        assert_eq!(header_color("x", 1, 5.0), header_color("x", 1, 1.0));
        assert_eq!(header_color("x", 1, -1.0), header_color("x", 1, 0.0));
    }

    #[test]
    fn lightness_band_follows_brightness() {
        for hash in [0u64, 7, 12_345, u64::MAX] {
            let (_, s, dark) = hsl_from_hash(hash, 0.0);
            let (_, _, light) = hsl_from_hash(hash, 1.0);
            assert!((30.0..40.0).contains(&dark));
            assert!((75.0..85.0).contains(&light));
            assert!((55.0..=80.0).contains(&s));
        }
    }

    #[test]
    fn grey_when_unsaturated() {
        let (r, g, b) = hsl_to_rgb(120.0, 0.0, 50.0);
        assert_eq!((r, g, b), (0.5, 0.5, 0.5));
    }
}
