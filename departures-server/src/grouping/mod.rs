//! Direction Grouping Engine.
//!
//! Turns one stop's raw departures into ordered, labelled direction groups.
//! The transformation is pure: given the same departures, configuration and
//! `now`, it always produces the same groups.
//!
//! Steps, in order:
//! 1. Advance window: drop departures before `now + leeway`, and after
//!    `now + horizon` when a horizon of at least one hour is set
//! 2. Exclusion: drop departures matching any exclusion pattern
//! 3. Stop-point: for a stop-point configuration, drop departures observed
//!    at any other stop-point; then, if a platform filter is set, drop
//!    departures of the filtered lines at any other platform
//! 4. Direction assignment: the first direction with a matching pattern
//!    wins; unmatched departures go to the ungrouped bucket if enabled
//! 5. Within each group: stable sort by effective time, drop duplicates,
//!    keep the earliest `max_departures_per_route` of each line, then cap
//!    at `max_departures_per_stop`
//! 6. Cap the stop as a whole at `max_departures_per_stop`, keeping the
//!    earliest departures across all its groups

mod color;
mod matching;


pub use color::header_color;
pub use matching::{matches_pattern, platform_matches};

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::domain::{DirectionGroup, RawDeparture, StopConfiguration};

use matching::MatchTarget;

/// Error from grouping a stop's departures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupingError {
    /// The configured window cannot be represented as a timestamp
    #[error("departure window out of range: {0}")]
    WindowOutOfRange(&'static str),
}

/// Caller-selected grouping behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupingOptions {
    /// Emit configured directions that received no departures as empty
    /// groups instead of leaving them out.
    pub keep_empty_directions: bool,
}

/// Group a stop's departures with default options.
pub fn group_departures(
    departures: &[RawDeparture],
    stop: &StopConfiguration,
    now: DateTime<Utc>,
) -> Result<Vec<DirectionGroup>, GroupingError> {
    group_departures_with(departures, stop, now, GroupingOptions::default())
}

/// Group a stop's departures.
///
/// Groups come back in direction configuration order, followed by the
/// ungrouped bucket (if enabled and non-empty).
pub fn group_departures_with(
    departures: &[RawDeparture],
    stop: &StopConfiguration,
    now: DateTime<Utc>,
    options: GroupingOptions,
) -> Result<Vec<DirectionGroup>, GroupingError> {
    let window = AdvanceWindow::new(stop, now)?;

    let candidates: Vec<(&RawDeparture, MatchTarget)> = departures
        .iter()
        .filter(|d| window.contains(d))
        .map(|d| (d, MatchTarget::new(d)))
        .collect();
    let in_window = candidates.len();

    let candidates: Vec<_> = candidates
        .into_iter()
        .filter(|(_, target)| !target.matches_any(&stop.exclusions))
        .collect();
    if candidates.len() < in_window {
        debug!(
            stop = %stop.station_name,
            excluded = in_window - candidates.len(),
            "dropped excluded departures"
        );
    }

    let candidates = filter_stop_point(candidates, stop);
    let candidates = filter_platform(candidates, stop);

    // Direction assignment: first matching direction wins.
    let mut buckets: Vec<Vec<&RawDeparture>> = vec![Vec::new(); stop.directions.len()];
    let mut ungrouped: Vec<&RawDeparture> = Vec::new();

    for (departure, target) in &candidates {
        match stop
            .directions
            .iter()
            .position(|dir| target.matches_any(&dir.patterns))
        {
            Some(idx) => buckets[idx].push(departure),
            None => ungrouped.push(departure),
        }
    }

    if !ungrouped.is_empty() {
        debug!(
            stop = %stop.station_name,
            unmatched = ungrouped.len(),
            shown = stop.show_ungrouped,
            "departures matched no direction"
        );
    }

    let mut groups: Vec<DirectionGroup> = Vec::with_capacity(buckets.len() + 1);

    for (direction, bucket) in stop.directions.iter().zip(buckets) {
        let departures = limit_group(bucket, stop);
        if departures.is_empty() && !options.keep_empty_directions {
            continue;
        }
        groups.push(DirectionGroup {
            label: direction.label.clone(),
            departures,
            is_ungrouped: false,
        });
    }

    if stop.show_ungrouped {
        let departures = limit_group(ungrouped, stop);
        if !departures.is_empty() {
            groups.push(DirectionGroup {
                label: stop.ungrouped_title.clone(),
                departures,
                is_ungrouped: true,
            });
        }
    }

    cap_stop_total(&mut groups, stop.max_departures_per_stop, options);

    Ok(groups)
}

/// Bounds on effective departure time.
struct AdvanceWindow {
    earliest: DateTime<Utc>,
    latest: Option<DateTime<Utc>>,
}

impl AdvanceWindow {
    fn new(stop: &StopConfiguration, now: DateTime<Utc>) -> Result<Self, GroupingError> {
        let leeway = Duration::try_minutes(stop.departure_leeway_minutes)
            .ok_or(GroupingError::WindowOutOfRange("leeway"))?;
        let earliest = now
            .checked_add_signed(leeway)
            .ok_or(GroupingError::WindowOutOfRange("leeway"))?;

        let latest = match stop.horizon_hours() {
            Some(hours) => {
                let horizon = Duration::try_hours(hours)
                    .ok_or(GroupingError::WindowOutOfRange("horizon"))?;
                Some(
                    now.checked_add_signed(horizon)
                        .ok_or(GroupingError::WindowOutOfRange("horizon"))?,
                )
            }
            None => None,
        };

        Ok(Self { earliest, latest })
    }

    fn contains(&self, departure: &RawDeparture) -> bool {
        let t = departure.effective_time();
        t >= self.earliest && self.latest.is_none_or(|latest| t <= latest)
    }
}

/// Keep only departures observed at the configured stop-point, if any.
fn filter_stop_point<'a>(
    candidates: Vec<(&'a RawDeparture, MatchTarget)>,
    stop: &StopConfiguration,
) -> Vec<(&'a RawDeparture, MatchTarget)> {
    if !stop.station_id.is_stop_point() {
        return candidates;
    }

    let before = candidates.len();
    let available: HashSet<String> = candidates
        .iter()
        .filter_map(|(d, _)| d.stop_point_id.as_ref().map(|s| s.to_string()))
        .collect();

    let kept: Vec<_> = candidates
        .into_iter()
        .filter(|(d, _)| d.stop_point_id.as_ref() == Some(&stop.station_id))
        .collect();

    if before > 0 && kept.is_empty() {
        let mut available: Vec<_> = available.into_iter().collect();
        available.sort();
        warn!(
            stop = %stop.station_name,
            stop_point = %stop.station_id,
            ?available,
            "no departures at configured stop-point"
        );
    }

    kept
}

/// Keep only departures at the configured platform, if any.
///
/// Lines outside `platform_filter_routes` (when it is non-empty) pass
/// through unfiltered.
fn filter_platform<'a>(
    candidates: Vec<(&'a RawDeparture, MatchTarget)>,
    stop: &StopConfiguration,
) -> Vec<(&'a RawDeparture, MatchTarget)> {
    let Some(platform) = stop.platform_filter else {
        return candidates;
    };

    let before = candidates.len();
    let available: HashSet<String> = candidates
        .iter()
        .filter_map(|(d, _)| d.platform.clone())
        .collect();

    let kept: Vec<_> = candidates
        .into_iter()
        .filter(|(d, _)| {
            !stop.platform_filter_applies_to(&d.line)
                || d
                    .platform
                    .as_deref()
                    .is_some_and(|p| platform_matches(p, platform))
        })
        .collect();

    if before > 0 && kept.is_empty() {
        let mut available: Vec<_> = available.into_iter().collect();
        available.sort();
        warn!(
            stop = %stop.station_name,
            platform,
            ?available,
            "no departures at configured platform"
        );
    }

    kept
}

/// Sort, de-duplicate and truncate one group.
fn limit_group(mut bucket: Vec<&RawDeparture>, stop: &StopConfiguration) -> Vec<RawDeparture> {
    // Stable: equal times keep their feed order.
    bucket.sort_by_key(|d| d.effective_time());

    let mut seen = HashSet::new();
    let mut per_line: HashMap<&str, usize> = HashMap::new();
    let mut result = Vec::new();

    for departure in bucket {
        if result.len() >= stop.max_departures_per_stop {
            break;
        }

        let key = (
            departure.line.as_str(),
            departure.destination.as_str(),
            departure.effective_time(),
        );
        if !seen.insert(key) {
            continue;
        }

        let count = per_line.entry(departure.line.as_str()).or_default();
        if *count >= stop.max_departures_per_route {
            continue;
        }
        *count += 1;

        result.push(departure.clone());
    }

    result
}

/// Keep the stop's `max` earliest departures across all groups.
fn cap_stop_total(groups: &mut Vec<DirectionGroup>, max: usize, options: GroupingOptions) {
    let total: usize = groups.iter().map(DirectionGroup::len).sum();
    if total <= max {
        return;
    }

    let mut ranked: Vec<(DateTime<Utc>, usize, usize)> = groups
        .iter()
        .enumerate()
        .flat_map(|(g, group)| {
            group
                .departures
                .iter()
                .enumerate()
                .map(move |(i, d)| (d.effective_time(), g, i))
        })
        .collect();
    // Ties go to the earlier group, then earlier position.
    ranked.sort();

    let keep: HashSet<(usize, usize)> = ranked
        .into_iter()
        .take(max)
        .map(|(_, g, i)| (g, i))
        .collect();

    for (g, group) in groups.iter_mut().enumerate() {
        let mut i = 0;
        group.departures.retain(|_| {
            let kept = keep.contains(&(g, i));
            i += 1;
            kept
        });
    }

    groups.retain(|g| !g.is_empty() || (options.keep_empty_directions && !g.is_ungrouped));
}
