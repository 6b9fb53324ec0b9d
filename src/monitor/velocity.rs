//! Star growth-rate estimation from successive snapshots.

use chrono::{DateTime, Utc};

use crate::models::Snapshot;

/// Intervals shorter than this (in hours) between snapshots yield a zero
/// rate instead of dividing by a near-zero elapsed time.
const MIN_ELAPSED_HOURS: f64 = 0.1;

const HOURS_PER_DAY: f64 = 24.0;
const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Growth-rate estimate for a repository at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Velocity {
    /// Star growth normalized to a daily rate. Negative values are valid
    /// (the star count decreased) and fail every alert threshold.
    pub stars_per_day: f64,
    /// True when no previous snapshot exists for this repository.
    pub is_new: bool,
    /// Repository age in fractional days.
    pub repo_age_days: f64,
    /// Star count observed this cycle.
    pub current_stars: u64,
    /// Star count from the previous snapshot, or 0 on first sighting.
    pub previous_stars: u64,
}

/// Computes the growth rate for a repository from its current star count and
/// optional previous snapshot. Pure and deterministic given `now`.
pub fn compute_velocity(
    current_stars: u64,
    created_at: DateTime<Utc>,
    last_snapshot: Option<&Snapshot>,
    now: DateTime<Utc>,
) -> Velocity {
    let repo_age_days = (now - created_at).num_milliseconds() as f64 / MS_PER_DAY;

    let Some(last) = last_snapshot else {
        // First sighting: no growth can be inferred from a single sample.
        return Velocity {
            stars_per_day: 0.0,
            is_new: true,
            repo_age_days,
            current_stars,
            previous_stars: 0,
        };
    };

    let elapsed_hours = (now - last.timestamp).num_milliseconds() as f64 / MS_PER_HOUR;

    if elapsed_hours < MIN_ELAPSED_HOURS {
        return Velocity {
            stars_per_day: 0.0,
            is_new: false,
            repo_age_days,
            current_stars,
            previous_stars: last.stars,
        };
    }

    let stars_per_day =
        (current_stars as f64 - last.stars as f64) / elapsed_hours * HOURS_PER_DAY;

    Velocity { stars_per_day, is_new: false, repo_age_days, current_stars, previous_stars: last.stars }
}
