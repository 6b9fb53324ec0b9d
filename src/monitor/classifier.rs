//! Tiered severity classification of growth rates.

use serde::Deserialize;

use crate::models::SeverityTier;

/// Provides the default value for young_repo_max_age_days.
fn default_young_repo_max_age_days() -> f64 {
    30.0
}

/// Provides the default value for young_repo_min_velocity.
fn default_young_repo_min_velocity() -> f64 {
    5.0
}

/// Provides the default value for old_repo_min_velocity.
fn default_old_repo_min_velocity() -> f64 {
    10.0
}

/// Provides the default value for new_repo_min_stars.
fn default_new_repo_min_stars() -> u64 {
    20
}

/// Provides the default value for hot_multiplier.
fn default_hot_multiplier() -> f64 {
    3.0
}

/// Provides the default value for viral_multiplier.
fn default_viral_multiplier() -> f64 {
    10.0
}

/// Severity thresholds. Young repositories get a lower velocity bar because
/// absolute growth is more significant early in a repository's life.
#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    /// Repositories younger than this many days use the young-repo baseline.
    #[serde(default = "default_young_repo_max_age_days")]
    pub young_repo_max_age_days: f64,

    /// Baseline stars/day for young repositories.
    #[serde(default = "default_young_repo_min_velocity")]
    pub young_repo_min_velocity: f64,

    /// Baseline stars/day for older repositories.
    #[serde(default = "default_old_repo_min_velocity")]
    pub old_repo_min_velocity: f64,

    /// Minimum star count for a first-sighting alert.
    #[serde(default = "default_new_repo_min_stars")]
    pub new_repo_min_stars: u64,

    /// Multiple of the baseline at which growth classifies as `hot`.
    #[serde(default = "default_hot_multiplier")]
    pub hot_multiplier: f64,

    /// Multiple of the baseline at which growth classifies as `viral`.
    #[serde(default = "default_viral_multiplier")]
    pub viral_multiplier: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            young_repo_max_age_days: default_young_repo_max_age_days(),
            young_repo_min_velocity: default_young_repo_min_velocity(),
            old_repo_min_velocity: default_old_repo_min_velocity(),
            new_repo_min_stars: default_new_repo_min_stars(),
            hot_multiplier: default_hot_multiplier(),
            viral_multiplier: default_viral_multiplier(),
        }
    }
}

/// Classifies a growth rate into a severity tier, or `None` when the rate is
/// below the age-appropriate baseline. Multiplier boundaries are inclusive on
/// the higher tier.
pub fn classify_severity(
    stars_per_day: f64,
    repo_age_days: f64,
    thresholds: &Thresholds,
) -> Option<SeverityTier> {
    let baseline = if repo_age_days < thresholds.young_repo_max_age_days {
        thresholds.young_repo_min_velocity
    } else {
        thresholds.old_repo_min_velocity
    };

    if stars_per_day < baseline {
        return None;
    }

    if stars_per_day >= baseline * thresholds.viral_multiplier {
        return Some(SeverityTier::Viral);
    }

    if stars_per_day >= baseline * thresholds.hot_multiplier {
        return Some(SeverityTier::Hot);
    }

    Some(SeverityTier::Notable)
}

/// Whether a first-sighting repository warrants an alert, judged purely on
/// absolute star count since no velocity exists yet.
pub fn should_alert_new_repo(stars: u64, thresholds: &Thresholds) -> bool {
    stars >= thresholds.new_repo_min_stars
}
