//! Core data types shared across the monitoring pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current version of the persisted state schema. A state file carrying any
/// other version is discarded on load.
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Maximum number of snapshots retained per tracked repository. Oldest
/// entries are evicted first once the cap is reached.
pub const MAX_SNAPSHOTS: usize = 48;

/// A repository as returned by the search collaborator. Produced fresh each
/// cycle and never persisted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryRecord {
    /// Login of the owning user or organization.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Repository description, if any.
    pub description: Option<String>,
    /// Current star count.
    pub stars: u64,
    /// Current fork count.
    pub forks: u64,
    /// Primary language, if GitHub reports one.
    pub language: Option<String>,
    /// Repository creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Repository topics.
    pub topics: Vec<String>,
}

impl RepositoryRecord {
    /// Returns the stable `owner/name` key identifying this repository
    /// across cycles.
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A single point-in-time observation of a repository's popularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// When the observation was taken.
    pub timestamp: DateTime<Utc>,
    /// Star count at that time.
    pub stars: u64,
    /// Fork count at that time.
    pub forks: u64,
}

/// Durable tracking record for a repository, including its bounded snapshot
/// history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedRepository {
    /// Login of the owning user or organization.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Repository description at first sighting.
    pub description: Option<String>,
    /// Primary language at first sighting.
    pub language: Option<String>,
    /// Repository topics at first sighting.
    pub topics: Vec<String>,
    /// When this repository was first observed.
    pub added_at: DateTime<Utc>,
    /// Chronological snapshot history, most recent last. Never exceeds
    /// [`MAX_SNAPSHOTS`] entries.
    pub snapshots: Vec<Snapshot>,
}

impl TrackedRepository {
    /// Creates a tracking record for a repository seen for the first time.
    pub fn first_sighting(repo: &RepositoryRecord, now: DateTime<Utc>) -> Self {
        Self {
            owner: repo.owner.clone(),
            name: repo.name.clone(),
            description: repo.description.clone(),
            language: repo.language.clone(),
            topics: repo.topics.clone(),
            added_at: now,
            snapshots: Vec::new(),
        }
    }

    /// Appends a snapshot, evicting the oldest entries beyond
    /// [`MAX_SNAPSHOTS`].
    pub fn push_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
        if self.snapshots.len() > MAX_SNAPSHOTS {
            let excess = self.snapshots.len() - MAX_SNAPSHOTS;
            self.snapshots.drain(..excess);
        }
    }

    /// Returns the most recent snapshot, if any.
    pub fn latest_snapshot(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }
}

/// Records when a repository was last alerted on. Written only after a
/// confirmed successful send, and consulted by the cooldown gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    /// Timestamp of the last successfully delivered alert.
    pub last_alert_at: DateTime<Utc>,
}

/// Metadata about the persisted state itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMeta {
    /// Schema version of the state file.
    pub version: u32,
    /// When the last monitoring cycle completed, or `None` before the first
    /// cycle.
    pub last_cycle_at: Option<DateTime<Utc>>,
}

/// The whole application state: the unit of persistence. Loaded once at
/// startup, mutated in memory during cycles and flushed atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// State file metadata.
    pub meta: StateMeta,
    /// Tracked repositories keyed by `owner/name`.
    pub repos: BTreeMap<String, TrackedRepository>,
    /// Notification records keyed by `owner/name`.
    pub notifications: BTreeMap<String, NotificationRecord>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            meta: StateMeta { version: STATE_SCHEMA_VERSION, last_cycle_at: None },
            repos: BTreeMap::new(),
            notifications: BTreeMap::new(),
        }
    }
}

/// Discrete severity classification of a growth event. Ordering reflects
/// increasing severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    /// Growth above the baseline threshold.
    Notable,
    /// Growth at or above the `hot` multiple of the baseline.
    Hot,
    /// Growth at or above the `viral` multiple of the baseline.
    Viral,
}

impl SeverityTier {
    /// Uppercase label used in alert messages.
    pub fn label(&self) -> &'static str {
        match self {
            SeverityTier::Notable => "NOTABLE",
            SeverityTier::Hot => "HOT",
            SeverityTier::Viral => "VIRAL",
        }
    }
}
