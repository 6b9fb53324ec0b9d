//! Durable application state.
//!
//! The whole [`AppState`] is the unit of persistence: loaded once at
//! startup, held in memory, mutated in place during a cycle and written back
//! atomically via a write-temp-then-rename. A missing, unreadable or
//! schema-mismatched state file is never fatal: the store falls back to an
//! empty state and logs a warning, so corrupt state can never block startup.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{AppState, STATE_SCHEMA_VERSION};

/// Defines the possible errors that can occur while persisting state.
#[derive(Debug, Error)]
pub enum StateError {
    /// Serialization of the in-memory state failed.
    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing or renaming the state file failed.
    #[error("Failed to write state file: {0}")]
    Io(#[from] std::io::Error),
}

/// Owns the in-memory [`AppState`] and its file-backed persistence.
///
/// The store has no internal locking: the monitoring cycle is the only
/// writer and applies mutations synchronously.
pub struct StateStore {
    path: PathBuf,
    state: AppState,
}

impl StateStore {
    /// Creates a store for the given path, starting from an empty state.
    /// Call [`StateStore::load`] to read any persisted copy.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), state: AppState::default() }
    }

    /// Loads persisted state from disk. Falls back to the empty state on a
    /// missing file, unreadable content or schema mismatch; never errors.
    pub async fn load(&mut self) {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.path.display(),
                    "State file not found, starting with empty state"
                );
                self.state = AppState::default();
                return;
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "State file unreadable, starting with empty state"
                );
                self.state = AppState::default();
                return;
            }
        };

        match serde_json::from_str::<AppState>(&content) {
            Ok(state) if state.meta.version == STATE_SCHEMA_VERSION => {
                tracing::info!(
                    path = %self.path.display(),
                    repo_count = state.repos.len(),
                    "State loaded successfully"
                );
                self.state = state;
            }
            Ok(state) => {
                tracing::warn!(
                    path = %self.path.display(),
                    found_version = state.meta.version,
                    expected_version = STATE_SCHEMA_VERSION,
                    "State file has unexpected schema version, starting with empty state"
                );
                self.state = AppState::default();
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "State file has invalid schema, starting with empty state"
                );
                self.state = AppState::default();
            }
        }
    }

    /// Serializes the in-memory state and atomically replaces the state
    /// file. The persisted file is always either the previous or the new
    /// complete state, never a partial write.
    pub async fn save(&self) -> Result<(), StateError> {
        let content = serde_json::to_vec_pretty(&self.state)?;

        // Temp name is disambiguated per process so concurrent writers on
        // the same path cannot clobber each other's temp file.
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, &content).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        tracing::debug!(path = %self.path.display(), "State saved atomically");
        Ok(())
    }

    /// Returns the live in-memory state for read access.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Applies a mutation to the in-memory state synchronously. Durability
    /// requires a subsequent [`StateStore::save`].
    pub fn update(&mut self, mutator: impl FnOnce(&mut AppState)) {
        mutator(&mut self.state);
    }

    /// Path of the state file this store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{}.tmp", std::process::id()));
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::{NotificationRecord, Snapshot, TrackedRepository};

    fn state_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("state.json")
    }

    fn populated_store(path: &Path) -> StateStore {
        let mut store = StateStore::new(path);
        let now = Utc.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap();
        store.update(|s| {
            s.repos.insert(
                "alice/newlib".to_string(),
                TrackedRepository {
                    owner: "alice".into(),
                    name: "newlib".into(),
                    description: Some("demo".into()),
                    language: Some("Rust".into()),
                    topics: vec!["cli".into()],
                    added_at: now,
                    snapshots: vec![Snapshot { timestamp: now, stars: 25, forks: 2 }],
                },
            );
            s.notifications
                .insert("alice/newlib".to_string(), NotificationRecord { last_alert_at: now });
            s.meta.last_cycle_at = Some(now);
        });
        store
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);

        let store = populated_store(&path);
        store.save().await.unwrap();

        let mut reloaded = StateStore::new(&path);
        reloaded.load().await;

        assert_eq!(reloaded.state(), store.state());
    }

    #[tokio::test]
    async fn test_load_missing_file_yields_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StateStore::new(state_path(&dir));

        store.load().await;

        assert_eq!(store.state(), &AppState::default());
    }

    #[tokio::test]
    async fn test_load_corrupt_json_yields_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);
        std::fs::write(&path, "{not valid json").unwrap();

        let mut store = StateStore::new(&path);
        store.load().await;

        assert_eq!(store.state(), &AppState::default());
    }

    #[tokio::test]
    async fn test_load_rejects_wrong_version_type() {
        // meta.version as a string must be treated as absent state, not
        // partially trusted.
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);
        std::fs::write(
            &path,
            r#"{"meta":{"version":"1","lastCycleAt":null},"repos":{},"notifications":{}}"#,
        )
        .unwrap();

        let mut store = StateStore::new(&path);
        store.load().await;

        assert_eq!(store.state(), &AppState::default());
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);
        std::fs::write(
            &path,
            r#"{"meta":{"version":2,"lastCycleAt":null},"repos":{},"notifications":{}}"#,
        )
        .unwrap();

        let mut store = StateStore::new(&path);
        store.load().await;

        assert_eq!(store.state(), &AppState::default());
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);

        let store = populated_store(&path);
        store.save().await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["state.json".to_string()]);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);

        let mut store = populated_store(&path);
        store.save().await.unwrap();

        store.update(|s| {
            s.repos.clear();
        });
        store.save().await.unwrap();

        let mut reloaded = StateStore::new(&path);
        reloaded.load().await;
        assert!(reloaded.state().repos.is_empty());
        // Notification records survive independently of repos.
        assert_eq!(reloaded.state().notifications.len(), 1);
    }
}
