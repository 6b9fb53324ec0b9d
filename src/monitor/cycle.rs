//! The per-cycle orchestration: fetch, evaluate, dispatch, persist.
//!
//! One invocation of [`MonitorCycle::run`] performs a complete monitoring
//! cycle. A failed search aborts the cycle before any state is touched;
//! everything after that point is contained, so a notification-channel
//! outage can delay alerts but never lose snapshot history. State is
//! persisted exactly once per cycle, at the end.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    config::{AppConfig, DispatchMode},
    github::RepoSearcher,
    models::{NotificationRecord, RepositoryRecord, Snapshot, TrackedRepository},
    monitor::{
        classifier::{classify_severity, should_alert_new_repo, Thresholds},
        velocity::compute_velocity,
    },
    notification::{
        format::{
            format_alert, format_digest, format_new_repo_alert, tier_marker, AlertData,
            DigestEntry, NewRepoAlertData, NEW_REPO_MARKER,
        },
        Notifier,
    },
    state::StateStore,
};

const MS_PER_DAY: i64 = 86_400_000;

/// An alert queued during evaluation, carrying both its individual message
/// and its one-line digest form.
struct PendingAlert {
    repo_key: String,
    message: String,
    digest_entry: DigestEntry,
}

/// Runs monitoring cycles against the configured keyword set.
pub struct MonitorCycle {
    searcher: Arc<dyn RepoSearcher>,
    notifier: Arc<dyn Notifier>,
    store: StateStore,
    keywords: Vec<String>,
    cooldown_days: u32,
    batch_threshold: usize,
    thresholds: Thresholds,
    dispatch_mode: DispatchMode,
    max_stars: Option<u64>,
}

impl MonitorCycle {
    /// Creates a cycle runner wired to its collaborators. Configuration is
    /// captured once here; nothing is read from global state later.
    pub fn new(
        config: &AppConfig,
        searcher: Arc<dyn RepoSearcher>,
        notifier: Arc<dyn Notifier>,
        store: StateStore,
    ) -> Self {
        Self {
            searcher,
            notifier,
            store,
            keywords: config.keywords.clone(),
            cooldown_days: config.cooldown_days,
            batch_threshold: config.batch_threshold,
            thresholds: config.thresholds.clone(),
            dispatch_mode: config.dispatch_mode,
            max_stars: config.max_stars,
        }
    }

    /// Runs one complete monitoring cycle. Never propagates an error: a
    /// cycle failure is logged and the next scheduled cycle starts fresh.
    pub async fn run(&mut self) {
        let results = match self.searcher.search(&self.keywords).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(error = %e, "Search failed, aborting cycle");
                return;
            }
        };
        tracing::info!(count = results.len(), "Search returned repositories");

        let now = Utc::now();
        let mut pending = Vec::new();

        for repo in &results {
            if let Some(alert) = self.evaluate(repo, now) {
                pending.push(alert);
            }
            // History tracking is unconditional: state must reflect reality
            // whether or not an alert fires.
            self.track(repo, now);
        }

        let alerts_sent = self.dispatch(pending).await;

        self.store.update(|s| s.meta.last_cycle_at = Some(Utc::now()));
        if let Err(e) = self.store.save().await {
            tracing::error!(
                error = %e,
                "Failed to persist state; in-memory state stays current until the next save"
            );
        }

        tracing::info!(alerts_sent, repo_count = results.len(), "Monitoring cycle complete");
    }

    /// Flushes state on graceful shutdown.
    pub async fn shutdown(&self) {
        tracing::info!("Flushing state before shutdown");
        if let Err(e) = self.store.save().await {
            tracing::error!(error = %e, "Failed to flush state during shutdown");
        }
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Decides whether a repository warrants an alert this cycle, and builds
    /// the pending alert if so. Does not mutate state.
    fn evaluate(&self, repo: &RepositoryRecord, now: DateTime<Utc>) -> Option<PendingAlert> {
        let key = repo.key();
        let last_snapshot =
            self.store.state().repos.get(&key).and_then(TrackedRepository::latest_snapshot);
        let velocity = compute_velocity(repo.stars, repo.created_at, last_snapshot, now);

        if self.max_stars.is_some_and(|cap| repo.stars > cap) {
            tracing::debug!(repo = %key, stars = repo.stars, "Repository above max_stars, skipping alert");
            return None;
        }

        // The cooldown gate is independent of classification: it only asks
        // whether this key may be alerted on again yet.
        if self.within_cooldown(&key, now) {
            tracing::debug!(repo = %key, "Repository within cooldown, skipping alert");
            return None;
        }

        if velocity.is_new {
            if !should_alert_new_repo(repo.stars, &self.thresholds) {
                return None;
            }
            let message = format_new_repo_alert(&NewRepoAlertData {
                owner: repo.owner.clone(),
                name: repo.name.clone(),
                description: repo.description.clone(),
                stars: repo.stars,
                language: repo.language.clone(),
                repo_age_days: velocity.repo_age_days,
            });
            Some(PendingAlert {
                repo_key: key,
                message,
                digest_entry: DigestEntry {
                    owner: repo.owner.clone(),
                    name: repo.name.clone(),
                    stars: repo.stars,
                    stars_per_day: None,
                    marker: NEW_REPO_MARKER,
                },
            })
        } else {
            let tier =
                classify_severity(velocity.stars_per_day, velocity.repo_age_days, &self.thresholds)?;
            let message = format_alert(&AlertData {
                owner: repo.owner.clone(),
                name: repo.name.clone(),
                description: repo.description.clone(),
                stars: repo.stars,
                stars_per_day: velocity.stars_per_day,
                language: repo.language.clone(),
                repo_age_days: velocity.repo_age_days,
                tier,
            });
            Some(PendingAlert {
                repo_key: key,
                message,
                digest_entry: DigestEntry {
                    owner: repo.owner.clone(),
                    name: repo.name.clone(),
                    stars: repo.stars,
                    stars_per_day: Some(velocity.stars_per_day),
                    marker: tier_marker(tier),
                },
            })
        }
    }

    /// Appends this cycle's snapshot for a repository, creating its tracking
    /// record on first sighting.
    fn track(&mut self, repo: &RepositoryRecord, now: DateTime<Utc>) {
        let key = repo.key();
        self.store.update(|s| {
            let tracked = s
                .repos
                .entry(key)
                .or_insert_with(|| TrackedRepository::first_sighting(repo, now));
            tracked.push_snapshot(Snapshot { timestamp: now, stars: repo.stars, forks: repo.forks });
        });
    }

    /// True when the last successful alert for this key is more recent than
    /// the cooldown window. At exactly the boundary the alert is allowed.
    fn within_cooldown(&self, key: &str, now: DateTime<Utc>) -> bool {
        let Some(record) = self.store.state().notifications.get(key) else {
            return false;
        };
        let cooldown_ms = i64::from(self.cooldown_days) * MS_PER_DAY;
        (now - record.last_alert_at).num_milliseconds() < cooldown_ms
    }

    /// Delivers the queued alerts, individually or as a digest. Cooldown
    /// records are written only for alerts the channel confirmed.
    async fn dispatch(&mut self, pending: Vec<PendingAlert>) -> usize {
        if pending.is_empty() {
            return 0;
        }

        let use_digest = match self.dispatch_mode {
            DispatchMode::AlwaysDigest => true,
            DispatchMode::Threshold => pending.len() > self.batch_threshold,
        };

        let mut sent = 0;
        if use_digest {
            let entries: Vec<DigestEntry> =
                pending.iter().map(|a| a.digest_entry.clone()).collect();
            let digest = format_digest(&entries);
            if self.notifier.send(&digest).await {
                let now = Utc::now();
                self.store.update(|s| {
                    for alert in &pending {
                        s.notifications.insert(
                            alert.repo_key.clone(),
                            NotificationRecord { last_alert_at: now },
                        );
                    }
                });
                sent = pending.len();
                tracing::info!(alert_count = sent, "Digest alert sent");
            }
        } else {
            for alert in &pending {
                // An isolated send failure skips that repository's cooldown
                // record but never aborts the rest of the queue.
                if self.notifier.send(&alert.message).await {
                    let now = Utc::now();
                    self.store.update(|s| {
                        s.notifications.insert(
                            alert.repo_key.clone(),
                            NotificationRecord { last_alert_at: now },
                        );
                    });
                    sent += 1;
                    tracing::info!(repo = %alert.repo_key, "Individual alert sent");
                }
            }
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use mockall::predicate::always;

    use super::*;
    use crate::{
        config::AppConfig,
        github::{MockRepoSearcher, SearchError},
        notification::MockNotifier,
        test_helpers::RepositoryRecordBuilder,
    };

    fn temp_store(dir: &tempfile::TempDir) -> StateStore {
        StateStore::new(dir.path().join("state.json"))
    }

    fn cycle_with(
        config: &AppConfig,
        searcher: MockRepoSearcher,
        notifier: MockNotifier,
        store: StateStore,
    ) -> MonitorCycle {
        MonitorCycle::new(config, Arc::new(searcher), Arc::new(notifier), store)
    }

    fn searcher_returning(repos: Vec<RepositoryRecord>) -> MockRepoSearcher {
        let mut searcher = MockRepoSearcher::new();
        searcher.expect_search().times(1).returning(move |_| Ok(repos.clone()));
        searcher
    }

    #[tokio::test]
    async fn test_failed_search_aborts_cycle_without_state_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let mut searcher = MockRepoSearcher::new();
        searcher.expect_search().times(1).returning(|_| {
            Err(SearchError::Api { status: reqwest::StatusCode::INTERNAL_SERVER_ERROR })
        });
        let mut notifier = MockNotifier::new();
        notifier.expect_send().times(0);

        let config = AppConfig::builder().build();
        let mut cycle = cycle_with(&config, searcher, notifier, temp_store(&dir));
        cycle.run().await;

        assert!(cycle.store().state().repos.is_empty());
        assert!(cycle.store().state().meta.last_cycle_at.is_none());
        // No save happened either: the cycle ended before persistence.
        assert!(!dir.path().join("state.json").exists());
    }

    #[tokio::test]
    async fn test_new_repo_above_star_floor_is_alerted_and_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryRecordBuilder::new("alice", "newlib")
            .stars(25)
            .created_days_ago(2)
            .build();
        let searcher = searcher_returning(vec![repo]);

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|m: &str| m.contains("[NEW]") && m.contains("alice/newlib"))
            .times(1)
            .returning(|_| true);

        let config = AppConfig::builder().build();
        let mut cycle = cycle_with(&config, searcher, notifier, temp_store(&dir));
        cycle.run().await;

        let state = cycle.store().state();
        assert_eq!(state.repos["alice/newlib"].snapshots.len(), 1);
        assert!(state.notifications.contains_key("alice/newlib"));
        assert!(state.meta.last_cycle_at.is_some());
        assert!(dir.path().join("state.json").exists());
    }

    #[tokio::test]
    async fn test_new_repo_below_star_floor_is_tracked_but_not_alerted() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryRecordBuilder::new("alice", "tiny").stars(5).build();
        let searcher = searcher_returning(vec![repo]);
        let mut notifier = MockNotifier::new();
        notifier.expect_send().times(0);

        let config = AppConfig::builder().build();
        let mut cycle = cycle_with(&config, searcher, notifier, temp_store(&dir));
        cycle.run().await;

        let state = cycle.store().state();
        assert_eq!(state.repos["alice/tiny"].snapshots.len(), 1);
        assert!(state.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_fast_growing_young_repo_triggers_viral_alert() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryRecordBuilder::new("bob", "fastgrow")
            .stars(200)
            .created_days_ago(10)
            .build();
        let searcher = searcher_returning(vec![repo]);

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|m: &str| m.contains("[VIRAL]") && m.contains("bob/fastgrow"))
            .times(1)
            .returning(|_| true);

        let config = AppConfig::builder().build();
        let mut store = temp_store(&dir);
        // Previous snapshot 24 hours ago at 100 stars: 100 stars/day.
        let earlier = Utc::now() - Duration::hours(24);
        store.update(|s| {
            let mut tracked = TrackedRepository {
                owner: "bob".into(),
                name: "fastgrow".into(),
                description: None,
                language: None,
                topics: vec![],
                added_at: earlier,
                snapshots: vec![],
            };
            tracked.push_snapshot(Snapshot { timestamp: earlier, stars: 100, forks: 0 });
            s.repos.insert("bob/fastgrow".into(), tracked);
        });

        let mut cycle = cycle_with(&config, searcher, notifier, store);
        cycle.run().await;

        let state = cycle.store().state();
        assert_eq!(state.repos["bob/fastgrow"].snapshots.len(), 2);
        assert!(state.notifications.contains_key("bob/fastgrow"));
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_alert_but_snapshot_is_still_appended() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryRecordBuilder::new("bob", "fastgrow")
            .stars(200)
            .created_days_ago(10)
            .build();
        let searcher = searcher_returning(vec![repo]);
        let mut notifier = MockNotifier::new();
        notifier.expect_send().times(0);

        let config = AppConfig::builder().cooldown_days(7).build();
        let mut store = temp_store(&dir);
        let earlier = Utc::now() - Duration::hours(24);
        store.update(|s| {
            let mut tracked = TrackedRepository {
                owner: "bob".into(),
                name: "fastgrow".into(),
                description: None,
                language: None,
                topics: vec![],
                added_at: earlier,
                snapshots: vec![],
            };
            tracked.push_snapshot(Snapshot { timestamp: earlier, stars: 100, forks: 0 });
            s.repos.insert("bob/fastgrow".into(), tracked);
            // Alerted three days ago; the seven-day cooldown is still open.
            s.notifications.insert(
                "bob/fastgrow".into(),
                NotificationRecord { last_alert_at: Utc::now() - Duration::days(3) },
            );
        });

        let mut cycle = cycle_with(&config, searcher, notifier, store);
        cycle.run().await;

        assert_eq!(cycle.store().state().repos["bob/fastgrow"].snapshots.len(), 2);
    }

    #[tokio::test]
    async fn test_alert_allowed_at_exact_cooldown_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::builder().cooldown_days(7).build();
        let searcher = MockRepoSearcher::new();
        let notifier = MockNotifier::new();
        let mut store = temp_store(&dir);
        let now = Utc::now();
        store.update(|s| {
            s.notifications.insert(
                "bob/fastgrow".into(),
                NotificationRecord { last_alert_at: now - Duration::days(7) },
            );
        });

        let cycle = cycle_with(&config, searcher, notifier, store);

        assert!(!cycle.within_cooldown("bob/fastgrow", now));
        assert!(cycle.within_cooldown("bob/fastgrow", now - Duration::milliseconds(1)));
    }

    #[tokio::test]
    async fn test_digest_dispatch_above_batch_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let repos: Vec<RepositoryRecord> = (0..12)
            .map(|i| {
                RepositoryRecordBuilder::new("owner", &format!("repo{i}"))
                    .stars(25)
                    .created_days_ago(2)
                    .build()
            })
            .collect();
        let searcher = searcher_returning(repos);

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|m: &str| m.contains("12 trending repositories"))
            .times(1)
            .returning(|_| true);

        let config = AppConfig::builder().batch_threshold(10).build();
        let mut cycle = cycle_with(&config, searcher, notifier, temp_store(&dir));
        cycle.run().await;

        assert_eq!(cycle.store().state().notifications.len(), 12);
    }

    #[tokio::test]
    async fn test_failed_digest_send_writes_no_notification_records() {
        let dir = tempfile::tempdir().unwrap();
        let repos: Vec<RepositoryRecord> = (0..12)
            .map(|i| {
                RepositoryRecordBuilder::new("owner", &format!("repo{i}"))
                    .stars(25)
                    .created_days_ago(2)
                    .build()
            })
            .collect();
        let searcher = searcher_returning(repos);

        let mut notifier = MockNotifier::new();
        notifier.expect_send().with(always()).times(1).returning(|_| false);

        let config = AppConfig::builder().batch_threshold(10).build();
        let mut cycle = cycle_with(&config, searcher, notifier, temp_store(&dir));
        cycle.run().await;

        let state = cycle.store().state();
        assert!(state.notifications.is_empty());
        // Snapshot history and cycle metadata are persisted regardless.
        assert_eq!(state.repos.len(), 12);
        assert!(state.meta.last_cycle_at.is_some());
        assert!(dir.path().join("state.json").exists());
    }

    #[tokio::test]
    async fn test_individual_send_failure_does_not_abort_remaining_sends() {
        let dir = tempfile::tempdir().unwrap();
        let repos = vec![
            RepositoryRecordBuilder::new("a", "first").stars(25).created_days_ago(2).build(),
            RepositoryRecordBuilder::new("b", "second").stars(25).created_days_ago(2).build(),
        ];
        let searcher = searcher_returning(repos);

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|m: &str| m.contains("a/first"))
            .times(1)
            .returning(|_| false);
        notifier
            .expect_send()
            .withf(|m: &str| m.contains("b/second"))
            .times(1)
            .returning(|_| true);

        let config = AppConfig::builder().build();
        let mut cycle = cycle_with(&config, searcher, notifier, temp_store(&dir));
        cycle.run().await;

        let state = cycle.store().state();
        assert!(!state.notifications.contains_key("a/first"));
        assert!(state.notifications.contains_key("b/second"));
    }

    #[tokio::test]
    async fn test_max_stars_filter_suppresses_alert_but_not_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryRecordBuilder::new("mega", "popular")
            .stars(100_000)
            .created_days_ago(2)
            .build();
        let searcher = searcher_returning(vec![repo]);
        let mut notifier = MockNotifier::new();
        notifier.expect_send().times(0);

        let config = AppConfig::builder().max_stars(50_000).build();
        let mut cycle = cycle_with(&config, searcher, notifier, temp_store(&dir));
        cycle.run().await;

        let state = cycle.store().state();
        assert_eq!(state.repos["mega/popular"].snapshots.len(), 1);
        assert!(state.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_always_digest_mode_combines_any_number_of_alerts() {
        let dir = tempfile::tempdir().unwrap();
        let repos = vec![
            RepositoryRecordBuilder::new("a", "first").stars(25).created_days_ago(2).build(),
            RepositoryRecordBuilder::new("b", "second").stars(25).created_days_ago(2).build(),
        ];
        let searcher = searcher_returning(repos);

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|m: &str| m.contains("2 trending repositories"))
            .times(1)
            .returning(|_| true);

        let config = AppConfig::builder()
            .dispatch_mode(crate::config::DispatchMode::AlwaysDigest)
            .build();
        let mut cycle = cycle_with(&config, searcher, notifier, temp_store(&dir));
        cycle.run().await;

        assert_eq!(cycle.store().state().notifications.len(), 2);
    }
}
