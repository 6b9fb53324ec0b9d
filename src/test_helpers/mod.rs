//! Shared builders and fakes for unit and integration tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{
    github::{RepoSearcher, SearchError},
    models::RepositoryRecord,
    notification::Notifier,
};

/// Builder for [`RepositoryRecord`] test fixtures.
pub struct RepositoryRecordBuilder {
    record: RepositoryRecord,
}

impl RepositoryRecordBuilder {
    /// Starts a record for `owner/name` with neutral defaults.
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            record: RepositoryRecord {
                owner: owner.to_string(),
                name: name.to_string(),
                description: Some("A test repository".to_string()),
                stars: 0,
                forks: 0,
                language: Some("Rust".to_string()),
                created_at: Utc::now() - Duration::days(365),
                topics: vec![],
            },
        }
    }

    /// Sets the star count.
    pub fn stars(mut self, stars: u64) -> Self {
        self.record.stars = stars;
        self
    }

    /// Sets the fork count.
    pub fn forks(mut self, forks: u64) -> Self {
        self.record.forks = forks;
        self
    }

    /// Sets the creation time relative to now.
    pub fn created_days_ago(mut self, days: i64) -> Self {
        self.record.created_at = Utc::now() - Duration::days(days);
        self
    }

    /// Sets the creation time absolutely.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.record.created_at = created_at;
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: &str) -> Self {
        self.record.description = Some(description.to_string());
        self
    }

    /// Clears the optional fields.
    pub fn bare(mut self) -> Self {
        self.record.description = None;
        self.record.language = None;
        self
    }

    /// Finalizes the record.
    pub fn build(self) -> RepositoryRecord {
        self.record
    }
}

/// A [`RepoSearcher`] returning a canned response, for integration tests.
pub struct FakeSearcher {
    results: Option<Vec<RepositoryRecord>>,
    calls: AtomicUsize,
}

impl FakeSearcher {
    /// A searcher that always returns the given repositories.
    pub fn with_results(results: Vec<RepositoryRecord>) -> Self {
        Self { results: Some(results), calls: AtomicUsize::new(0) }
    }

    /// A searcher whose every call fails.
    pub fn failing() -> Self {
        Self { results: None, calls: AtomicUsize::new(0) }
    }

    /// Number of times `search` was called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepoSearcher for FakeSearcher {
    async fn search(&self, _keywords: &[String]) -> Result<Vec<RepositoryRecord>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.results {
            Some(results) => Ok(results.clone()),
            None => Err(SearchError::Api { status: reqwest::StatusCode::SERVICE_UNAVAILABLE }),
        }
    }
}

/// A [`Notifier`] that records every message, for integration tests.
pub struct FakeNotifier {
    accept: bool,
    sent: Mutex<Vec<String>>,
}

impl FakeNotifier {
    /// A notifier that confirms every delivery.
    pub fn accepting() -> Self {
        Self { accept: true, sent: Mutex::new(Vec::new()) }
    }

    /// A notifier whose every delivery fails.
    pub fn rejecting() -> Self {
        Self { accept: false, sent: Mutex::new(Vec::new()) }
    }

    /// Messages passed to `send`, in order, whether or not they were
    /// confirmed.
    pub fn sent_messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, message: &str) -> bool {
        self.sent.lock().unwrap().push(message.to_string());
        self.accept
    }
}
