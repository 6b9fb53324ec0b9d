//! GitHub search collaborator.
//!
//! The monitoring cycle depends only on the [`RepoSearcher`] trait: given the
//! configured keywords it returns the matching repository records, or an
//! error that aborts the cycle. Rate-limit backoff is handled inside the
//! implementation by the shared retry middleware.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

mod search;

pub use search::{build_search_query, GitHubSearcher};

use crate::models::RepositoryRecord;

/// Defines the possible errors that can occur during a repository search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// A transport-level error from the underlying HTTP client.
    #[error("Request error: {0}")]
    Request(#[from] reqwest_middleware::Error),

    /// GitHub responded with a non-success status.
    #[error("GitHub search failed with status: {status}")]
    Api {
        /// HTTP status returned by the API.
        status: reqwest::StatusCode,
    },

    /// The response body could not be decoded.
    #[error("Failed to decode search response: {0}")]
    Decode(#[from] reqwest::Error),
}

/// The search interface the monitoring cycle depends on.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RepoSearcher: Send + Sync {
    /// Searches for repositories matching the configured keywords.
    async fn search(&self, keywords: &[String]) -> Result<Vec<RepositoryRecord>, SearchError>;
}
