//! Repository search against the GitHub REST API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use super::{RepoSearcher, SearchError};
use crate::{
    config::HttpRetryConfig,
    http_client::{build_http_client, HttpClientError},
    models::RepositoryRecord,
};

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("gitscope/", env!("CARGO_PKG_VERSION"));

/// Search qualifiers restricting where keywords are matched.
const QUALIFIERS: &str = "in:name,description,topics,readme";

/// Builds the GitHub search query: keywords joined with `OR` (multi-word
/// keywords quoted) followed by the field qualifiers.
pub fn build_search_query(keywords: &[String]) -> String {
    let keyword_query = keywords
        .iter()
        .map(|k| if k.contains(' ') { format!("\"{k}\"") } else { k.clone() })
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("{keyword_query} {QUALIFIERS}")
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total_count: u64,
    incomplete_results: bool,
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    name: String,
    owner: Option<ItemOwner>,
    description: Option<String>,
    stargazers_count: u64,
    forks_count: u64,
    language: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ItemOwner {
    login: String,
}

impl From<SearchItem> for RepositoryRecord {
    fn from(item: SearchItem) -> Self {
        RepositoryRecord {
            owner: item.owner.map(|o| o.login).unwrap_or_default(),
            name: item.name,
            description: item.description,
            stars: item.stargazers_count,
            forks: item.forks_count,
            language: item.language,
            created_at: item.created_at,
            topics: item.topics,
        }
    }
}

/// Searches GitHub repositories via the REST search API.
pub struct GitHubSearcher {
    api_base: String,
    token: String,
    client: ClientWithMiddleware,
}

impl GitHubSearcher {
    /// Creates a searcher authenticated with the given token.
    pub fn new(token: &str, retry: &HttpRetryConfig) -> Result<Self, HttpClientError> {
        Self::with_api_base(token, retry, GITHUB_API_BASE)
    }

    /// Creates a searcher pointed at a non-default API base URL. Used by
    /// tests to target a local mock server.
    pub fn with_api_base(
        token: &str,
        retry: &HttpRetryConfig,
        api_base: &str,
    ) -> Result<Self, HttpClientError> {
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client: build_http_client(retry)?,
        })
    }
}

#[async_trait]
impl RepoSearcher for GitHubSearcher {
    async fn search(&self, keywords: &[String]) -> Result<Vec<RepositoryRecord>, SearchError> {
        let query = build_search_query(keywords);

        let response = self
            .client
            .get(format!("{}/search/repositories", self.api_base))
            .query(&[
                ("q", query.as_str()),
                ("sort", "updated"),
                ("order", "desc"),
                ("per_page", "100"),
            ])
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Api { status });
        }

        let body: SearchResponse = response.json().await?;

        if body.incomplete_results {
            tracing::warn!("GitHub search returned incomplete results");
        }

        tracing::info!(
            total_count = body.total_count,
            returned_count = body.items.len(),
            "GitHub search completed"
        );

        Ok(body.items.into_iter().map(RepositoryRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn no_retry() -> HttpRetryConfig {
        HttpRetryConfig { max_retries: 0, ..Default::default() }
    }

    fn search_item(owner: &str, name: &str, stars: u64) -> serde_json::Value {
        json!({
            "name": name,
            "full_name": format!("{owner}/{name}"),
            "owner": {"login": owner},
            "description": "A test repository",
            "stargazers_count": stars,
            "forks_count": 3,
            "language": "Rust",
            "created_at": "2026-08-01T00:00:00Z",
            "topics": ["cli", "tools"],
        })
    }

    #[test]
    fn test_build_search_query_joins_keywords_with_or() {
        let keywords = vec!["openclaw".to_string(), "claude-code".to_string()];
        assert_eq!(
            build_search_query(&keywords),
            "openclaw OR claude-code in:name,description,topics,readme"
        );
    }

    #[test]
    fn test_build_search_query_quotes_multi_word_keywords() {
        let keywords = vec!["openclaw skills".to_string(), "clawhub".to_string()];
        assert_eq!(
            build_search_query(&keywords),
            "\"openclaw skills\" OR clawhub in:name,description,topics,readme"
        );
    }

    #[tokio::test]
    async fn test_search_parses_repository_records() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search/repositories")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("sort".into(), "updated".into()),
                Matcher::UrlEncoded("order".into(), "desc".into()),
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded(
                    "q".into(),
                    "rust in:name,description,topics,readme".into(),
                ),
            ]))
            .match_header("Authorization", "Bearer gh-token")
            .with_status(200)
            .with_body(
                json!({
                    "total_count": 2,
                    "incomplete_results": false,
                    "items": [search_item("alice", "newlib", 25), search_item("bob", "fastgrow", 200)],
                })
                .to_string(),
            )
            .create_async()
            .await;

        let searcher = GitHubSearcher::with_api_base("gh-token", &no_retry(), &server.url()).unwrap();
        let records = searcher.search(&["rust".to_string()]).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key(), "alice/newlib");
        assert_eq!(records[0].stars, 25);
        assert_eq!(records[0].language.as_deref(), Some("Rust"));
        assert_eq!(records[0].topics, vec!["cli", "tools"]);
        assert_eq!(records[1].key(), "bob/fastgrow");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_surfaces_api_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search/repositories")
            .match_query(Matcher::Any)
            .with_status(422)
            .with_body(r#"{"message":"Validation Failed"}"#)
            .create_async()
            .await;

        let searcher = GitHubSearcher::with_api_base("gh-token", &no_retry(), &server.url()).unwrap();
        let err = searcher.search(&["rust".to_string()]).await.unwrap_err();

        assert!(matches!(err, SearchError::Api { status } if status.as_u16() == 422));
    }

    #[tokio::test]
    async fn test_search_tolerates_missing_optional_fields() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search/repositories")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "total_count": 1,
                    "incomplete_results": true,
                    "items": [{
                        "name": "bare",
                        "full_name": "carol/bare",
                        "owner": {"login": "carol"},
                        "description": null,
                        "stargazers_count": 1,
                        "forks_count": 0,
                        "language": null,
                        "created_at": "2026-08-01T00:00:00Z",
                    }],
                })
                .to_string(),
            )
            .create_async()
            .await;

        let searcher = GitHubSearcher::with_api_base("gh-token", &no_retry(), &server.url()).unwrap();
        let records = searcher.search(&["rust".to_string()]).await.unwrap();

        assert_eq!(records.len(), 1);
        assert!(records[0].description.is_none());
        assert!(records[0].language.is_none());
        assert!(records[0].topics.is_empty());
    }
}
