//! Application configuration, loaded once at startup and passed explicitly
//! into every component constructor.

use std::{path::PathBuf, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};

use crate::monitor::classifier::Thresholds;

/// Provides the default value for state_file_path.
fn default_state_file_path() -> PathBuf {
    PathBuf::from("state.json")
}

/// Provides the default value for polling_interval_secs.
fn default_polling_interval() -> Duration {
    Duration::from_secs(3600)
}

/// Provides the default value for cooldown_days.
fn default_cooldown_days() -> u32 {
    7
}

/// Provides the default value for batch_threshold.
fn default_batch_threshold() -> usize {
    10
}

/// Deserializes a `Duration` from a number of seconds.
pub fn deserialize_duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

/// Deserializes a `Duration` from a number of milliseconds.
pub fn deserialize_duration_from_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(ms))
}

/// Strategy for delivering the alerts queued during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Send alerts individually up to `batch_threshold`, and as a single
    /// digest above it.
    #[default]
    Threshold,
    /// Always combine the cycle's alerts into a single digest message.
    AlwaysDigest,
}

/// Retry policy for outbound HTTP requests.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpRetryConfig {
    /// Maximum number of retries for transient failures.
    #[serde(default = "HttpRetryConfig::default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay before the first retry.
    #[serde(
        deserialize_with = "deserialize_duration_from_ms",
        default = "HttpRetryConfig::default_initial_backoff"
    )]
    pub initial_backoff_ms: Duration,

    /// Upper bound on the backoff delay.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "HttpRetryConfig::default_max_backoff"
    )]
    pub max_backoff_secs: Duration,
}

impl HttpRetryConfig {
    fn default_max_retries() -> u32 {
        3
    }

    fn default_initial_backoff() -> Duration {
        Duration::from_millis(250)
    }

    fn default_max_backoff() -> Duration {
        Duration::from_secs(10)
    }
}

impl Default for HttpRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: Self::default_max_retries(),
            initial_backoff_ms: Self::default_initial_backoff(),
            max_backoff_secs: Self::default_max_backoff(),
        }
    }
}

/// Application configuration for GitScope.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// GitHub API token used for repository search.
    pub github_token: String,

    /// Telegram bot token used for sending alerts.
    pub telegram_bot_token: String,

    /// Identifier of the Telegram chat alerts are delivered to.
    pub telegram_chat_id: String,

    /// Path of the durable state file.
    #[serde(default = "default_state_file_path")]
    pub state_file_path: PathBuf,

    /// Keywords searched for each cycle.
    pub keywords: Vec<String>,

    /// Interval between monitoring cycles.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_polling_interval"
    )]
    pub polling_interval_secs: Duration,

    /// Minimum number of days between alerts for the same repository.
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: u32,

    /// Pending-alert count above which a cycle's alerts are combined into a
    /// single digest message.
    #[serde(default = "default_batch_threshold")]
    pub batch_threshold: usize,

    /// Severity classification thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Alert delivery strategy.
    #[serde(default)]
    pub dispatch_mode: DispatchMode,

    /// Optional upper star-count filter: repositories above this count are
    /// tracked but never alerted on.
    #[serde(default)]
    pub max_stars: Option<u64>,

    /// Retry policy shared by the GitHub and Telegram HTTP clients.
    #[serde(default)]
    pub http_retry: HttpRetryConfig,
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading from the configuration directory,
    /// with `GITSCOPE__`-prefixed environment variables taking precedence.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir_str)))
            .add_source(
                Environment::with_prefix("GITSCOPE")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            )
            .build()?;
        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints that serde cannot express.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.keywords.is_empty() {
            return Err(ConfigError::Message("keywords must not be empty".into()));
        }
        if !(1..=90).contains(&self.cooldown_days) {
            return Err(ConfigError::Message(format!(
                "cooldown_days must be between 1 and 90, got {}",
                self.cooldown_days
            )));
        }
        Ok(())
    }

    /// Creates a new `AppConfigBuilder` for testing purposes.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// A builder for creating `AppConfig` instances in tests.
#[derive(Debug)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl Default for AppConfigBuilder {
    fn default() -> Self {
        Self {
            config: AppConfig {
                github_token: "test-github-token".into(),
                telegram_bot_token: "test-bot-token".into(),
                telegram_chat_id: "12345".into(),
                state_file_path: default_state_file_path(),
                keywords: vec!["rust".into()],
                polling_interval_secs: default_polling_interval(),
                cooldown_days: default_cooldown_days(),
                batch_threshold: default_batch_threshold(),
                thresholds: Thresholds::default(),
                dispatch_mode: DispatchMode::default(),
                max_stars: None,
                http_retry: HttpRetryConfig::default(),
            },
        }
    }
}

impl AppConfigBuilder {
    /// Sets the state file path.
    pub fn state_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.state_file_path = path.into();
        self
    }

    /// Sets the keyword list.
    pub fn keywords(mut self, keywords: Vec<&str>) -> Self {
        self.config.keywords = keywords.into_iter().map(String::from).collect();
        self
    }

    /// Sets the cooldown window in days.
    pub fn cooldown_days(mut self, days: u32) -> Self {
        self.config.cooldown_days = days;
        self
    }

    /// Sets the digest batch threshold.
    pub fn batch_threshold(mut self, threshold: usize) -> Self {
        self.config.batch_threshold = threshold;
        self
    }

    /// Sets the alert delivery strategy.
    pub fn dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.config.dispatch_mode = mode;
        self
    }

    /// Sets the optional upper star-count alert filter.
    pub fn max_stars(mut self, max_stars: u64) -> Self {
        self.config.max_stars = Some(max_stars);
        self
    }

    /// Sets the severity classification thresholds.
    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.config.thresholds = thresholds;
        self
    }

    /// Finalizes the configuration.
    pub fn build(self) -> AppConfig {
        self.config
    }
}
