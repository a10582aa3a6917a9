//! Configuration management for the lifestats miner
//!
//! Settings are resolved once, in this order (later wins): built-in defaults,
//! the active environment's table in a TOML settings file, `LIFESTATS_*`
//! environment variables, and finally CLI flags applied by the binary. The
//! result is validated and then shared read-only by every component.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::utils::error::ConfigError;

/// Deployment environment, used to pick a settings table and an output style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }

    /// Resolve the environment from `LIFESTATS_ENV`, then `ENV`
    ///
    /// Falls back to development when neither is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        std::env::var("LIFESTATS_ENV")
            .or_else(|_| std::env::var("ENV"))
            .map_or(Ok(Self::Development), |name| name.parse())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable settings for one mining run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Active environment (not read from the table itself)
    #[serde(skip)]
    pub environment: Environment,

    /// Page endpoint
    pub url: String,

    /// First item id to mine (inclusive)
    pub first_id: u64,

    /// Last item id to mine (exclusive)
    pub last_id: u64,

    /// Number of concurrent workers
    #[serde(alias = "pool")]
    pub pool_size: usize,

    /// Global request budget in requests per second, shared by all workers
    pub rate_limit: f64,

    /// Page size requested from the server
    pub results_per_page: u32,

    /// Seconds between progress lines per worker
    pub log_span: u64,

    /// Number of most frequent foods in the summary
    pub top_n_primary: usize,

    /// Number of most frequent categories in the summary
    pub top_n_secondary: usize,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Retries per page on retryable failures (0 disables retrying)
    pub max_retries: u32,

    /// How long to keep collecting reports after cancellation, in milliseconds
    pub shutdown_grace_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            url: String::from("http://localhost:4567/foodstats"),
            first_id: 0,
            last_id: 1000,
            pool_size: 2,
            rate_limit: 10.0,
            results_per_page: 100,
            log_span: 5,
            top_n_primary: 100,
            top_n_secondary: 10,
            request_timeout_secs: 30,
            max_retries: 0,
            shutdown_grace_ms: 0,
        }
    }
}

impl Settings {
    /// Load settings for `environment`: file table (if any), then env overrides
    pub fn load(path: Option<&Path>, environment: Environment) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => Self::from_file(path, environment)?,
            None => Self {
                environment,
                ..Self::default()
            },
        };
        settings.with_env_overrides()
    }

    /// Load defaults overridden by `LIFESTATS_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self {
            environment: Environment::from_env()?,
            ..Self::default()
        }
        .with_env_overrides()
    }

    /// Load the table named after `environment` from a TOML settings file
    ///
    /// Keys missing from the table keep their default values.
    pub fn from_file(path: &Path, environment: Environment) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let mut tables: HashMap<String, Settings> =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let mut settings =
            tables
                .remove(environment.as_str())
                .ok_or_else(|| ConfigError::MissingEnvironment {
                    environment: environment.to_string(),
                    path: path.display().to_string(),
                })?;
        settings.environment = environment;

        Ok(settings)
    }

    /// Apply `LIFESTATS_*` environment variables on top of these settings
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(url) = std::env::var("LIFESTATS_URL") {
            self.url = url;
        }
        if let Some(v) = env_var("LIFESTATS_FIRST_ID")? {
            self.first_id = v;
        }
        if let Some(v) = env_var("LIFESTATS_LAST_ID")? {
            self.last_id = v;
        }
        if let Some(v) = env_var("LIFESTATS_POOL")? {
            self.pool_size = v;
        }
        if let Some(v) = env_var("LIFESTATS_RATE_LIMIT")? {
            self.rate_limit = v;
        }
        if let Some(v) = env_var("LIFESTATS_RESULTS_PER_PAGE")? {
            self.results_per_page = v;
        }
        if let Some(v) = env_var("LIFESTATS_LOG_SPAN")? {
            self.log_span = v;
        }
        if let Some(v) = env_var("LIFESTATS_REQUEST_TIMEOUT")? {
            self.request_timeout_secs = v;
        }
        if let Some(v) = env_var("LIFESTATS_MAX_RETRIES")? {
            self.max_retries = v;
        }
        Ok(self)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::InvalidPoolSize(self.pool_size));
        }

        if self.last_id <= self.first_id {
            return Err(ConfigError::InvalidRange {
                first_id: self.first_id,
                last_id: self.last_id,
            });
        }

        if !(self.rate_limit.is_finite() && self.rate_limit > 0.0) {
            return Err(ConfigError::InvalidRateLimit(self.rate_limit));
        }

        // Each worker's spacing must fit a Duration
        if Duration::try_from_secs_f64(1.0 / self.per_worker_rate()).is_err() {
            return Err(ConfigError::InvalidRateLimit(self.rate_limit));
        }

        if self.results_per_page == 0 {
            return Err(ConfigError::InvalidPageSize);
        }

        if self.top_n_primary == 0 {
            return Err(ConfigError::InvalidTopN("top_n_primary"));
        }

        if self.top_n_secondary == 0 {
            return Err(ConfigError::InvalidTopN("top_n_secondary"));
        }

        url::Url::parse(&self.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {e}", self.url)))?;

        Ok(())
    }

    /// Each worker's share of the global rate limit, in requests per second
    #[must_use]
    pub fn per_worker_rate(&self) -> f64 {
        self.rate_limit / self.pool_size as f64
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get progress log interval as Duration
    #[must_use]
    pub fn log_interval(&self) -> Duration {
        Duration::from_secs(self.log_span)
    }

    /// Get the post-cancellation grace period as Duration
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

fn env_var<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}
