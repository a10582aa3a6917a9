//! Error types for the lifestats miner
//!
//! This module defines the domain error types used throughout the application.

use thiserror::Error;

/// Errors raised while building or validating run settings
///
/// All of these are fatal and surface before any worker is spawned.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Worker pool must contain at least one worker
    #[error("pool size must be greater than 0, got {0}")]
    InvalidPoolSize(usize),

    /// The ID range is empty or inverted
    #[error("last_id ({last_id}) must be greater than first_id ({first_id})")]
    InvalidRange { first_id: u64, last_id: u64 },

    /// Rate limit must be a positive, finite number
    #[error("rate limit must be positive, got {0}")]
    InvalidRateLimit(f64),

    /// Page size must be positive
    #[error("results per page must be greater than 0")]
    InvalidPageSize,

    /// A top-N cutoff of zero would produce an empty summary
    #[error("{0} must be greater than 0")]
    InvalidTopN(&'static str),

    /// Endpoint URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Environment name is not one of development, production, test
    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    /// Settings file has no table for the active environment
    #[error("No [{environment}] table in settings file {path}")]
    MissingEnvironment { environment: String, path: String },

    /// Settings file could not be read
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML for the expected shape
    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// Environment variable holds a value of the wrong type
    #[error("Invalid value for {key}: {value}")]
    InvalidVar { key: String, value: String },
}

/// Errors that can occur while fetching a page
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Could not fetch data for offset {offset}: server returned {status}")]
    ServerError { offset: u64, status: u16 },

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Every allowed attempt failed with a retryable error
    #[error("Giving up after {attempts} attempts: {last}")]
    MaxRetriesExceeded {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },

    /// Page body could not be decoded
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether another attempt at the same page could succeed
    ///
    /// Retry on timeouts, transport failures and the statuses
    /// 429, 500, 502, 503, 504.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::ServerError { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::MaxRetriesExceeded { .. } | Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// Errors that stop a worker's pagination loop
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// Fetch error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Cancellation was requested
    #[error("Operation cancelled")]
    Cancelled,
}
