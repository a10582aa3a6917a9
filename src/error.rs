//! Unified error handling for the lifestats crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`LifestatsErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! Only configuration problems ever escape [`crate::crawler::Coordinator::run`];
//! fetch failures are absorbed at the worker boundary and cancellation is
//! reported through the summary. [`crate::crawler::run`] can also fail with
//! `Error::Fetch` when the HTTP client cannot be built.

use thiserror::Error;

pub use crate::utils::error::{ConfigError, CrawlerError, FetchError};

/// Common trait for all lifestats error types
pub trait LifestatsErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, status)
    Network,
    /// Response decoding errors
    Parsing,
    /// Configuration and validation errors
    Config,
}

impl ErrorCategory {
    /// Short label used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Config => "config",
        }
    }
}

/// Unified error type for the lifestats crate
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid run settings
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

impl LifestatsErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        self.is_retryable()
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Parsing,
            Self::InvalidUrl(_) => ErrorCategory::Config,
            _ => ErrorCategory::Network,
        }
    }
}

impl LifestatsErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Fetch(e) => e.is_recoverable(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Config,
            Self::Fetch(e) => e.category(),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
