//! Page fetching
//!
//! Workers only see the [`PageFetcher`] trait, so tests can inject a scripted
//! client. [`HttpPageFetcher`] is the production implementation: one
//! `reqwest::Client` shared by every worker, issuing
//! `GET {url}?offset={offset}&limit={limit}` and decoding the JSON page.

use async_trait::async_trait;
use reqwest::{header::USER_AGENT, Client};
use std::time::Duration;

use crate::config::Settings;
use crate::models::{ItemId, Page};
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Source of pages, shared by all workers of a run
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page starting at `offset` holding up to `limit` records
    async fn fetch(&self, offset: ItemId, limit: u32) -> Result<Page, FetchError>;
}

/// HTTP page fetcher for the food stats endpoint
pub struct HttpPageFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Page endpoint
    url: String,

    /// Retry policy for retryable failures
    retry: RetryConfig,
}

impl HttpPageFetcher {
    /// Create a fetcher without retries
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` for an unparsable URL and
    /// `FetchError::Http` if the HTTP client cannot be created
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FetchError> {
        Self::with_retry(url, timeout, RetryConfig::default())
    }

    /// Create a fetcher with a custom retry policy
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` for an unparsable URL and
    /// `FetchError::Http` if the HTTP client cannot be created
    pub fn with_retry(url: &str, timeout: Duration, retry: RetryConfig) -> Result<Self, FetchError> {
        url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        let client = Client::builder().timeout(timeout).gzip(true).build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            retry,
        })
    }

    /// Create a fetcher from run settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the URL is invalid or the client cannot be built
    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        Self::with_retry(
            &settings.url,
            settings.request_timeout(),
            RetryConfig::new(settings.max_retries),
        )
    }

    /// Endpoint this fetcher queries
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_once(&self, offset: ItemId, limit: u32) -> Result<Page, FetchError> {
        tracing::trace!(url = %self.url, offset, limit, "Fetching page");

        let response = self
            .client
            .get(&self.url)
            .header(USER_AGENT, concat!("lifestats/", env!("CARGO_PKG_VERSION")))
            .query(&[("offset", offset), ("limit", u64::from(limit))])
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError {
                offset,
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(classify)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::Decode(format!("page at offset {offset}: {e}")))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, offset: ItemId, limit: u32) -> Result<Page, FetchError> {
        let result = with_retry_if(
            &self.retry,
            || self.fetch_once(offset, limit),
            FetchError::is_retryable,
        )
        .await;

        match result {
            Err(last) if self.retry.max_retries > 0 && last.is_retryable() => {
                Err(FetchError::MaxRetriesExceeded {
                    attempts: self.retry.max_retries + 1,
                    last: Box::new(last),
                })
            }
            other => other,
        }
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(err)
    }
}
