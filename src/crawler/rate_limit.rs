//! Per-worker request pacing
//!
//! Every worker gets `rate_limit / pool_size` requests per second and spaces
//! its own requests at least `1 / share` apart. Workers do not coordinate, so
//! the global budget holds on average rather than at every instant.
//!
//! Uses `tokio::time::Instant` so tests can drive it with a paused clock.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::utils::error::{ConfigError, CrawlerError};

/// Spacing enforcer owned by a single worker
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between two requests
    interval: Duration,

    /// When the previous request was released
    last_request: Option<Instant>,

    /// Realized spacing between consecutive requests
    intervals: Vec<Duration>,
}

impl RateLimiter {
    /// Create a limiter for one of `pool_size` workers sharing `rate_limit` req/s
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `pool_size` is zero or the rate is not positive
    pub fn new(rate_limit: f64, pool_size: usize) -> Result<Self, ConfigError> {
        if pool_size == 0 {
            return Err(ConfigError::InvalidPoolSize(pool_size));
        }
        Self::with_rate(rate_limit / pool_size as f64)
    }

    /// Create a limiter allowing `requests_per_second` for this worker alone
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRateLimit` if the rate is not positive and
    /// finite, or so small that its spacing does not fit a `Duration`
    pub fn with_rate(requests_per_second: f64) -> Result<Self, ConfigError> {
        if !(requests_per_second.is_finite() && requests_per_second > 0.0) {
            return Err(ConfigError::InvalidRateLimit(requests_per_second));
        }
        let interval = Duration::try_from_secs_f64(1.0 / requests_per_second)
            .map_err(|_| ConfigError::InvalidRateLimit(requests_per_second))?;

        Ok(Self {
            interval,
            last_request: None,
            intervals: Vec::new(),
        })
    }

    /// Target spacing between requests
    pub fn target_interval(&self) -> Duration {
        self.interval
    }

    /// Use now as the baseline for the first pacing decision
    pub fn start(&mut self) {
        self.last_request = Some(Instant::now());
    }

    /// Wait until the next request may be sent
    ///
    /// Returns how long the caller was held back. A limiter that was never
    /// started starts now.
    ///
    /// # Errors
    ///
    /// Returns `CrawlerError::Cancelled` if `cancel` fires first
    pub async fn limit(&mut self, cancel: &CancellationToken) -> Result<Duration, CrawlerError> {
        if cancel.is_cancelled() {
            return Err(CrawlerError::Cancelled);
        }

        let previous = *self.last_request.get_or_insert_with(Instant::now);
        let elapsed = previous.elapsed();
        let wait = self.interval.saturating_sub(elapsed);

        if !wait.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(CrawlerError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }

        let now = Instant::now();
        self.intervals.push(now.duration_since(previous));
        self.last_request = Some(now);

        Ok(wait)
    }

    /// Mean observed requests per second, `None` until a spacing was recorded
    pub fn observed_rate(&self) -> Option<f64> {
        if self.intervals.is_empty() {
            return None;
        }

        let total: Duration = self.intervals.iter().sum();
        let mean = total.as_secs_f64() / self.intervals.len() as f64;
        if mean > 0.0 {
            Some(1.0 / mean)
        } else {
            None
        }
    }

    /// Number of requests released so far
    pub fn requests(&self) -> usize {
        self.intervals.len()
    }
}
