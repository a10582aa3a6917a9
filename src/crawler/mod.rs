//! Concurrent partitioned fetch-and-aggregate engine
//!
//! The id range is split into one segment per worker ([`segment`]); each
//! worker paces itself ([`rate_limit`]), walks its segment through the page
//! endpoint ([`fetcher`]) and sends a single report; the [`coordinator`]
//! merges the reports into a [`Summary`].

pub mod coordinator;
pub mod fetcher;
pub mod pool;
pub mod progress;
pub mod rate_limit;
pub mod segment;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use coordinator::{Coordinator, LoopEnd, ReportCollector};
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use pool::WorkerPool;
pub use rate_limit::RateLimiter;
pub use segment::partition;
pub use worker::Worker;

use crate::config::Settings;
use crate::error::Result;
use crate::models::Summary;

/// Mine the endpoint named in `settings` over HTTP
///
/// Triggering `cancel` stops the run early; a summary is still returned.
///
/// # Errors
///
/// Returns `Error::Config` for invalid settings and `Error::Fetch` if the
/// HTTP client cannot be built
pub async fn run(settings: Settings, cancel: CancellationToken) -> Result<Summary> {
    settings.validate()?;
    let fetcher = HttpPageFetcher::from_settings(&settings)?;

    Coordinator::new(settings, Arc::new(fetcher))
        .with_cancellation(cancel)
        .run()
        .await
}
