//! Segment worker
//!
//! A worker walks its segment page by page, following the server's cursor,
//! and tallies foods and categories of every record below the segment end.
//! However the walk ends (segment done, fetch failure, cancellation) the
//! worker sends exactly one [`WorkerReport`] with whatever it has counted.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::fetcher::PageFetcher;
use super::progress::ProgressLog;
use super::rate_limit::RateLimiter;
use crate::config::Settings;
use crate::error::LifestatsErrorTrait;
use crate::models::{FoodRecord, FrequencyReport, Segment, WorkerOutcome, WorkerReport};
use crate::utils::error::{ConfigError, CrawlerError};

/// Miner for one segment of the id range
pub struct Worker {
    id: usize,
    segment: Segment,
    page_size: u32,
    fetcher: Arc<dyn PageFetcher>,
    rate_limiter: RateLimiter,
    progress: ProgressLog,
    frequencies: FrequencyReport,
    pages_fetched: u64,
    reports: mpsc::Sender<WorkerReport>,
    cancel: CancellationToken,
}

impl Worker {
    /// Create a worker for `segment`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the settings do not yield a valid request rate
    pub fn new(
        id: usize,
        segment: Segment,
        settings: &Settings,
        fetcher: Arc<dyn PageFetcher>,
        reports: mpsc::Sender<WorkerReport>,
        cancel: CancellationToken,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            id,
            segment,
            page_size: settings.results_per_page,
            fetcher,
            rate_limiter: RateLimiter::new(settings.rate_limit, settings.pool_size)?,
            progress: ProgressLog::new(
                id,
                segment,
                settings.results_per_page,
                settings.log_interval(),
            ),
            frequencies: FrequencyReport::new(),
            pages_fetched: 0,
            reports,
            cancel,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    /// Walk the segment, then send the single report
    pub async fn run(mut self) -> WorkerOutcome {
        tracing::debug!(
            worker_id = self.id,
            begin = self.segment.begin,
            end = self.segment.end,
            "Worker starting"
        );

        let outcome = match self.paginate().await {
            Ok(()) => WorkerOutcome::Completed,
            Err(CrawlerError::Cancelled) => {
                tracing::info!(worker_id = self.id, "Worker cancelled");
                WorkerOutcome::Cancelled
            }
            Err(CrawlerError::Fetch(e)) => {
                tracing::warn!(
                    worker_id = self.id,
                    pages = self.pages_fetched,
                    category = e.category().as_str(),
                    error = %e,
                    "Fetch failed, reporting partial tallies"
                );
                WorkerOutcome::Failed
            }
        };

        self.send_report(outcome).await;
        outcome
    }

    async fn paginate(&mut self) -> Result<(), CrawlerError> {
        let cancel = self.cancel.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let mut cursor = Some(self.segment.begin);

        self.rate_limiter.start();

        while let Some(offset) = cursor.filter(|offset| *offset < self.segment.end) {
            self.rate_limiter.limit(&cancel).await?;

            let page = tokio::select! {
                _ = cancel.cancelled() => return Err(CrawlerError::Cancelled),
                page = fetcher.fetch(offset, self.page_size) => page?,
            };

            self.tally(&page.records);
            self.pages_fetched += 1;
            self.progress
                .page_done(offset, self.rate_limiter.observed_rate());

            cursor = match page.next_offset {
                Some(next) if next <= offset => {
                    tracing::warn!(
                        worker_id = self.id,
                        offset,
                        next,
                        "Cursor did not advance, stopping"
                    );
                    None
                }
                next => next,
            };
        }

        Ok(())
    }

    /// Count records below the segment end; later ids belong to the next worker
    fn tally(&mut self, records: &[FoodRecord]) {
        for record in records.iter().filter(|r| r.id < self.segment.end) {
            self.frequencies.record(record);
        }
    }

    async fn send_report(&mut self, outcome: WorkerOutcome) {
        let report = WorkerReport {
            worker_id: self.id,
            segment: self.segment,
            outcome,
            pages_fetched: self.pages_fetched,
            frequencies: std::mem::take(&mut self.frequencies),
        };

        tracing::debug!(
            worker_id = self.id,
            outcome = outcome.as_str(),
            pages = report.pages_fetched,
            records = report.frequencies.total(),
            "Sending report"
        );

        if self.reports.send(report).await.is_err() {
            tracing::warn!(worker_id = self.id, "Coordinator gone, report dropped");
        }
    }
}
