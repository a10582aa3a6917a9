//! Run coordinator
//!
//! The coordinator partitions the id range, starts the worker pool and merges
//! worker reports as they arrive. Merging is a plain sum, so arrival order does
//! not matter.
//!
//! # Shutdown
//!
//! - Normal: once every worker has reported, join the pool.
//! - Cancelled: stop waiting, merge whatever reports are already queued, keep
//!   receiving for at most the configured grace period, then abort the
//!   workers still running. Their reports are lost and counted in
//!   [`Summary::lost_workers`].
//!
//! Either way a [`Summary`] is produced.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::fetcher::PageFetcher;
use super::pool::WorkerPool;
use super::segment::partition;
use crate::config::Settings;
use crate::error::Result;
use crate::models::{AggregateResult, RunStats, Summary, WorkerOutcome, WorkerReport};

/// Why the report loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEnd {
    /// Every worker reported
    AllReported,
    /// Cancellation was requested
    Cancelled,
    /// All senders are gone while reports were still outstanding
    ChannelClosed,
}

/// Coordinator-owned merge state: running totals and the active-worker count
#[derive(Debug, Default)]
pub struct ReportCollector {
    aggregate: AggregateResult,
    active_workers: usize,
    failed_workers: usize,
    cancelled_workers: usize,
}

impl ReportCollector {
    /// Expect one report from each of `workers` workers
    pub fn new(workers: usize) -> Self {
        Self {
            active_workers: workers,
            ..Self::default()
        }
    }

    /// Merge one report and mark its worker as done
    pub fn accept(&mut self, report: WorkerReport) {
        self.aggregate.merge(&report.frequencies);
        self.active_workers = self.active_workers.saturating_sub(1);

        match report.outcome {
            WorkerOutcome::Completed => {}
            WorkerOutcome::Failed => self.failed_workers += 1,
            WorkerOutcome::Cancelled => self.cancelled_workers += 1,
        }

        tracing::info!(
            worker_id = report.worker_id,
            outcome = report.outcome.as_str(),
            pages = report.pages_fetched,
            records = report.frequencies.total(),
            remaining = self.active_workers,
            "Report received"
        );
    }

    /// Receive reports until all workers reported, or `cancel` fires
    pub async fn collect(
        &mut self,
        reports: &mut mpsc::Receiver<WorkerReport>,
        cancel: &CancellationToken,
    ) -> LoopEnd {
        while self.any_active() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return LoopEnd::Cancelled,
                report = reports.recv() => match report {
                    Some(report) => self.accept(report),
                    None => {
                        tracing::error!(
                            outstanding = self.active_workers,
                            "Report channel closed before every worker reported"
                        );
                        return LoopEnd::ChannelClosed;
                    }
                },
            }
        }
        LoopEnd::AllReported
    }

    /// Merge every report already queued, without waiting
    ///
    /// Returns how many reports were merged.
    pub fn drain_queued(&mut self, reports: &mut mpsc::Receiver<WorkerReport>) -> usize {
        let mut drained = 0;
        while let Ok(report) = reports.try_recv() {
            self.accept(report);
            drained += 1;
        }
        drained
    }

    /// Keep receiving until all workers reported or `deadline` passes
    pub async fn collect_until(
        &mut self,
        reports: &mut mpsc::Receiver<WorkerReport>,
        deadline: Instant,
    ) {
        while self.any_active() {
            match tokio::time::timeout_at(deadline, reports.recv()).await {
                Ok(Some(report)) => self.accept(report),
                Ok(None) | Err(_) => break,
            }
        }
    }

    /// Workers whose report has not arrived
    pub fn active(&self) -> usize {
        self.active_workers
    }

    pub fn any_active(&self) -> bool {
        self.active_workers > 0
    }

    pub fn aggregate(&self) -> &AggregateResult {
        &self.aggregate
    }
}

/// Drives one mining run over an injected page source
pub struct Coordinator {
    settings: Arc<Settings>,
    fetcher: Arc<dyn PageFetcher>,
    cancel: CancellationToken,
}

impl Coordinator {
    pub fn new(settings: Settings, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            settings: Arc::new(settings),
            fetcher,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this run when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mine the configured id range and summarize it
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for invalid settings, before any worker starts.
    /// Fetch failures and cancellation never produce an error.
    pub async fn run(&self) -> Result<Summary> {
        let settings = &self.settings;
        settings.validate()?;
        let segments = partition(settings.first_id, settings.last_id, settings.pool_size)?;

        let mut stats = RunStats::start();

        tracing::info!(
            first_id = settings.first_id,
            last_id = settings.last_id,
            workers = segments.len(),
            rate_limit = settings.rate_limit,
            results_per_page = settings.results_per_page,
            "Starting run"
        );

        // Each worker sends exactly once, so a channel this size never blocks
        let (tx, mut rx) = mpsc::channel(segments.len());
        let pool = WorkerPool::start(
            settings,
            &segments,
            Arc::clone(&self.fetcher),
            tx,
            &self.cancel,
        )?;

        let mut collector = ReportCollector::new(pool.len());
        let end = collector.collect(&mut rx, &self.cancel).await;

        let cancelled = end == LoopEnd::Cancelled;
        if cancelled {
            let drained = collector.drain_queued(&mut rx);
            tracing::warn!(drained, outstanding = collector.active(), "Run cancelled");

            let grace = settings.shutdown_grace();
            if !grace.is_zero() {
                collector
                    .collect_until(&mut rx, Instant::now() + grace)
                    .await;
            }
            pool.terminate_all().await;
        } else {
            pool.shutdown().await;
        }

        let end_time = stats.finish();
        let summary = self.finalize(&collector, stats, segments.len(), cancelled, end_time);

        tracing::info!(
            reports = summary.reports_received,
            failed = summary.failed_workers,
            lost = summary.lost_workers,
            partial = summary.partial,
            "Run finished"
        );

        Ok(summary)
    }

    fn finalize(
        &self,
        collector: &ReportCollector,
        stats: RunStats,
        workers: usize,
        cancelled: bool,
        end_time: chrono::DateTime<chrono::Utc>,
    ) -> Summary {
        let aggregate = collector.aggregate();
        let lost_workers = collector.active();

        Summary {
            top_primary: aggregate.top_primary(self.settings.top_n_primary),
            top_secondary: aggregate.top_secondary(self.settings.top_n_secondary),
            start_time: stats.start_time,
            end_time,
            workers,
            reports_received: aggregate.reports(),
            failed_workers: collector.failed_workers,
            cancelled_workers: collector.cancelled_workers,
            lost_workers,
            cancelled,
            partial: collector.failed_workers > 0
                || collector.cancelled_workers > 0
                || lost_workers > 0,
        }
    }
}
