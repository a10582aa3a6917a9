//! Throttled per-worker progress reporting

use std::time::Duration;
use tokio::time::Instant;

use crate::models::Segment;
use crate::utils::percent_floor;

/// Emits at most one progress line per `span` for one worker
#[derive(Debug)]
pub struct ProgressLog {
    worker_id: usize,
    span: Duration,
    total_pages: u64,
    pages: u64,
    last_emit: Instant,
}

impl ProgressLog {
    pub fn new(worker_id: usize, segment: Segment, page_size: u32, span: Duration) -> Self {
        Self {
            worker_id,
            span,
            total_pages: segment.page_count(page_size),
            pages: 0,
            last_emit: Instant::now(),
        }
    }

    /// Count one processed page and log if the span has elapsed
    ///
    /// Returns the percentage that was logged, if a line was emitted.
    pub fn page_done(&mut self, offset: u64, req_per_sec: Option<f64>) -> Option<u8> {
        self.pages += 1;

        if self.last_emit.elapsed() < self.span {
            return None;
        }
        self.last_emit = Instant::now();

        let progress = self.percent();
        match req_per_sec {
            Some(rate) => tracing::info!(
                worker_id = self.worker_id,
                offset,
                progress,
                req_per_sec = rate,
                "worker {}: {}% - {:.2} req/sec",
                self.worker_id,
                progress,
                rate
            ),
            None => tracing::info!(
                worker_id = self.worker_id,
                offset,
                progress,
                "worker {}: {}%",
                self.worker_id,
                progress
            ),
        }

        Some(progress)
    }

    /// Floored percentage of pages processed
    pub fn percent(&self) -> u8 {
        percent_floor(self.pages, self.total_pages)
    }

    /// Pages processed so far
    pub fn pages(&self) -> u64 {
        self.pages
    }
}
