//! Worker pool
//!
//! Spawns one task per segment on the multi-threaded runtime. `shutdown`
//! waits for every worker to exit; `terminate_all` aborts the ones still
//! running.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::fetcher::PageFetcher;
use super::worker::Worker;
use crate::config::Settings;
use crate::models::{Segment, WorkerOutcome, WorkerReport};
use crate::utils::error::ConfigError;

/// Running workers of one mining run
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerOutcome>>,
}

impl WorkerPool {
    /// Spawn one worker per segment, all sharing `fetcher` and `reports`
    ///
    /// Every worker is built before the first one is spawned, so a settings
    /// error never leaves a partial pool behind.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a worker cannot be built from `settings`
    pub fn start(
        settings: &Settings,
        segments: &[Segment],
        fetcher: Arc<dyn PageFetcher>,
        reports: mpsc::Sender<WorkerReport>,
        cancel: &CancellationToken,
    ) -> Result<Self, ConfigError> {
        let workers = segments
            .iter()
            .enumerate()
            .map(|(id, segment)| {
                Worker::new(
                    id,
                    *segment,
                    settings,
                    Arc::clone(&fetcher),
                    reports.clone(),
                    cancel.child_token(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let handles: Vec<_> = workers
            .into_iter()
            .map(|worker| tokio::spawn(worker.run()))
            .collect();

        tracing::info!(workers = handles.len(), "Worker pool started");

        Ok(Self { handles })
    }

    /// Number of workers spawned
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to exit
    pub async fn shutdown(self) {
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Worker task failed");
            }
        }
    }

    /// Abort every worker that is still running and wait for them to stop
    ///
    /// Returns how many workers were aborted. Their unsent reports are lost.
    pub async fn terminate_all(self) -> usize {
        let mut aborted = 0;
        for handle in &self.handles {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }

        for result in futures::future::join_all(self.handles).await {
            match result {
                Err(e) if !e.is_cancelled() => {
                    tracing::error!(error = %e, "Worker task failed");
                }
                _ => {}
            }
        }

        if aborted > 0 {
            tracing::warn!(aborted, "Terminated running workers");
        }
        aborted
    }
}
