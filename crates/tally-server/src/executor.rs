//! Worker pool for concurrent workloads.
//!
//! Every job runs as its own tokio task on the multi-threaded runtime, so
//! jobs contend for the core locks from different OS threads. The pool
//! waits for all of them up to a join deadline; stragglers are aborted,
//! which drops any lock they hold.

use std::{future::Future, time::Duration};

use tally_core::CoreError;
use tokio::task::JoinSet;

use crate::error::ServerError;

/// Outcome of one pool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReport<T> {
    /// Results of jobs that succeeded, in completion order.
    pub succeeded: Vec<T>,
    /// Errors of jobs that failed, in completion order.
    pub failed: Vec<CoreError>,
    /// Jobs still running at the deadline (aborted).
    pub unfinished: usize,
}

impl<T> Default for PoolReport<T> {
    fn default() -> Self {
        Self { succeeded: Vec::new(), failed: Vec::new(), unfinished: 0 }
    }
}

/// Runs batches of jobs concurrently and joins them.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    join_timeout: Duration,
}

impl WorkerPool {
    /// Create a pool that waits at most `join_timeout` for a batch.
    pub fn new(join_timeout: Duration) -> Self {
        Self { join_timeout }
    }

    /// Spawn every job, then join them.
    ///
    /// Operation errors are collected in the report. A job that panics
    /// fails the whole run.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Worker` if a job panicked.
    pub async fn run<T, F>(
        &self,
        jobs: impl IntoIterator<Item = F>,
    ) -> Result<PoolReport<T>, ServerError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let mut workers = JoinSet::new();
        for job in jobs {
            workers.spawn(job);
        }
        tracing::debug!(jobs = workers.len(), "submitted jobs");

        let deadline = tokio::time::Instant::now() + self.join_timeout;
        let mut report = PoolReport::default();

        loop {
            match tokio::time::timeout_at(deadline, workers.join_next()).await {
                Ok(Some(joined)) => match joined? {
                    Ok(value) => report.succeeded.push(value),
                    Err(err) => {
                        tracing::warn!(error = %err, "job failed");
                        report.failed.push(err);
                    },
                },
                Ok(None) => break,
                Err(_) => {
                    report.unfinished = workers.len();
                    tracing::warn!(
                        unfinished = report.unfinished,
                        "join deadline passed, aborting jobs"
                    );
                    workers.shutdown().await;
                    break;
                },
            }
        }

        Ok(report)
    }
}
