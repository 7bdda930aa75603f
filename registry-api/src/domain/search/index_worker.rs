//! Background workers draining the reindex job queue.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{error, info, warn};

use super::dispatcher::JobQueue;
use super::indexer::SearchIndexer;
use super::types::{ReindexJob, ReindexOutcome};

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_count: usize,
    /// Deliveries per job before it is dropped
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on every further attempt
    pub retry_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            max_attempts: 5,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl WorkerConfig {
    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

/// Spawns `worker_count` tasks sharing one receiver.
///
/// Failed jobs are put back on `retry_queue` after a backoff until
/// `max_attempts` is reached. Workers exit once the channel is closed and empty.
pub fn spawn_index_workers(
    receiver: mpsc::Receiver<ReindexJob>,
    retry_queue: Arc<dyn JobQueue>,
    indexer: Arc<SearchIndexer>,
    config: WorkerConfig,
) -> Vec<JoinHandle<()>> {
    info!(
        workers = config.worker_count,
        max_attempts = config.max_attempts,
        "Search index workers started"
    );

    let receiver = Arc::new(Mutex::new(receiver));
    (0..config.worker_count.max(1))
        .map(|worker| {
            let receiver = receiver.clone();
            let retry_queue = retry_queue.clone();
            let indexer = indexer.clone();
            let config = config.clone();
            tokio::spawn(async move {
                loop {
                    // Hold the lock only while waiting for the next job.
                    let job = receiver.lock().await.recv().await;
                    let Some(job) = job else {
                        info!(worker, "Job queue closed, index worker stopping");
                        break;
                    };
                    run_job(job, &indexer, &retry_queue, &config).await;
                }
            })
        })
        .collect()
}

/// Runs one job and schedules a retry if it failed.
pub async fn run_job(
    job: ReindexJob,
    indexer: &SearchIndexer,
    retry_queue: &Arc<dyn JobQueue>,
    config: &WorkerConfig,
) -> Option<ReindexOutcome> {
    let err = match indexer.reindex(&job).await {
        Ok(outcome) => return Some(outcome),
        Err(err) => err,
    };

    let next = job.next_attempt();
    if next.attempt >= config.max_attempts {
        error!(
            job = %job,
            attempts = next.attempt,
            error = %err,
            "Reindex job failed, giving up"
        );
        return None;
    }

    let delay = config.backoff(job.attempt);
    warn!(
        job = %job,
        attempt = next.attempt + 1,
        max_attempts = config.max_attempts,
        delay_ms = delay.as_millis() as u64,
        error = %err,
        "Reindex job failed, retrying"
    );

    let retry_queue = retry_queue.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(err) = retry_queue.requeue(next).await {
            error!(job = %next, error = %err, "Could not requeue reindex job");
        }
    });
    None
}
