//! Schedules reindex jobs when indexed records change.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use super::indexable::Indexable;
use super::types::{EntityType, ReindexJob};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("Job queue is closed")]
    QueueClosed,
    #[error("Job queue is full")]
    QueueFull,
}

/// The background job system consumed by the dispatcher.
///
/// Implementations deliver each accepted job at least once.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: ReindexJob) -> Result<(), DispatchError>;

    /// Puts a failed job back for another attempt. Unlike [`enqueue`](Self::enqueue)
    /// this may wait for capacity, so it fails only when the queue is gone.
    async fn requeue(&self, job: ReindexJob) -> Result<(), DispatchError> {
        self.enqueue(job).await
    }
}

/// Job queue backed by a bounded tokio channel drained by the index workers.
#[derive(Clone)]
pub struct ChannelJobQueue {
    sender: mpsc::Sender<ReindexJob>,
}

impl ChannelJobQueue {
    /// Creates the queue and the receiving end for
    /// [`spawn_index_workers`](super::spawn_index_workers).
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<ReindexJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl JobQueue for ChannelJobQueue {
    async fn enqueue(&self, job: ReindexJob) -> Result<(), DispatchError> {
        // Never wait for capacity: a mutation must not block on the index.
        self.sender.try_send(job).map_err(|err| match err {
            TrySendError::Full(_) => DispatchError::QueueFull,
            TrySendError::Closed(_) => DispatchError::QueueClosed,
        })
    }

    async fn requeue(&self, job: ReindexJob) -> Result<(), DispatchError> {
        self.sender
            .send(job)
            .await
            .map_err(|_| DispatchError::QueueClosed)
    }
}

/// Turns record mutations into reindex jobs.
#[derive(Clone)]
pub struct ChangeDispatcher {
    queue: Arc<dyn JobQueue>,
}

impl ChangeDispatcher {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self { queue }
    }

    /// Fire-and-forget: returns once the job is accepted, not when it has run.
    pub async fn schedule_reindex(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<(), DispatchError> {
        let job = ReindexJob::new(entity_type, entity_id);
        self.queue.enqueue(job).await?;
        debug!(job = %job, "Scheduled reindex");
        Ok(())
    }

    /// Schedules the job for a changed record.
    pub async fn record_changed<T: Indexable>(&self, record: &T) -> Result<(), DispatchError> {
        self.schedule_reindex(T::ENTITY_TYPE, record.entity_id())
            .await
    }
}

#[cfg(test)]
pub use recording::RecordingJobQueue;

#[cfg(test)]
mod recording {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Captures jobs instead of running them, so tests can drain and run them
    /// in any order.
    #[derive(Clone, Default)]
    pub struct RecordingJobQueue {
        jobs: Arc<Mutex<Vec<ReindexJob>>>,
        failure: Arc<Mutex<Option<DispatchError>>>,
    }

    #[allow(dead_code)]
    impl RecordingJobQueue {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_with(&self, error: DispatchError) {
            *self.failure.lock().unwrap() = Some(error);
        }

        pub fn jobs(&self) -> Vec<ReindexJob> {
            self.jobs.lock().unwrap().clone()
        }

        pub fn drain(&self) -> Vec<ReindexJob> {
            std::mem::take(&mut *self.jobs.lock().unwrap())
        }
    }

    #[async_trait]
    impl JobQueue for RecordingJobQueue {
        async fn enqueue(&self, job: ReindexJob) -> Result<(), DispatchError> {
            if let Some(error) = self.failure.lock().unwrap().clone() {
                return Err(error);
            }
            self.jobs.lock().unwrap().push(job);
            Ok(())
        }
    }
}
