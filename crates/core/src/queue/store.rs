//! Job queue trait and errors.

use serde::Serialize;
use thiserror::Error;

use super::types::{Job, JobState, QueueCounts, SendOptions};

/// Error type for queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Queue was never created.
    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    /// Job does not exist.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Job cannot be settled from its current state.
    #[error("Job {job_id} is {state}, expected active")]
    NotActive { job_id: String, state: String },

    /// Payload could not be serialized.
    #[error("Failed to serialize payload: {0}")]
    Serialization(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for QueueError {
    fn from(e: rusqlite::Error) -> Self {
        QueueError::Database(e.to_string())
    }
}

/// Durable job storage with at-least-once delivery.
pub trait JobQueue: Send + Sync {
    /// Create a queue if it does not exist yet.
    fn create_queue(&self, name: &str) -> Result<(), QueueError>;

    /// Enqueue a raw JSON payload. Returns the new job id.
    fn send(&self, queue: &str, data: &str, options: &SendOptions) -> Result<String, QueueError>;

    /// Take the oldest deliverable job, marking it active.
    fn fetch(&self, queue: &str) -> Result<Option<Job>, QueueError>;

    /// Acknowledge an active job.
    fn complete(&self, job_id: &str) -> Result<(), QueueError>;

    /// Negatively acknowledge an active job. The job goes back to the queue
    /// while retries remain, otherwise it is marked failed. Returns the new state.
    fn fail(&self, job_id: &str, error: &str) -> Result<JobState, QueueError>;

    /// Settle an active job as failed without any retry.
    fn discard(&self, job_id: &str, error: &str) -> Result<(), QueueError>;

    /// Return every active job to the queue. Used at startup, when no job can
    /// legitimately be in flight.
    fn release_active(&self) -> Result<usize, QueueError>;

    /// Get a job by id.
    fn get(&self, job_id: &str) -> Result<Option<Job>, QueueError>;

    /// Count jobs per state in a queue.
    fn counts(&self, queue: &str) -> Result<QueueCounts, QueueError>;
}

/// Serialize `payload` and send it to `queue`.
pub fn enqueue<T: Serialize>(
    jobs: &dyn JobQueue,
    queue: &str,
    payload: &T,
    options: &SendOptions,
) -> Result<String, QueueError> {
    let data =
        serde_json::to_string(payload).map_err(|e| QueueError::Serialization(e.to_string()))?;
    jobs.send(queue, &data, options)
}
