//! Generic queue consumer loop.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::handler::{HandlerError, JobHandler};
use crate::metrics;
use crate::queue::{JobQueue, JobState, QueueError};

/// What happened to a job after one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Handled successfully and completed.
    Acknowledged,
    /// Failed and went back to the queue for another attempt.
    Requeued,
    /// Failed with no retries left.
    RetriesExhausted,
    /// Undecodable or terminally failed; never retried.
    Discarded,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Acknowledged => "acknowledged",
            Disposition::Requeued => "requeued",
            Disposition::RetriesExhausted => "exhausted",
            Disposition::Discarded => "discarded",
        }
    }
}

/// Pulls jobs from one queue and feeds them to a handler, one at a time.
pub struct QueueConsumer<H: JobHandler> {
    queue: String,
    jobs: Arc<dyn JobQueue>,
    handler: H,
    poll_interval: Duration,
}

impl<H: JobHandler> QueueConsumer<H> {
    pub fn new(
        queue: impl Into<String>,
        jobs: Arc<dyn JobQueue>,
        handler: H,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue: queue.into(),
            jobs,
            handler,
            poll_interval,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Take one job, handle it and settle it.
    ///
    /// Returns `Ok(None)` when nothing is deliverable.
    pub async fn process_next(&self) -> Result<Option<Disposition>, QueueError> {
        let Some(job) = self.jobs.fetch(&self.queue)? else {
            return Ok(None);
        };

        let start = Instant::now();
        info!(
            queue = %self.queue,
            job_id = %job.id,
            attempt = job.retry_count + 1,
            handler = self.handler.name(),
            "Processing job"
        );

        let payload: H::Payload = match serde_json::from_str(&job.data) {
            Ok(payload) => payload,
            Err(e) => {
                let reason = format!("Malformed payload: {}", e);
                error!(queue = %self.queue, job_id = %job.id, error = %e, "Discarding malformed job");
                self.jobs.discard(&job.id, &reason)?;
                return Ok(Some(self.record(Disposition::Discarded, start)));
            }
        };

        let disposition = match self.handler.handle(payload).await {
            Ok(()) => {
                self.jobs.complete(&job.id)?;
                info!(queue = %self.queue, job_id = %job.id, "Job completed");
                Disposition::Acknowledged
            }
            Err(HandlerError::Retryable(reason)) => match self.jobs.fail(&job.id, &reason)? {
                JobState::Retry => {
                    warn!(
                        queue = %self.queue,
                        job_id = %job.id,
                        error = %reason,
                        "Job failed, will be retried"
                    );
                    Disposition::Requeued
                }
                _ => {
                    error!(
                        queue = %self.queue,
                        job_id = %job.id,
                        error = %reason,
                        retries = job.retry_count,
                        "Job failed, no retries left"
                    );
                    Disposition::RetriesExhausted
                }
            },
            Err(HandlerError::Terminal(reason)) => {
                error!(
                    queue = %self.queue,
                    job_id = %job.id,
                    error = %reason,
                    "Job failed permanently"
                );
                self.jobs.discard(&job.id, &reason)?;
                Disposition::Discarded
            }
        };

        Ok(Some(self.record(disposition, start)))
    }

    fn record(&self, disposition: Disposition, start: Instant) -> Disposition {
        metrics::JOBS_PROCESSED
            .with_label_values(&[self.queue.as_str(), disposition.as_str()])
            .inc();
        metrics::JOB_DURATION
            .with_label_values(&[self.queue.as_str()])
            .observe(start.elapsed().as_secs_f64());
        disposition
    }

    /// Consume until `shutdown` is cancelled.
    ///
    /// Cancellation is only observed between jobs, so an in-flight job is
    /// always settled before this returns.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(queue = %self.queue, handler = self.handler.name(), "Consumer started");

        while !shutdown.is_cancelled() {
            match self.process_next().await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => {
                    error!(queue = %self.queue, error = %e, "Queue error, backing off");
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        debug!(queue = %self.queue, "Consumer received shutdown signal");
        info!(queue = %self.queue, "Consumer stopped");
    }
}
