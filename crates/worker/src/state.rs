use std::sync::Arc;

use fulfillment_core::{
    Config, JobQueue, QueueCounts, QueueError, SanitizedConfig, CONFIRMATION_EMAILS_QUEUE,
    ORDERS_QUEUE, ORDER_CONFIRMATIONS_QUEUE,
};

/// Queues the worker consumes, in the order they are reported.
pub const QUEUES: [&str; 3] = [
    ORDERS_QUEUE,
    CONFIRMATION_EMAILS_QUEUE,
    ORDER_CONFIRMATIONS_QUEUE,
];

/// Shared application state
pub struct AppState {
    config: Config,
    jobs: Arc<dyn JobQueue>,
}

impl AppState {
    pub fn new(config: Config, jobs: Arc<dyn JobQueue>) -> Self {
        Self { config, jobs }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn jobs(&self) -> &dyn JobQueue {
        self.jobs.as_ref()
    }

    /// Current job counts for every consumed queue.
    pub fn queue_counts(&self) -> Vec<(&'static str, Result<QueueCounts, QueueError>)> {
        QUEUES
            .iter()
            .map(|queue| (*queue, self.jobs.counts(queue)))
            .collect()
    }
}
