use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// How a handler failed, which decides what happens to the job.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// Put the job back; the queue's retry policy applies.
    #[error("{0}")]
    Retryable(String),

    /// Fail the job for good.
    #[error("{0}")]
    Terminal(String),
}

impl HandlerError {
    /// Classify an error by its own retryability.
    pub fn classify(retryable: bool, message: impl Into<String>) -> Self {
        if retryable {
            Self::Retryable(message.into())
        } else {
            Self::Terminal(message.into())
        }
    }
}

/// Processes the decoded payload of one job.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Payload type the job's JSON decodes into.
    type Payload: DeserializeOwned + Send + 'static;

    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn handle(&self, payload: Self::Payload) -> Result<(), HandlerError>;
}
