//! Types for the fulfilment pipeline.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::queue::{QueueError, SendOptions};
use crate::storage::StorageError;
use crate::watermark::WatermarkError;

/// Settings the pipeline needs, lifted out of the full config.
#[derive(Debug, Clone)]
pub struct FulfillmentConfig {
    /// Bucket holding the source PDFs, keyed `{slug}.pdf`.
    pub source_bucket: String,
    /// Bucket receiving the watermarked archives, keyed `{orderId}.zip`.
    pub orders_bucket: String,
    /// Validity of the download link.
    pub url_expiry: Duration,
    /// Retry policy attached to the confirmation email job.
    pub confirmation_retry: SendOptions,
}

impl From<&Config> for FulfillmentConfig {
    fn from(config: &Config) -> Self {
        Self {
            source_bucket: config.storage.bucket_name.clone(),
            orders_bucket: config.storage.orders_bucket.clone(),
            url_expiry: Duration::from_secs(config.storage.url_expiry_secs),
            confirmation_retry: config.queue.confirmation_retry.clone(),
        }
    }
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Why a fulfilment attempt failed. The first failing step wins.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("Order has no items")]
    EmptyOrder,

    #[error("Failed to download PDF {slug}: {source}")]
    Download {
        slug: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to watermark PDFs: {0}")]
    Watermark(#[from] WatermarkError),

    #[error("Failed to upload archive: {0}")]
    Upload(#[source] StorageError),

    #[error("Failed to generate download URL: {0}")]
    Presign(#[source] StorageError),

    #[error("Failed to queue confirmation email: {0}")]
    Enqueue(#[from] QueueError),
}

impl FulfillmentError {
    /// Whether another attempt at the same order may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::EmptyOrder => false,
            Self::Download { source, .. } => source.is_retryable(),
            Self::Watermark(e) => e.is_retryable(),
            Self::Upload(e) | Self::Presign(e) => e.is_retryable(),
            Self::Enqueue(_) => true,
        }
    }
}

/// Outcome of one fulfilment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presigned_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Meaningful only when `success` is false.
    pub retryable: bool,
}

impl ProcessResult {
    pub fn succeeded(presigned_url: String) -> Self {
        Self {
            success: true,
            presigned_url: Some(presigned_url),
            error: None,
            retryable: false,
        }
    }

    pub fn failed(error: &FulfillmentError) -> Self {
        Self {
            success: false,
            presigned_url: None,
            error: Some(error.to_string()),
            retryable: error.is_retryable(),
        }
    }
}
