//! Error types for the storage module.

use thiserror::Error;

/// Errors that can occur while talking to the object store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The object does not exist.
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// The request failed (transport, auth or service error).
    #[error("Storage request failed: {reason}")]
    RequestFailed { reason: String },

    /// The response body could not be read to completion.
    #[error("Failed to read object body: {reason}")]
    BodyFailed { reason: String },

    /// A presigned URL could not be generated.
    #[error("Failed to presign URL: {reason}")]
    PresignFailed { reason: String },

    /// Local file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn request_failed(reason: impl Into<String>) -> Self {
        Self::RequestFailed {
            reason: reason.into(),
        }
    }

    pub fn body_failed(reason: impl Into<String>) -> Self {
        Self::BodyFailed {
            reason: reason.into(),
        }
    }

    pub fn presign_failed(reason: impl Into<String>) -> Self {
        Self::PresignFailed {
            reason: reason.into(),
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// A missing object or a bad presign configuration won't fix itself.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed { .. } | Self::BodyFailed { .. } | Self::Io(_)
        )
    }
}
