//! Error types for the watermark module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while watermarking an order.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// Nothing to watermark.
    #[error("No input files provided")]
    NoInputFiles,

    /// An input PDF could not be opened.
    #[error("Failed to read input file {path}: {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The service answered with a non-success status.
    #[error("Watermark service responded with {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The service accepted the request but sent no archive.
    #[error("No response body from watermark service")]
    EmptyResponse,

    /// The request did not complete in time.
    #[error("Watermark request timed out")]
    Timeout,

    /// The service could not be reached or the connection dropped.
    #[error("Watermark service unreachable: {reason}")]
    Connection { reason: String },

    /// Local file I/O failed while writing the archive.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatermarkError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Connection {
                reason: e.to_string(),
            }
        }
    }

    /// Whether this error is retryable.
    ///
    /// Server errors, throttling and transport failures are; a 4xx means the
    /// request itself is bad and will be rejected again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::EmptyResponse | Self::Timeout | Self::Connection { .. } | Self::Io(_) => true,
            Self::InputUnreadable { .. } => true,
            Self::NoInputFiles => false,
        }
    }
}
