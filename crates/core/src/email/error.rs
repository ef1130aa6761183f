use thiserror::Error;

/// Errors returned by a mailer.
#[derive(Debug, Error)]
pub enum MailerError {
    /// The provider refused the message.
    #[error("Email provider rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request did not complete in time.
    #[error("Email request timed out")]
    Timeout,

    /// The provider could not be reached.
    #[error("Email provider unreachable: {reason}")]
    Connection { reason: String },

    /// The template could not be rendered.
    #[error("Failed to render email: {reason}")]
    Render { reason: String },
}

impl MailerError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Connection {
                reason: e.to_string(),
            }
        }
    }

    /// Throttling, server errors and transport failures are worth retrying.
    /// Any other rejection (bad address, bad sender) is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout | Self::Connection { .. } => true,
            Self::Render { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let throttled = MailerError::Rejected {
            status: 429,
            message: "rate limited".into(),
        };
        let invalid = MailerError::Rejected {
            status: 422,
            message: "invalid `to` field".into(),
        };
        assert!(throttled.is_retryable());
        assert!(!invalid.is_retryable());
        assert!(MailerError::Timeout.is_retryable());
        assert!(!MailerError::Render {
            reason: "missing block".into()
        }
        .is_retryable());
    }
}
