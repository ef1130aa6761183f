use async_trait::async_trait;

use super::error::MailerError;
use super::types::OutgoingEmail;

/// Transactional email delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Returns the name of this mailer implementation.
    fn name(&self) -> &str;

    /// Send one message. Returns the provider's message id.
    async fn send(&self, email: &OutgoingEmail) -> Result<String, MailerError>;
}
