//! Mock mailer for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::email::{Mailer, MailerError, OutgoingEmail};

/// Mock implementation of the Mailer trait. Records every accepted message.
#[derive(Debug, Default)]
pub struct MockMailer {
    sent: Arc<RwLock<Vec<OutgoingEmail>>>,
    next_error: Arc<RwLock<Option<MailerError>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the next send to fail with the given error.
    pub async fn set_next_error(&self, error: MailerError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.read().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.read().await.len()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<String, MailerError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let mut sent = self.sent.write().await;
        sent.push(email.clone());
        Ok(format!("mock-email-{}", sent.len()))
    }
}
