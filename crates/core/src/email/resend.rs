//! Resend email API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::MailerError;
use super::traits::Mailer;
use super::types::OutgoingEmail;
use crate::config::EmailConfig;

pub struct ResendMailer {
    client: Client,
    api_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

impl ResendMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, MailerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(MailerError::from_reqwest)?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    fn name(&self) -> &str {
        "resend"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<String, MailerError> {
        let url = format!("{}/emails", self.api_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .map_err(MailerError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(text);
            return Err(MailerError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        // A 2xx means the message is queued for delivery. An unreadable body
        // must not turn that into a failure, or the retry would send it twice.
        match response.json::<SendResponse>().await {
            Ok(body) => {
                debug!(email_id = %body.id, to = %email.to, "Email accepted by provider");
                Ok(body.id)
            }
            Err(e) => {
                warn!(error = %e, to = %email.to, "Email accepted but response was unreadable");
                Ok(String::new())
            }
        }
    }
}
