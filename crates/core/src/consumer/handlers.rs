//! Handlers for the three worker queues.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::handler::{HandlerError, JobHandler};
use crate::email::{templates, Mailer, MailerError, RenderedEmail};
use crate::fulfillment::OrderFulfiller;
use crate::messages::{EmailConfirmationMessage, OrderConfirmationMessage, OrderMessage};
use crate::metrics;
use crate::storage::ObjectStorage;
use crate::watermark::Watermarker;

/// `orders`: run the fulfilment pipeline.
pub struct OrderHandler<S: ObjectStorage, W: Watermarker> {
    fulfiller: Arc<OrderFulfiller<S, W>>,
}

impl<S: ObjectStorage, W: Watermarker> OrderHandler<S, W> {
    pub fn new(fulfiller: Arc<OrderFulfiller<S, W>>) -> Self {
        Self { fulfiller }
    }
}

#[async_trait]
impl<S: ObjectStorage + 'static, W: Watermarker + 'static> JobHandler for OrderHandler<S, W> {
    type Payload = OrderMessage;

    fn name(&self) -> &str {
        "order"
    }

    async fn handle(&self, order: OrderMessage) -> Result<(), HandlerError> {
        let result = self.fulfiller.process_order(&order).await;
        if result.success {
            return Ok(());
        }

        let message = result
            .error
            .unwrap_or_else(|| "Order processing failed".to_string());
        Err(HandlerError::classify(result.retryable, message))
    }
}

async fn deliver<M: Mailer>(
    mailer: &M,
    from: &str,
    to: &str,
    rendered: Result<RenderedEmail, MailerError>,
    template: &str,
    order_id: &str,
) -> Result<(), HandlerError> {
    let email = rendered
        .map_err(|e| HandlerError::Terminal(e.to_string()))?
        .into_outgoing(from, to);
    let email_id = mailer
        .send(&email)
        .await
        .map_err(|e| HandlerError::classify(e.is_retryable(), e.to_string()))?;

    metrics::EMAILS_SENT.with_label_values(&[template]).inc();
    info!(order_id, to, email_id = %email_id, template, "Email sent");
    Ok(())
}

/// `confirmation_emails`: tell the customer their download is ready.
pub struct DownloadReadyHandler<M: Mailer> {
    mailer: Arc<M>,
    from: String,
}

impl<M: Mailer> DownloadReadyHandler<M> {
    pub fn new(mailer: Arc<M>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
        }
    }
}

#[async_trait]
impl<M: Mailer + 'static> JobHandler for DownloadReadyHandler<M> {
    type Payload = EmailConfirmationMessage;

    fn name(&self) -> &str {
        "download_ready"
    }

    async fn handle(&self, message: EmailConfirmationMessage) -> Result<(), HandlerError> {
        deliver(
            self.mailer.as_ref(),
            &self.from,
            &message.customer_email,
            templates::download_ready(&message),
            "download_ready",
            &message.order_id,
        )
        .await
    }
}

/// `confirmations`: acknowledge a received payment.
pub struct OrderConfirmationHandler<M: Mailer> {
    mailer: Arc<M>,
    from: String,
}

impl<M: Mailer> OrderConfirmationHandler<M> {
    pub fn new(mailer: Arc<M>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
        }
    }
}

#[async_trait]
impl<M: Mailer + 'static> JobHandler for OrderConfirmationHandler<M> {
    type Payload = OrderConfirmationMessage;

    fn name(&self) -> &str {
        "order_confirmation"
    }

    async fn handle(&self, message: OrderConfirmationMessage) -> Result<(), HandlerError> {
        deliver(
            self.mailer.as_ref(),
            &self.from,
            &message.customer_email,
            templates::order_confirmation(&message),
            "order_confirmation",
            &message.order_id,
        )
        .await
    }
}
