//! Queue payloads exchanged between the storefront and the worker.
//!
//! All payloads are camelCase JSON. Amounts are integer minor units
//! (centavos), never floats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Queue carrying paid orders to fulfil.
pub const ORDERS_QUEUE: &str = "orders";

/// Queue carrying "download ready" notifications produced by fulfilment.
pub const CONFIRMATION_EMAILS_QUEUE: &str = "confirmation_emails";

/// Queue carrying "payment received" notifications produced by the webhook.
pub const ORDER_CONFIRMATIONS_QUEUE: &str = "confirmations";

/// One purchased line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_slug: String,
    pub quantity: u32,
    /// Unit price in minor units.
    pub price: i64,
}

/// A paid order, enqueued by the checkout webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMessage {
    pub order_id: String,
    pub customer_email: String,
    pub items: Vec<OrderItem>,
    pub total: i64,
    pub timestamp: String,
}

fn distinct_slugs(items: &[OrderItem]) -> Vec<&str> {
    let mut slugs: Vec<&str> = Vec::with_capacity(items.len());
    for item in items {
        if !slugs.contains(&item.product_slug.as_str()) {
            slugs.push(&item.product_slug);
        }
    }
    slugs
}

impl OrderMessage {
    /// Distinct product slugs in first-seen order.
    pub fn distinct_slugs(&self) -> Vec<&str> {
        distinct_slugs(&self.items)
    }
}

/// Produced by a successful fulfilment; carries the time-limited download link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfirmationMessage {
    pub order_id: String,
    pub customer_email: String,
    pub presigned_url: String,
    pub expires_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub total: i64,
    pub timestamp: String,
}

impl EmailConfirmationMessage {
    /// Distinct product slugs in first-seen order.
    pub fn distinct_slugs(&self) -> Vec<&str> {
        distinct_slugs(&self.items)
    }

    pub fn from_order(
        order: &OrderMessage,
        presigned_url: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: order.order_id.clone(),
            customer_email: order.customer_email.clone(),
            presigned_url,
            expires_at,
            items: order.items.clone(),
            total: order.total,
            timestamp: order.timestamp.clone(),
        }
    }
}

/// Line item as described by the checkout webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmationItem {
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_image: Option<String>,
    pub product_slug: String,
    pub amount: i64,
}

/// "Payment received" notification enqueued by the checkout webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmationMessage {
    pub order_id: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub items: Vec<OrderConfirmationItem>,
    pub total: i64,
    pub payment_method: String,
    pub created_at: String,
    pub session_id: String,
}
