//! Testing utilities and mock implementations.
//!
//! Mocks for every external collaborator of the worker, so the pipeline and
//! the consumers can be exercised end to end without object storage, the
//! watermark service or an email provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use fulfillment_core::testing::{fixtures, MockObjectStorage, MockWatermarker};
//!
//! let storage = MockObjectStorage::new();
//! storage.put_object("comics", "comic-a.pdf", b"%PDF".to_vec()).await;
//!
//! let watermarker = MockWatermarker::new();
//! watermarker.reject_next(500, "boom").await;
//!
//! let order = fixtures::order("ord_1", &["comic-a"]);
//! ```

mod mock_mailer;
mod mock_storage;
mod mock_watermarker;

pub use mock_mailer::MockMailer;
pub use mock_storage::{MockObjectStorage, RecordedUpload};
pub use mock_watermarker::{MockWatermarker, RecordedWatermark};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::messages::{
        OrderConfirmationItem, OrderConfirmationMessage, OrderItem, OrderMessage,
    };

    /// An order with one item per slug, 50.00 each.
    pub fn order(order_id: &str, slugs: &[&str]) -> OrderMessage {
        let items: Vec<OrderItem> = slugs
            .iter()
            .map(|slug| OrderItem {
                product_slug: slug.to_string(),
                quantity: 1,
                price: 5000,
            })
            .collect();
        let total = items.iter().map(|i| i.price).sum();

        OrderMessage {
            order_id: order_id.to_string(),
            customer_email: "a@b.c".to_string(),
            items,
            total,
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    /// A payment-received notification with one item.
    pub fn order_confirmation(order_id: &str) -> OrderConfirmationMessage {
        OrderConfirmationMessage {
            order_id: order_id.to_string(),
            customer_email: "a@b.c".to_string(),
            customer_name: Some("Ana".to_string()),
            items: vec![OrderConfirmationItem {
                product_name: "Comic A".to_string(),
                product_image: None,
                product_slug: "comic-a".to_string(),
                amount: 5000,
            }],
            total: 5000,
            payment_method: "card".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            session_id: "cs_test_1".to_string(),
        }
    }
}
