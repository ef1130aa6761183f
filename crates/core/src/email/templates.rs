//! Email templates.
//!
//! Bodies live under `templates/email/` and are rendered with askama, which
//! escapes every interpolated value.

use askama::Template;

use super::error::MailerError;
use super::types::RenderedEmail;
use crate::messages::{EmailConfirmationMessage, OrderConfirmationMessage};

/// Format an amount in minor units as `$1,234.56`.
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    let units = (abs / 100).to_string();
    let cents = abs % 100;

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}${grouped}.{cents:02}")
}

#[derive(Template)]
#[template(path = "email/download_ready.html")]
struct DownloadReadyTemplate<'a> {
    subject: &'a str,
    order_id: &'a str,
    slugs: Vec<&'a str>,
    url: &'a str,
}

struct ItemRow<'a> {
    name: &'a str,
    image: Option<&'a str>,
    amount: String,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationTemplate<'a> {
    subject: &'a str,
    order_id: &'a str,
    customer_name: Option<&'a str>,
    items: Vec<ItemRow<'a>>,
    total: String,
    payment_method: &'a str,
}

fn render(template: &impl Template, subject: String) -> Result<RenderedEmail, MailerError> {
    let html = template.render().map_err(|e| MailerError::Render {
        reason: e.to_string(),
    })?;
    Ok(RenderedEmail { subject, html })
}

/// "Your order is ready to download."
pub fn download_ready(message: &EmailConfirmationMessage) -> Result<RenderedEmail, MailerError> {
    let subject = format!(
        "¡Tu pedido #{} está listo para descargar!",
        message.order_id
    );
    let template = DownloadReadyTemplate {
        subject: &subject,
        order_id: &message.order_id,
        slugs: message.distinct_slugs(),
        url: &message.presigned_url,
    };
    render(&template, subject.clone())
}

/// "Thanks for your order." Sent once payment is received.
pub fn order_confirmation(
    message: &OrderConfirmationMessage,
) -> Result<RenderedEmail, MailerError> {
    let subject = format!("¡Gracias por tu pedido #{}!", message.order_id);
    let template = OrderConfirmationTemplate {
        subject: &subject,
        order_id: &message.order_id,
        customer_name: message
            .customer_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty()),
        items: message
            .items
            .iter()
            .map(|item| ItemRow {
                name: &item.product_name,
                image: item.product_image.as_deref(),
                amount: format_amount(item.amount),
            })
            .collect(),
        total: format_amount(message.total),
        payment_method: &message.payment_method,
    };
    render(&template, subject.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{OrderConfirmationItem, OrderItem};
    use chrono::{TimeZone, Utc};

    fn ready_message() -> EmailConfirmationMessage {
        EmailConfirmationMessage {
            order_id: "ord_1".to_string(),
            customer_email: "a@b.c".to_string(),
            presigned_url: "https://r2.example/orders/ord_1.zip?X-Amz-Signature=abc&x=1".to_string(),
            expires_at: Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap(),
            items: vec![
                OrderItem {
                    product_slug: "comic-a".to_string(),
                    quantity: 1,
                    price: 5000,
                },
                OrderItem {
                    product_slug: "comic-a".to_string(),
                    quantity: 1,
                    price: 5000,
                },
            ],
            total: 10000,
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "$0.00");
        assert_eq!(format_amount(5), "$0.05");
        assert_eq!(format_amount(5000), "$50.00");
        assert_eq!(format_amount(123456789), "$1,234,567.89");
        assert_eq!(format_amount(-1999), "-$19.99");
    }

    #[test]
    fn test_download_ready_subject_and_link() {
        let email = download_ready(&ready_message()).unwrap();
        assert_eq!(email.subject, "¡Tu pedido #ord_1 está listo para descargar!");
        assert!(email.html.contains("r2.example"));
        assert!(email.html.contains("ord_1.zip?X-Amz-Signature=abc&amp;x=1"));
        assert!(!email.html.contains("abc&x=1"));
        assert_eq!(email.html.matches(">comic-a</td>").count(), 1);
    }

    #[test]
    fn test_order_confirmation_lists_items_and_total() {
        let message = OrderConfirmationMessage {
            order_id: "ord_2".to_string(),
            customer_email: "a@b.c".to_string(),
            customer_name: Some("Ana <script>".to_string()),
            items: vec![OrderConfirmationItem {
                product_name: "Comic A".to_string(),
                product_image: Some("https://cdn.example/a.png".to_string()),
                product_slug: "comic-a".to_string(),
                amount: 12550,
            }],
            total: 12550,
            payment_method: "card".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            session_id: "cs_test".to_string(),
        };

        let email = order_confirmation(&message).unwrap();
        assert_eq!(email.subject, "¡Gracias por tu pedido #ord_2!");
        assert!(email.html.contains("Hola Ana &lt;script&gt;,"));
        assert!(email.html.contains("Comic A"));
        assert!(email.html.contains("cdn.example"));
        assert!(email.html.contains("a.png"));
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("$125.50"));
        assert!(email.html.contains("card"));
    }

    #[test]
    fn test_order_confirmation_without_name() {
        let message = OrderConfirmationMessage {
            order_id: "ord_3".to_string(),
            customer_email: "a@b.c".to_string(),
            customer_name: None,
            items: vec![],
            total: 0,
            payment_method: "oxxo".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            session_id: "cs_test".to_string(),
        };
        let email = order_confirmation(&message).unwrap();
        assert!(email.html.contains("<p style=\"margin:0 0 16px;\">Hola,</p>"));
        assert!(email.html.contains("$0.00"));
    }
}
