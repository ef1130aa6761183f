//! Transactional email: templates and delivery.

mod error;
mod resend;
pub mod templates;
mod traits;
mod types;

pub use error::MailerError;
pub use resend::ResendMailer;
pub use traits::Mailer;
pub use types::{OutgoingEmail, RenderedEmail};
