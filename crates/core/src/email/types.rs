use serde::{Deserialize, Serialize};

/// A rendered message ready to hand to a mailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Subject and body produced by a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

impl RenderedEmail {
    /// Address the rendered content.
    pub fn into_outgoing(self, from: impl Into<String>, to: impl Into<String>) -> OutgoingEmail {
        OutgoingEmail {
            from: from.into(),
            to: to.into(),
            subject: self.subject,
            html: self.html,
        }
    }
}
