/// Outbound email: message data, delivery trait, SMTP and dry-run mailers
mod dry_run;
mod smtp;

use async_trait::async_trait;
use thiserror::Error;

pub use dry_run::LogMailer;
pub use smtp::SmtpMailer;

/// Errors raised while building or delivering a message
#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("could not render template: {0}")]
    Template(String),

    #[error("could not build message: {0}")]
    Build(String),

    #[error("SMTP delivery failed: {0}")]
    Transport(String),
}

/// An image embedded in the HTML part and referenced by content-id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// Content-id without angle brackets, referenced as `cid:<content_id>`
    pub content_id: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A single outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    /// All recipients share one `To` header
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: String,
    /// HTML alternative part
    pub html_body: Option<String>,
    /// Only embedded when an HTML part is present
    pub inline_image: Option<InlineImage>,
}

impl EmailMessage {
    /// Recipients as they appear in the `To` header
    pub fn recipients_display(&self) -> String {
        self.to.join(", ")
    }
}

/// Delivery port for outbound email
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message; each call is independent of the previous ones
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

#[async_trait]
impl<T: Mailer + ?Sized> Mailer for Box<T> {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        (**self).send(message).await
    }
}
