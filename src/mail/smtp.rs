/// SMTP submission over implicit TLS
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use super::{EmailMessage, InlineImage, MailError, Mailer};
use crate::config::MailConfig;

/// Mailer submitting through an authenticated SMTP relay
///
/// Wraps `lettre::AsyncSmtpTransport<Tokio1Executor>` without a pool: every
/// message opens its own session, closed once it is submitted or rejected.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build a transport for the configured relay
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let credentials = Credentials::new(config.address.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self { transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let email = build_message(message)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Turn an [`EmailMessage`] into a MIME message
///
/// Layout: text only, or `multipart/alternative` of text and HTML. When an
/// inline image is attached the HTML part becomes `multipart/related`.
pub(crate) fn build_message(message: &EmailMessage) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&message.from)?)
        .subject(message.subject.clone());

    for recipient in &message.to {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    let built = match &message.html_body {
        None => builder.singlepart(SinglePart::plain(message.text_body.clone())),
        Some(html) => {
            let text = SinglePart::plain(message.text_body.clone());
            let alternative = match &message.inline_image {
                None => MultiPart::alternative()
                    .singlepart(text)
                    .singlepart(SinglePart::html(html.clone())),
                Some(image) => MultiPart::alternative().singlepart(text).multipart(
                    MultiPart::related()
                        .singlepart(SinglePart::html(html.clone()))
                        .singlepart(inline_part(image)?),
                ),
            };
            builder.multipart(alternative)
        }
    };

    built.map_err(|e| MailError::Build(e.to_string()))
}

fn inline_part(image: &InlineImage) -> Result<SinglePart, MailError> {
    let content_type = ContentType::parse(&image.content_type)
        .map_err(|e| MailError::Build(format!("content type '{}': {}", image.content_type, e)))?;

    Ok(Attachment::new_inline(image.content_id.clone()).body(image.data.clone(), content_type))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}
