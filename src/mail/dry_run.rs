use async_trait::async_trait;
use tracing::info;

use super::{EmailMessage, MailError, Mailer};

/// Dry-run mailer: logs what would be sent and reports success
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            to = %message.recipients_display(),
            subject = %message.subject,
            inline_image = message.inline_image.is_some(),
            "Dry run: email not submitted"
        );
        Ok(())
    }
}
