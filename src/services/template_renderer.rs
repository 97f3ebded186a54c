/// Email rendering with tera, HTML and plaintext for each message kind
use tera::{Context, Tera};

use crate::config::HrRecipient;
use crate::mail::{EmailMessage, InlineImage, MailError};
use crate::models::RunKind;

/// Wraps a tera engine holding the embedded email templates
///
/// `.html` templates are autoescaped by tera, `.txt` templates are not.
pub struct TemplateRenderer {
    engine: Tera,
}

impl TemplateRenderer {
    /// Register the templates compiled into the binary
    pub fn new() -> Result<Self, MailError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "birthday_wish.html",
                    include_str!("../../templates/emails/birthday_wish.html"),
                ),
                (
                    "birthday_wish.txt",
                    include_str!("../../templates/emails/birthday_wish.txt"),
                ),
                (
                    "hr_summary.html",
                    include_str!("../../templates/emails/hr_summary.html"),
                ),
                (
                    "hr_summary.txt",
                    include_str!("../../templates/emails/hr_summary.txt"),
                ),
                (
                    "team_announcement.html",
                    include_str!("../../templates/emails/team_announcement.html"),
                ),
                (
                    "team_announcement.txt",
                    include_str!("../../templates/emails/team_announcement.txt"),
                ),
            ])
            .map_err(|e| MailError::Template(e.to_string()))?;

        Ok(Self { engine })
    }

    /// Personal greeting sent to the birthday person
    pub fn personal_wish(
        &self,
        from: &str,
        to: &str,
        name: &str,
        card: Option<InlineImage>,
    ) -> Result<EmailMessage, MailError> {
        let mut context = Context::new();
        context.insert("name", name);
        context.insert("content_id", &card.as_ref().map(|c| c.content_id.as_str()));

        let (html_body, text_body) = self.render_pair("birthday_wish", &context)?;

        Ok(EmailMessage {
            from: from.to_string(),
            to: vec![to.to_string()],
            subject: "🎉 Happy Birthday!".to_string(),
            text_body,
            html_body: Some(html_body),
            inline_image: card,
        })
    }

    /// Digest for one HR recipient listing everyone celebrating on the reference date
    pub fn hr_summary(
        &self,
        from: &str,
        hr: &HrRecipient,
        names: &str,
        run: RunKind,
    ) -> Result<EmailMessage, MailError> {
        let mut context = Context::new();
        context.insert("hr_name", &hr.name);
        context.insert("names", names);
        context.insert("day", run.label());

        let (html_body, text_body) = self.render_pair("hr_summary", &context)?;

        Ok(EmailMessage {
            from: from.to_string(),
            to: vec![hr.email.clone()],
            subject: format!("🎂 Birthday Reminder for {}", run.title()),
            text_body,
            html_body: Some(html_body),
            inline_image: None,
        })
    }

    /// Team-wide announcement naming one birthday person
    ///
    /// Returns `Ok(None)` when there is nobody left to tell.
    pub fn team_announcement(
        &self,
        from: &str,
        recipients: Vec<String>,
        birthday_name: &str,
    ) -> Result<Option<EmailMessage>, MailError> {
        if recipients.is_empty() {
            return Ok(None);
        }

        let mut context = Context::new();
        context.insert("name", birthday_name);

        let (html_body, text_body) = self.render_pair("team_announcement", &context)?;

        Ok(Some(EmailMessage {
            from: from.to_string(),
            to: recipients,
            subject: format!("🎂 It's {}'s Birthday Today!", birthday_name),
            text_body,
            html_body: Some(html_body),
            inline_image: None,
        }))
    }

    /// Render `<name>.html` and `<name>.txt` with the same context
    fn render_pair(&self, name: &str, context: &Context) -> Result<(String, String), MailError> {
        let html = self
            .engine
            .render(&format!("{name}.html"), context)
            .map_err(|e| MailError::Template(e.to_string()))?;

        let text = self
            .engine
            .render(&format!("{name}.txt"), context)
            .map_err(|e| MailError::Template(e.to_string()))?;

        Ok((html, text.trim_end().to_string()))
    }
}
