/// Birthday notifier - decides who gets which message for a reference date
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::report::{DispatchReport, MessageKind};
use super::template_renderer::TemplateRenderer;
use crate::card::load_card;
use crate::config::{Config, HrRecipient};
use crate::database::{BirthdayStore, StoreError};
use crate::mail::{EmailMessage, MailError, Mailer};
use crate::models::{BirthdayRecord, RunKind};
use crate::utils::datetime::{format_reference_date, month_day, reference_date};
use crate::utils::message_formatter::{exclude_email, join_names};

/// A run that could not read the store; nothing was sent
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("error while checking {run}'s birthdays: {source}")]
    Store {
        run: RunKind,
        #[source]
        source: StoreError,
    },
}

/// The parts of [`Config`] the notifier needs
#[derive(Debug, Clone)]
pub struct NotifierSettings {
    /// `From` address of every message
    pub sender: String,
    pub hr_recipients: Vec<HrRecipient>,
    pub card_path: Option<PathBuf>,
    /// `None` means the host's local zone
    pub timezone: Option<Tz>,
}

impl NotifierSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sender: config.mail.address.clone(),
            hr_recipients: config.hr_recipients.clone(),
            card_path: config.card_path.clone(),
            timezone: config.timezone,
        }
    }
}

/// Sends birthday wishes, HR summaries and team announcements
///
/// Everything runs in program order: one query, then one send at a time.
/// A failed send is recorded in the report and the next one is attempted.
pub struct BirthdayNotifier<S, M> {
    store: S,
    mailer: M,
    renderer: TemplateRenderer,
    settings: NotifierSettings,
}

impl<S: BirthdayStore, M: Mailer> BirthdayNotifier<S, M> {
    /// Create a notifier over a store, a mailer and the email templates
    pub fn new(
        store: S,
        mailer: M,
        renderer: TemplateRenderer,
        settings: NotifierSettings,
    ) -> Self {
        Self {
            store,
            mailer,
            renderer,
            settings,
        }
    }

    /// Personal wishes, HR summary and team announcements for today
    pub async fn run_for_today(&self) -> Result<DispatchReport, NotifierError> {
        let timezone = self.settings.timezone.as_ref();
        let date = reference_date(Utc::now(), timezone, RunKind::Today);
        self.run_for_date(RunKind::Today, date).await
    }

    /// HR summary only, for tomorrow
    pub async fn run_for_tomorrow(&self) -> Result<DispatchReport, NotifierError> {
        let timezone = self.settings.timezone.as_ref();
        let date = reference_date(Utc::now(), timezone, RunKind::Tomorrow);
        self.run_for_date(RunKind::Tomorrow, date).await
    }

    /// Run against an explicit reference date
    pub async fn run_for_date(
        &self,
        run: RunKind,
        date: NaiveDate,
    ) -> Result<DispatchReport, NotifierError> {
        info!("🔍 Checking birthdays for {}: {}", run, format_reference_date(date));

        let mut report = DispatchReport::new(run, date);
        let (month, day) = month_day(date);

        let birthday_people = self
            .store
            .birthdays_on(month, day)
            .await
            .map_err(|source| store_failure(run, source))?;

        if birthday_people.is_empty() {
            info!("No birthdays {}.", run);
            return Ok(report);
        }

        info!("Found {} birthday(s) {}", birthday_people.len(), run);
        for person in &birthday_people {
            debug!(
                "Matched record {} ({}), status {:?}",
                person.id, person.name, person.status
            );
        }
        report.matched = birthday_people.iter().map(|p| p.name.clone()).collect();

        match run {
            RunKind::Today => {
                // Read before the first send so a store failure sends nothing
                let all_emails = self
                    .store
                    .registered_emails()
                    .await
                    .map_err(|source| store_failure(run, source))?;

                self.send_personal_wishes(&birthday_people, &mut report).await;
                self.send_hr_summaries(&birthday_people, run, &mut report).await;
                self.send_team_announcements(&birthday_people, &all_emails, &mut report)
                    .await;
            }
            RunKind::Tomorrow => {
                self.send_hr_summaries(&birthday_people, run, &mut report).await;
            }
        }

        Ok(report)
    }

    async fn send_personal_wishes(&self, people: &[BirthdayRecord], report: &mut DispatchReport) {
        let card = load_card(self.settings.card_path.as_deref()).await;

        for person in people {
            let Some(email) = person.email.as_deref() else {
                info!("No email on file for {}, skipping personal wish", person.name);
                report.skipped_wishes += 1;
                continue;
            };

            let inline = card.as_ref().map(|c| c.to_inline());
            let rendered = self
                .renderer
                .personal_wish(&self.settings.sender, email, &person.name, inline);
            let recipients = vec![email.to_string()];
            self.deliver(MessageKind::PersonalWish, rendered, recipients, report)
                .await;
        }
    }

    async fn send_hr_summaries(
        &self,
        people: &[BirthdayRecord],
        run: RunKind,
        report: &mut DispatchReport,
    ) {
        let names = join_names(people);

        for hr in &self.settings.hr_recipients {
            let rendered = self
                .renderer
                .hr_summary(&self.settings.sender, hr, &names, run);
            let recipients = vec![hr.email.clone()];
            self.deliver(MessageKind::HrSummary, rendered, recipients, report)
                .await;
        }
    }

    async fn send_team_announcements(
        &self,
        people: &[BirthdayRecord],
        all_emails: &[String],
        report: &mut DispatchReport,
    ) {
        for person in people {
            let others = exclude_email(all_emails, person.email.as_deref());
            let rendered = self.renderer.team_announcement(
                &self.settings.sender,
                others.clone(),
                &person.name,
            );

            match rendered {
                Ok(Some(message)) => {
                    self.dispatch(MessageKind::TeamAnnouncement, message, report)
                        .await
                }
                Ok(None) => {
                    info!("No one else to notify about {}'s birthday", person.name);
                    report.skipped_announcements += 1;
                }
                Err(e) => render_failure(MessageKind::TeamAnnouncement, others, e, report),
            }
        }
    }

    /// Send a rendered message, or record why it could not be rendered
    async fn deliver(
        &self,
        kind: MessageKind,
        rendered: Result<EmailMessage, MailError>,
        recipients: Vec<String>,
        report: &mut DispatchReport,
    ) {
        match rendered {
            Ok(message) => self.dispatch(kind, message, report).await,
            Err(e) => render_failure(kind, recipients, e, report),
        }
    }

    /// Send one message and record the outcome
    async fn dispatch(
        &self,
        kind: MessageKind,
        message: EmailMessage,
        report: &mut DispatchReport,
    ) {
        let to = message.recipients_display();

        match self.mailer.send(&message).await {
            Ok(()) => {
                info!("✅ Email sent to {} ({})", to, kind);
                report.record_sent(kind);
            }
            Err(e) => {
                error!("❌ Failed to send to {} ({}): {}", to, kind, e);
                report.record_failure(kind, message.to, e);
            }
        }
    }
}

fn render_failure(
    kind: MessageKind,
    recipients: Vec<String>,
    cause: MailError,
    report: &mut DispatchReport,
) {
    error!("❌ Could not render {} for {}: {}", kind, recipients.join(", "), cause);
    report.record_failure(kind, recipients, cause);
}

fn store_failure(run: RunKind, source: StoreError) -> NotifierError {
    warn!("⚠️ Error while checking {}'s birthdays: {}", run, source);
    NotifierError::Store { run, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// In-memory store filtering by month and day like the SQL predicate
    struct MemoryStore {
        records: Vec<BirthdayRecord>,
        unavailable: bool,
        registry_unavailable: bool,
    }

    impl MemoryStore {
        fn new(records: Vec<BirthdayRecord>) -> Self {
            Self {
                records,
                unavailable: false,
                registry_unavailable: false,
            }
        }

        fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Self::new(Vec::new())
            }
        }

        /// Date lookups work, the registered-email query fails
        fn registry_unavailable(records: Vec<BirthdayRecord>) -> Self {
            Self {
                registry_unavailable: true,
                ..Self::new(records)
            }
        }

        fn check(&self, failing: bool) -> Result<(), StoreError> {
            if failing {
                Err(StoreError::Connect(sqlx::Error::PoolTimedOut))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl BirthdayStore for MemoryStore {
        async fn birthdays_on(
            &self,
            month: i32,
            day: i32,
        ) -> Result<Vec<BirthdayRecord>, StoreError> {
            self.check(self.unavailable)?;
            Ok(self
                .records
                .iter()
                .filter(|r| month_day(r.date) == (month, day))
                .cloned()
                .collect())
        }

        async fn registered_emails(&self) -> Result<Vec<String>, StoreError> {
            self.check(self.unavailable || self.registry_unavailable)?;
            Ok(self.records.iter().filter_map(|r| r.email.clone()).collect())
        }
    }

    /// Mailer keeping every message, failing for chosen recipients
    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
        reject: Vec<String>,
    }

    impl RecordingMailer {
        fn rejecting(addresses: &[&str]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                reject: addresses.iter().map(|a| a.to_string()).collect(),
            }
        }

        fn sent(&self) -> Vec<EmailMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            if message.to.iter().any(|to| self.reject.contains(to)) {
                return Err(MailError::Transport("550 mailbox unavailable".to_string()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn record(id: i32, name: &str, ymd: (i32, u32, u32), email: &str) -> BirthdayRecord {
        BirthdayRecord {
            id,
            name: name.to_string(),
            date: NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap(),
            email: Some(email.to_string()),
            status: Some("Not Sent".to_string()),
        }
    }

    fn sample_records() -> Vec<BirthdayRecord> {
        vec![
            record(1, "Alice", (1990, 3, 14), "alice@x"),
            record(2, "Bob", (1985, 3, 14), "bob@x"),
            record(3, "Carol", (1992, 7, 1), "carol@x"),
        ]
    }

    fn settings(card_path: Option<PathBuf>) -> NotifierSettings {
        NotifierSettings {
            sender: "wishes@x".to_string(),
            hr_recipients: vec![
                HrRecipient {
                    name: "Sayona".to_string(),
                    email: "hr1@x".to_string(),
                },
                HrRecipient {
                    name: "Shobha".to_string(),
                    email: "hr2@x".to_string(),
                },
            ],
            card_path,
            timezone: Some(chrono_tz::UTC),
        }
    }

    fn with_settings<S: BirthdayStore>(
        store: S,
        mailer: RecordingMailer,
        settings: NotifierSettings,
    ) -> BirthdayNotifier<S, RecordingMailer> {
        BirthdayNotifier::new(store, mailer, TemplateRenderer::new().unwrap(), settings)
    }

    fn notifier<S: BirthdayStore>(
        store: S,
        mailer: RecordingMailer,
    ) -> BirthdayNotifier<S, RecordingMailer> {
        with_settings(store, mailer, settings(None))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn to(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_today_sends_wishes_summary_and_announcements() {
        let n = notifier(MemoryStore::new(sample_records()), RecordingMailer::default());

        let report = n.run_for_date(RunKind::Today, date(2025, 3, 14)).await.unwrap();
        let sent = n.mailer.sent();

        let recipients: Vec<Vec<String>> = sent.iter().map(|m| m.to.clone()).collect();
        assert_eq!(
            recipients,
            vec![
                to(&["alice@x"]),
                to(&["bob@x"]),
                to(&["hr1@x"]),
                to(&["hr2@x"]),
                to(&["bob@x", "carol@x"]),
                to(&["alice@x", "carol@x"]),
            ]
        );

        assert_eq!(sent[0].subject, "🎉 Happy Birthday!");
        assert!(sent[2].text_body.contains("Alice, Bob"));
        assert!(sent[2].text_body.starts_with("Hello Sayona,"));
        assert!(sent[3].text_body.starts_with("Hello Shobha,"));
        assert_eq!(sent[4].subject, "🎂 It's Alice's Birthday Today!");
        assert_eq!(sent[5].subject, "🎂 It's Bob's Birthday Today!");

        assert_eq!(report.matched, to(&["Alice", "Bob"]));
        assert_eq!(report.sent.personal_wishes, 2);
        assert_eq!(report.sent.hr_summaries, 2);
        assert_eq!(report.sent.team_announcements, 2);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_matching_ignores_birth_year() {
        let records = vec![
            record(1, "Old", (1950, 3, 14), "old@x"),
            record(2, "Young", (2020, 3, 14), "young@x"),
            record(3, "Other", (2020, 3, 15), "other@x"),
        ];
        let n = notifier(MemoryStore::new(records), RecordingMailer::default());

        let report = n.run_for_date(RunKind::Today, date(2031, 3, 14)).await.unwrap();

        assert_eq!(report.matched, to(&["Old", "Young"]));
    }

    #[tokio::test]
    async fn test_no_matches_sends_nothing() {
        let n = notifier(MemoryStore::new(sample_records()), RecordingMailer::default());

        let report = n.run_for_date(RunKind::Today, date(2025, 12, 25)).await.unwrap();

        assert!(n.mailer.sent().is_empty());
        assert!(report.matched.is_empty());
        assert_eq!(report.attempted(), 0);
    }

    #[tokio::test]
    async fn test_tomorrow_sends_only_hr_summaries() {
        let n = notifier(MemoryStore::new(sample_records()), RecordingMailer::default());

        let report = n.run_for_date(RunKind::Tomorrow, date(2025, 3, 14)).await.unwrap();
        let sent = n.mailer.sent();

        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| m.subject == "🎂 Birthday Reminder for Tomorrow"));
        assert!(sent.iter().all(|m| m.text_body.contains("Alice, Bob")));
        assert_eq!(report.sent.hr_summaries, 2);
        assert_eq!(report.sent.personal_wishes, 0);
        assert_eq!(report.sent.team_announcements, 0);
    }

    #[tokio::test]
    async fn test_tomorrow_without_matches_sends_nothing() {
        let n = notifier(MemoryStore::new(sample_records()), RecordingMailer::default());

        n.run_for_date(RunKind::Tomorrow, date(2025, 1, 1)).await.unwrap();

        assert!(n.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_announcement_skipped_for_single_registrant() {
        let records = vec![record(1, "Alice", (1990, 3, 14), "alice@x")];
        let n = notifier(MemoryStore::new(records), RecordingMailer::default());

        let report = n.run_for_date(RunKind::Today, date(2025, 3, 14)).await.unwrap();

        assert_eq!(n.mailer.sent().len(), 3);
        assert_eq!(report.sent.team_announcements, 0);
        assert_eq!(report.skipped_announcements, 1);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_failed_send_does_not_block_the_rest() {
        let n = notifier(
            MemoryStore::new(sample_records()),
            RecordingMailer::rejecting(&["alice@x"]),
        );

        let report = n.run_for_date(RunKind::Today, date(2025, 3, 14)).await.unwrap();

        // Alice's wish and Bob's announcement (which includes alice@x) fail
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].kind, MessageKind::PersonalWish);
        assert_eq!(report.failures[0].recipients, to(&["alice@x"]));
        assert!(matches!(report.failures[0].cause, MailError::Transport(_)));
        assert_eq!(report.failures[1].kind, MessageKind::TeamAnnouncement);

        assert_eq!(report.sent.personal_wishes, 1);
        assert_eq!(report.sent.hr_summaries, 2);
        assert_eq!(report.sent.team_announcements, 1);
        assert_eq!(report.attempted(), 6);
    }

    #[tokio::test]
    async fn test_store_failure_sends_nothing() {
        let n = notifier(MemoryStore::unavailable(), RecordingMailer::default());

        let today = n.run_for_date(RunKind::Today, date(2025, 3, 14)).await;
        let tomorrow = n.run_for_date(RunKind::Tomorrow, date(2025, 3, 14)).await;

        assert!(matches!(
            today,
            Err(NotifierError::Store {
                run: RunKind::Today,
                ..
            })
        ));
        assert!(matches!(
            tomorrow,
            Err(NotifierError::Store {
                run: RunKind::Tomorrow,
                ..
            })
        ));
        assert!(n.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_registry_failure_sends_nothing() {
        let n = notifier(
            MemoryStore::registry_unavailable(sample_records()),
            RecordingMailer::default(),
        );

        let today = n.run_for_date(RunKind::Today, date(2025, 3, 14)).await;

        assert!(matches!(
            today,
            Err(NotifierError::Store {
                run: RunKind::Today,
                ..
            })
        ));
        assert!(n.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_registry_failure_does_not_affect_tomorrow() {
        let n = notifier(
            MemoryStore::registry_unavailable(sample_records()),
            RecordingMailer::default(),
        );

        let report = n.run_for_date(RunKind::Tomorrow, date(2025, 3, 14)).await.unwrap();

        assert_eq!(report.sent.hr_summaries, 2);
        assert_eq!(n.mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_match_without_email_skips_only_the_wish() {
        let records = vec![
            BirthdayRecord {
                email: None,
                ..record(1, "Alice", (1990, 3, 14), "unused")
            },
            record(2, "Bob", (1985, 3, 14), "bob@x"),
            record(3, "Carol", (1992, 7, 1), "carol@x"),
        ];
        let n = notifier(MemoryStore::new(records), RecordingMailer::default());

        let report = n.run_for_date(RunKind::Today, date(2025, 3, 14)).await.unwrap();
        let recipients: Vec<Vec<String>> = n.mailer.sent().iter().map(|m| m.to.clone()).collect();

        assert_eq!(
            recipients,
            vec![
                to(&["bob@x"]),
                to(&["hr1@x"]),
                to(&["hr2@x"]),
                to(&["bob@x", "carol@x"]),
                to(&["carol@x"]),
            ]
        );
        assert_eq!(report.matched, to(&["Alice", "Bob"]));
        assert_eq!(report.skipped_wishes, 1);
        assert_eq!(report.sent.personal_wishes, 1);
        assert_eq!(report.sent.hr_summaries, 2);
        assert_eq!(report.sent.team_announcements, 2);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_match_without_email_still_in_tomorrow_summary() {
        let records = vec![BirthdayRecord {
            email: None,
            ..record(1, "Alice", (1990, 3, 14), "unused")
        }];
        let n = notifier(MemoryStore::new(records), RecordingMailer::default());

        let report = n.run_for_date(RunKind::Tomorrow, date(2025, 3, 14)).await.unwrap();
        let sent = n.mailer.sent();

        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| m.text_body.contains("Alice")));
        assert_eq!(report.skipped_wishes, 0);
    }

    #[tokio::test]
    async fn test_missing_card_still_sends_wish() {
        let missing = std::env::temp_dir().join("no-such-birthday-card.jpg");
        let n = with_settings(
            MemoryStore::new(sample_records()),
            RecordingMailer::default(),
            settings(Some(missing)),
        );

        let report = n.run_for_date(RunKind::Today, date(2025, 3, 14)).await.unwrap();
        let sent = n.mailer.sent();

        assert_eq!(report.sent.personal_wishes, 2);
        assert!(sent[0].inline_image.is_none());
    }

    #[tokio::test]
    async fn test_card_embedded_in_personal_wishes_only() {
        let file_name = format!("card-{}.jpg", uuid::Uuid::new_v4().simple());
        let path = std::env::temp_dir().join(file_name);
        std::fs::write(&path, [0xff, 0xd8, 0xff, 0xe0]).unwrap();

        let n = with_settings(
            MemoryStore::new(sample_records()),
            RecordingMailer::default(),
            settings(Some(path.clone())),
        );
        n.run_for_date(RunKind::Today, date(2025, 3, 14)).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let sent = n.mailer.sent();
        let first = sent[0].inline_image.as_ref().unwrap();
        let second = sent[1].inline_image.as_ref().unwrap();

        assert_eq!(first.content_type, "image/jpeg");
        assert_ne!(first.content_id, second.content_id);
        let html = sent[0].html_body.as_ref().unwrap();
        assert!(html.contains(&format!("cid:{}", first.content_id)));
        assert!(sent[2..].iter().all(|m| m.inline_image.is_none()));
    }

    #[tokio::test]
    async fn test_run_for_today_uses_current_date() {
        let n = notifier(MemoryStore::new(Vec::new()), RecordingMailer::default());

        // The run may straddle midnight
        let before = Utc::now().date_naive();
        let report = n.run_for_today().await.unwrap();

        assert_eq!(report.run, RunKind::Today);
        let after = before.succ_opt().unwrap();
        assert!(report.reference_date == before || report.reference_date == after);
    }

    #[tokio::test]
    async fn test_run_for_tomorrow_without_timezone_uses_host_zone() {
        let mut unset = settings(None);
        unset.timezone = None;
        let n = with_settings(MemoryStore::new(Vec::new()), RecordingMailer::default(), unset);

        let today = chrono::Local::now().date_naive();
        let report = n.run_for_tomorrow().await.unwrap();

        assert_eq!(report.run, RunKind::Tomorrow);
        let tomorrow = today.succ_opt().unwrap();
        let day_after = tomorrow.succ_opt().unwrap();
        assert!(report.reference_date == tomorrow || report.reference_date == day_after);
    }
}
