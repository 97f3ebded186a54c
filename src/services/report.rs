/// Structured outcome of one notifier run
use chrono::NaiveDate;

use crate::mail::MailError;
use crate::models::RunKind;

/// The three kinds of message a run can send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    PersonalWish,
    HrSummary,
    TeamAnnouncement,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::PersonalWish => write!(f, "personal wish"),
            MessageKind::HrSummary => write!(f, "HR summary"),
            MessageKind::TeamAnnouncement => write!(f, "team announcement"),
        }
    }
}

/// A message that could not be delivered
#[derive(Debug)]
pub struct SendFailure {
    pub kind: MessageKind,
    pub recipients: Vec<String>,
    pub cause: MailError,
}

/// Successful sends per message kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentCounts {
    pub personal_wishes: usize,
    pub hr_summaries: usize,
    pub team_announcements: usize,
}

impl SentCounts {
    pub fn total(&self) -> usize {
        self.personal_wishes + self.hr_summaries + self.team_announcements
    }
}

/// What a run did: who matched, what went out, what failed
#[derive(Debug)]
pub struct DispatchReport {
    pub run: RunKind,
    pub reference_date: NaiveDate,
    /// Names of the match set, in store order
    pub matched: Vec<String>,
    pub sent: SentCounts,
    /// Personal wishes skipped because the match has no email on file
    pub skipped_wishes: usize,
    /// Team announcements skipped because nobody else is registered
    pub skipped_announcements: usize,
    pub failures: Vec<SendFailure>,
}

impl DispatchReport {
    /// Create an empty report for a run
    pub fn new(run: RunKind, reference_date: NaiveDate) -> Self {
        Self {
            run,
            reference_date,
            matched: Vec::new(),
            sent: SentCounts::default(),
            skipped_wishes: 0,
            skipped_announcements: 0,
            failures: Vec::new(),
        }
    }

    /// Count a delivered message
    pub fn record_sent(&mut self, kind: MessageKind) {
        match kind {
            MessageKind::PersonalWish => self.sent.personal_wishes += 1,
            MessageKind::HrSummary => self.sent.hr_summaries += 1,
            MessageKind::TeamAnnouncement => self.sent.team_announcements += 1,
        }
    }

    /// Keep a failed delivery with its cause
    pub fn record_failure(&mut self, kind: MessageKind, recipients: Vec<String>, cause: MailError) {
        self.failures.push(SendFailure {
            kind,
            recipients,
            cause,
        });
    }

    /// Number of send attempts, successful or not
    pub fn attempted(&self) -> usize {
        self.sent.total() + self.failures.len()
    }

    /// Messages deliberately not sent
    pub fn skipped(&self) -> usize {
        self.skipped_wishes + self.skipped_announcements
    }

    /// True when every attempted send went through
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
