/// Process configuration, loaded once at start and passed explicitly
use std::path::PathBuf;

use chrono_tz::Tz;
use lettre::message::Mailbox;
use thiserror::Error;

use crate::constants::{DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT};
use crate::utils::string_utils::{is_empty_or_whitespace, split_and_trim};

/// Errors raised while reading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Connection parameters for the birthdays store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

/// Credentials and endpoint for outbound mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub address: String,
    pub password: String,
    /// Log messages instead of submitting them
    pub dry_run: bool,
}

/// A fixed administrative recipient of the daily summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HrRecipient {
    pub name: String,
    pub email: String,
}

/// Everything the notifier needs, resolved up front
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub mail: MailConfig,
    pub hr_recipients: Vec<HrRecipient>,
    pub card_path: Option<PathBuf>,
    /// Zone for the wall-clock date; the host's local zone when unset
    pub timezone: Option<Tz>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !is_empty_or_whitespace(v));
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let database = DatabaseConfig {
            host: get("PGHOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_port("PGPORT", get("PGPORT"), 5432)?,
            database: get("PGDATABASE").unwrap_or_else(|| "postgres".to_string()),
            user: get("PGUSER").unwrap_or_else(|| "postgres".to_string()),
            password: require("PGPASSWORD")?,
        };

        let mail = MailConfig {
            smtp_host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            smtp_port: parse_port("SMTP_PORT", get("SMTP_PORT"), DEFAULT_SMTP_PORT)?,
            address: require("MAIL_ADDRESS")?,
            password: require("MAIL_PASSWORD")?,
            dry_run: match get("MAIL_DRY_RUN") {
                Some(value) => parse_bool_flag("MAIL_DRY_RUN", &value)?,
                None => false,
            },
        };

        let hr_recipients = parse_hr_recipients(&require("HR_RECIPIENTS")?)?;

        let timezone = get("NOTIFIER_TIMEZONE")
            .map(|name| {
                name.parse::<Tz>().map_err(|_| ConfigError::Invalid {
                    key: "NOTIFIER_TIMEZONE",
                    reason: format!("unknown timezone '{}'", name),
                })
            })
            .transpose()?;

        Ok(Self {
            database,
            mail,
            hr_recipients,
            card_path: get("CARD_PATH").map(PathBuf::from),
            timezone,
        })
    }
}

/// Parse a comma-separated list of `Name <address>` entries
pub fn parse_hr_recipients(raw: &str) -> Result<Vec<HrRecipient>, ConfigError> {
    let recipients = split_and_trim(raw, ',')
        .iter()
        .map(|entry| -> Result<HrRecipient, ConfigError> {
            let mailbox: Mailbox = entry.parse().map_err(|e| ConfigError::Invalid {
                key: "HR_RECIPIENTS",
                reason: format!("'{}' is not a mailbox: {}", entry, e),
            })?;
            let name = mailbox
                .name
                .filter(|n| !is_empty_or_whitespace(n))
                .unwrap_or_else(|| mailbox.email.user().to_string());

            Ok(HrRecipient {
                name,
                email: mailbox.email.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if recipients.is_empty() {
        return Err(ConfigError::Invalid {
            key: "HR_RECIPIENTS",
            reason: "at least one recipient is required".to_string(),
        });
    }

    Ok(recipients)
}

/// Parse a boolean switch such as `true`, `1`, `yes`, `off`
pub fn parse_bool_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}

fn parse_port(key: &'static str, value: Option<String>, default: u16) -> Result<u16, ConfigError> {
    match value {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            reason: format!("'{}' is not a port number", v),
        }),
        None => Ok(default),
    }
}
