mod card;
mod config;
mod constants;
mod database;
mod mail;
mod models;
mod services;
mod utils;

use tracing::{error, info, warn};

use crate::{
    config::Config,
    constants::LOG_DIRECTIVE,
    database::Database,
    mail::{LogMailer, Mailer, SmtpMailer},
    services::{
        BirthdayNotifier, DispatchReport, NotifierError, NotifierSettings, TemplateRenderer,
    },
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    initialize_logging();

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mailer = match build_mailer(&config) {
        Ok(mailer) => mailer,
        Err(e) => {
            error!("Failed to set up mail transport: {}", e);
            std::process::exit(1);
        }
    };

    let renderer = match TemplateRenderer::new() {
        Ok(renderer) => renderer,
        Err(e) => {
            error!("Failed to load email templates: {}", e);
            std::process::exit(1);
        }
    };

    let notifier = BirthdayNotifier::new(
        Database::new(&config.database),
        mailer,
        renderer,
        NotifierSettings::from_config(&config),
    );

    // Both runs always execute; failures are reported, never fatal
    log_outcome(notifier.run_for_today().await);
    log_outcome(notifier.run_for_tomorrow().await);
}

/// Initialize the logging system
fn initialize_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(LOG_DIRECTIVE.parse().expect("valid log directive")),
        )
        .init();
}

/// Pick the SMTP transport, or the logging mailer for dry runs
fn build_mailer(config: &Config) -> Result<Box<dyn Mailer>, mail::MailError> {
    if config.mail.dry_run {
        info!("Dry run: messages will be logged, not sent");
        return Ok(Box::new(LogMailer));
    }

    Ok(Box::new(SmtpMailer::new(&config.mail)?))
}

/// Summarize a run in one log line
fn log_outcome(outcome: Result<DispatchReport, NotifierError>) {
    match outcome {
        Ok(report) if report.is_clean() => info!(
            "Finished {} run for {}: {} matched, {} sent, {} skipped",
            report.run,
            report.reference_date,
            report.matched.len(),
            report.sent.total(),
            report.skipped()
        ),
        Ok(report) => {
            warn!(
                "Finished {} run for {}: {} matched, {} of {} sent, {} skipped",
                report.run,
                report.reference_date,
                report.matched.len(),
                report.sent.total(),
                report.attempted(),
                report.skipped()
            );
            for failure in &report.failures {
                warn!(
                    "  {} to {} failed: {}",
                    failure.kind,
                    failure.recipients.join(", "),
                    failure.cause
                );
            }
        }
        Err(e) => warn!("Run aborted: {}", e),
    }
}
