/// Pure date utility functions for reference-date computation
use chrono::{DateTime, Datelike, Days, Local, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::models::RunKind;

/// Compute the reference date of a run from the current instant
///
/// The wall-clock date is taken in `timezone`, or in the host's local zone
/// when none is configured, so a run shortly after midnight local time
/// still sees the local calendar day.
pub fn reference_date(now: DateTime<Utc>, timezone: Option<&Tz>, run: RunKind) -> NaiveDate {
    let local_today = match timezone {
        Some(tz) => now.with_timezone(tz).date_naive(),
        None => now.with_timezone(&Local).date_naive(),
    };
    local_today + Days::new(run.offset_days())
}

/// Extract the (month, day) pair used for matching
pub fn month_day(date: NaiveDate) -> (i32, i32) {
    (date.month() as i32, date.day() as i32)
}

/// Format a reference date as YYYY-MM-DD for logs
pub fn format_reference_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
