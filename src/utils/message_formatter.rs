/// Pure helpers shaping the recipient and name lists of birthday emails
use crate::constants::NAME_SEPARATOR;
use crate::models::BirthdayRecord;

/// Join the names of all matched records, in store order
pub fn join_names(records: &[BirthdayRecord]) -> String {
    records
        .iter()
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(NAME_SEPARATOR)
}

/// Every registered address except the celebrant's, order preserved
///
/// Comparison is exact string equality, so every occurrence of the
/// celebrant's address is removed. A celebrant without an address
/// excludes nobody.
pub fn exclude_email(all_emails: &[String], email: Option<&str>) -> Vec<String> {
    all_emails
        .iter()
        .filter(|e| Some(e.as_str()) != email)
        .cloned()
        .collect()
}
