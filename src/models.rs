use chrono::NaiveDate;

/// A row of the `birthdays` table
///
/// Records are owned by an external process; this program only reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BirthdayRecord {
    pub id: i32,
    pub name: String,
    /// Date of birth or anniversary. Only month and day are ever compared.
    pub date: NaiveDate,
    /// Rows written without an address get no personal wish
    pub email: Option<String>,
    pub status: Option<String>,
}

/// Which day a run looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Today,
    Tomorrow,
}

impl RunKind {
    /// Lowercase word used in logs and message bodies
    pub fn label(self) -> &'static str {
        match self {
            RunKind::Today => "today",
            RunKind::Tomorrow => "tomorrow",
        }
    }

    /// Capitalized word used in subjects
    pub fn title(self) -> &'static str {
        match self {
            RunKind::Today => "Today",
            RunKind::Tomorrow => "Tomorrow",
        }
    }

    /// Number of days between the wall-clock date and the reference date
    pub fn offset_days(self) -> u64 {
        match self {
            RunKind::Today => 0,
            RunKind::Tomorrow => 1,
        }
    }
}

impl std::fmt::Display for RunKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
