//! Domain models that mirror the SQLite schema and get passed between the
//! persistence layer and the TUI. These stay plain data holders; the queries
//! live in `db` and the formatting lives in `ui`.

use std::fmt;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Format used for every timestamp that is stored, parsed from input, or shown
/// in a result table.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format accepted for calendar dates (reminder deletion by day, search bounds).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The three tables managed by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    User,
    Entry,
    Reminder,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::User, Table::Entry, Table::Reminder];

    /// Quoted SQL identifier. `user` is quoted everywhere so the schema stays
    /// portable to engines that reserve the word.
    pub fn sql_name(self) -> &'static str {
        match self {
            Table::User => "\"user\"",
            Table::Entry => "entry",
            Table::Reminder => "reminder",
        }
    }

    /// Name of the primary key column.
    pub fn key_column(self) -> &'static str {
        match self {
            Table::User => "id",
            Table::Entry => "entry_id",
            Table::Reminder => "reminder_id",
        }
    }

    /// Plural label used by menus and status messages.
    pub fn plural(self) -> &'static str {
        match self {
            Table::User => "Users",
            Table::Entry => "Entries",
            Table::Reminder => "Reminders",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Table::User => "User",
            Table::Entry => "Entry",
            Table::Reminder => "Reminder",
        };
        f.write_str(name)
    }
}

/// Unique user attributes that bulk and cascade deletes can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAttr {
    Username,
    Email,
}

impl UserAttr {
    pub fn column(self) -> &'static str {
        match self {
            UserAttr::Username => "username",
            UserAttr::Email => "email",
        }
    }
}

impl fmt::Display for UserAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A row of the `user` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A journal entry owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Stored in the `entry_id` column.
    pub id: i64,
    pub title: String,
    pub text: String,
    pub user_id: i64,
}

/// A reminder attached to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    /// Stored in the `reminder_id` column.
    pub id: i64,
    pub entry_id: i64,
    pub remind_at: NaiveDateTime,
    pub active: bool,
}

/// Inclusive bounds on `reminder.remind_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl DateRange {
    /// Build a range from two calendar days, covering the whole of `to`.
    pub fn days(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: from.and_time(NaiveTime::MIN),
            to: end_of_day(to),
        }
    }
}

/// Last representable second of a calendar day at the precision we store.
pub fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| day.and_time(NaiveTime::MIN))
}

/// Optional predicates for the flexible search. `None` means "do not filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub username: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub active: Option<bool>,
    pub date_range: Option<DateRange>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One grouped row of the flexible search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub entries: i64,
    pub reminders: i64,
}

/// Result of the flexible search along with how long the query took.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub rows: Vec<UserSummary>,
    pub elapsed: Duration,
}

/// Every entry written by one user.
#[derive(Debug, Clone)]
pub struct UserEntries {
    pub username: String,
    pub entries: Vec<Entry>,
}

/// A reminder joined to the title of the entry it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserReminder {
    pub reminder_id: i64,
    pub entry_title: String,
    pub remind_at: NaiveDateTime,
    pub active: bool,
}

/// Every reminder on entries written by one user, ordered by time.
#[derive(Debug, Clone)]
pub struct UserReminders {
    pub username: String,
    pub reminders: Vec<UserReminder>,
}

/// Row counts removed by a cascade, a table clear, or a full purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removed {
    pub users: usize,
    pub entries: usize,
    pub reminders: usize,
}

impl Removed {
    pub fn total(&self) -> usize {
        self.users + self.entries + self.reminders
    }
}

impl fmt::Display for Removed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} user(s), {} entr(ies), {} reminder(s)",
            self.users, self.entries, self.reminders
        )
    }
}

/// Outcome of a bulk generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generated {
    pub table: Table,
    pub count: usize,
    pub first_id: i64,
    pub elapsed: Duration,
}

impl fmt::Display for Generated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Generated {} {} row(s) in {:.2} ms.",
            self.count,
            self.table,
            self.elapsed.as_secs_f64() * 1000.0
        )
    }
}
