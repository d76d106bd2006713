use crate::models::{
    Entry, Reminder, SearchFilters, SearchOutcome, Table, User, UserEntries, UserReminders,
};

use super::helpers::{format_flag, format_timestamp};

/// Width every result column is padded or truncated to.
pub(crate) const COLUMN_WIDTH: u16 = 22;

pub(crate) const MAIN_MENU: [&str; 8] = [
    "View first rows of a table",
    "Add a row",
    "Delete rows",
    "Edit a row",
    "Search",
    "Generate random rows",
    "Delete ALL data",
    "Exit",
];

pub(crate) const SEARCH_MENU: [&str; 4] = [
    "Flexible search (users / entries / reminders)",
    "Find a row by id",
    "Entries written by a user",
    "Reminders of a user",
];

/// Table-scoped operation chosen from the main or search menu; the table
/// picker that follows decides which table it runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    View,
    Add,
    Delete,
    Edit,
    Find,
    Generate,
}

impl Action {
    pub(crate) fn title(self) -> &'static str {
        match self {
            Action::View => "View Table",
            Action::Add => "Add Row",
            Action::Delete => "Delete Rows",
            Action::Edit => "Edit Row",
            Action::Find => "Find By Id",
            Action::Generate => "Generate Rows",
        }
    }
}

/// Ways rows can be removed, offered per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeleteOption {
    ById,
    ByUsername,
    ByEmail,
    ByAuthor,
    ByDate,
    ByStatus,
    ClearTable,
}

impl DeleteOption {
    pub(crate) fn for_table(table: Table) -> &'static [DeleteOption] {
        match table {
            Table::User => &[
                DeleteOption::ById,
                DeleteOption::ByUsername,
                DeleteOption::ByEmail,
                DeleteOption::ClearTable,
            ],
            Table::Entry => &[
                DeleteOption::ById,
                DeleteOption::ByAuthor,
                DeleteOption::ClearTable,
            ],
            Table::Reminder => &[
                DeleteOption::ById,
                DeleteOption::ByDate,
                DeleteOption::ByStatus,
                DeleteOption::ClearTable,
            ],
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            DeleteOption::ById => "By id",
            DeleteOption::ByUsername => "By username",
            DeleteOption::ByEmail => "By email",
            DeleteOption::ByAuthor => "By author username",
            DeleteOption::ByDate => "By date",
            DeleteOption::ByStatus => "By status",
            DeleteOption::ClearTable => "Clear the whole table",
        }
    }
}

/// Map a pressed digit to a zero-based menu index, if it is in range.
pub(crate) fn menu_choice(ch: char, len: usize) -> Option<usize> {
    let digit = ch.to_digit(10)? as usize;
    (1..=len).contains(&digit).then(|| digit - 1)
}

/// Fixed-width tabular result, scrolled one row at a time.
#[derive(Debug, Clone)]
pub(crate) struct ResultTable {
    pub(crate) title: String,
    pub(crate) headers: Vec<&'static str>,
    pub(crate) rows: Vec<Vec<String>>,
    pub(crate) offset: usize,
    pub(crate) note: Option<String>,
}

impl ResultTable {
    fn new(title: impl Into<String>, headers: Vec<&'static str>, rows: Vec<Vec<String>>) -> Self {
        Self {
            title: title.into(),
            headers,
            rows,
            offset: 0,
            note: None,
        }
    }

    fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub(crate) fn users(title: impl Into<String>, users: &[User]) -> Self {
        let rows = users
            .iter()
            .map(|user| {
                vec![
                    user.id.to_string(),
                    user.username.clone(),
                    user.email.clone(),
                    user.password.clone(),
                ]
            })
            .collect();
        Self::new(title, vec!["ID", "Username", "Email", "Password"], rows)
    }

    pub(crate) fn entries(title: impl Into<String>, entries: &[Entry]) -> Self {
        let rows = entries
            .iter()
            .map(|entry| {
                vec![
                    entry.id.to_string(),
                    entry.title.clone(),
                    entry.text.clone(),
                    entry.user_id.to_string(),
                ]
            })
            .collect();
        Self::new(title, vec!["Entry ID", "Title", "Text", "User ID"], rows)
    }

    pub(crate) fn reminders(title: impl Into<String>, reminders: &[Reminder]) -> Self {
        let rows = reminders
            .iter()
            .map(|reminder| {
                vec![
                    reminder.id.to_string(),
                    reminder.entry_id.to_string(),
                    format_timestamp(&reminder.remind_at),
                    format_flag(reminder.active),
                ]
            })
            .collect();
        Self::new(
            title,
            vec!["Reminder ID", "Entry ID", "Remind at", "Active"],
            rows,
        )
    }

    pub(crate) fn search(outcome: &SearchOutcome, filters: &SearchFilters) -> Self {
        let rows = outcome
            .rows
            .iter()
            .map(|summary| {
                vec![
                    summary.id.to_string(),
                    summary.username.clone(),
                    summary.email.clone(),
                    summary.entries.to_string(),
                    summary.reminders.to_string(),
                ]
            })
            .collect();
        Self::new(
            "Search Results",
            vec!["User ID", "Username", "Email", "Entries", "Reminders"],
            rows,
        )
        .with_note(format!(
            "{}{} user(s) matched in {:.2} ms.",
            if filters.is_empty() { "No filters set, " } else { "" },
            outcome.rows.len(),
            outcome.elapsed.as_secs_f64() * 1000.0
        ))
    }

    pub(crate) fn user_entries(listing: &UserEntries) -> Self {
        let rows = listing
            .entries
            .iter()
            .map(|entry| vec![entry.id.to_string(), entry.title.clone(), entry.text.clone()])
            .collect();
        Self::new(
            format!("Entries by {}", listing.username),
            vec!["Entry ID", "Title", "Text"],
            rows,
        )
    }

    pub(crate) fn user_reminders(listing: &UserReminders) -> Self {
        let rows = listing
            .reminders
            .iter()
            .map(|reminder| {
                vec![
                    reminder.reminder_id.to_string(),
                    reminder.entry_title.clone(),
                    format_timestamp(&reminder.remind_at),
                    format_flag(reminder.active),
                ]
            })
            .collect();
        Self::new(
            format!("Reminders of {}", listing.username),
            vec!["Reminder ID", "Entry", "Remind at", "Active"],
            rows,
        )
    }

    /// Message shown instead of an empty grid.
    pub(crate) fn empty_message(&self) -> &'static str {
        "No rows to show."
    }

    pub(crate) fn scroll(&mut self, delta: isize) {
        let last = self.rows.len().saturating_sub(1);
        self.offset = self.offset.saturating_add_signed(delta).min(last);
    }

    pub(crate) fn visible_rows(&self, height: usize) -> &[Vec<String>] {
        let end = (self.offset + height).min(self.rows.len());
        &self.rows[self.offset.min(end)..end]
    }
}

/// Pad or cut a cell so every column has the same width.
pub(crate) fn fit_cell(value: &str) -> String {
    let width = COLUMN_WIDTH as usize;
    let count = value.chars().count();
    if count > width {
        let mut cut: String = value.chars().take(width - 1).collect();
        cut.push('~');
        cut
    } else {
        format!("{value:<width$}")
    }
}
