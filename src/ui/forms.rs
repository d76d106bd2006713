use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{
    end_of_day, DateRange, Entry, Reminder, SearchFilters, Table, User, UserAttr, DATE_FORMAT,
    TIMESTAMP_FORMAT,
};

use super::helpers::format_timestamp;

/// Phrase that unlocks the full database purge. Case matters.
pub(crate) const PURGE_PHRASE: &str = "YES I WANT";

/// Single labelled text input.
#[derive(Clone, Debug)]
pub(crate) struct Field {
    pub(crate) label: &'static str,
    pub(crate) value: String,
    pub(crate) hint: &'static str,
}

impl Field {
    fn new(label: &'static str, hint: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            hint,
        }
    }

    fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }
}

/// A popup form: a column of text fields, one of them focused.
#[derive(Clone, Debug)]
pub(crate) struct Form {
    pub(crate) title: String,
    pub(crate) fields: Vec<Field>,
    pub(crate) active: usize,
    pub(crate) error: Option<String>,
}

impl Form {
    fn new(title: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            title: title.into(),
            fields,
            active: 0,
            error: None,
        }
    }

    pub(crate) fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + 1) % self.fields.len();
        }
    }

    pub(crate) fn prev_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Append a character to the focused field. Control characters are
    /// ignored.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.fields.get_mut(self.active) {
            Some(field) => {
                field.value.push(ch);
                true
            }
            None => false,
        }
    }

    pub(crate) fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.active) {
            field.value.pop();
        }
    }

    /// Trimmed value of field `index`.
    pub(crate) fn value(&self, index: usize) -> &str {
        self.fields
            .get(index)
            .map(|field| field.value.trim())
            .unwrap_or_default()
    }

    /// Render each field as `Label: value`, highlighting the focused one.
    pub(crate) fn build_lines(&self) -> Vec<Line<'static>> {
        self.fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let is_active = index == self.active;
                let (display, style) = if field.value.is_empty() {
                    (
                        format!("<{}>", field.hint),
                        if is_active {
                            Style::default().fg(Color::Yellow)
                        } else {
                            Style::default().fg(Color::DarkGray)
                        },
                    )
                } else if is_active {
                    (field.value.clone(), Style::default().fg(Color::Yellow))
                } else {
                    (field.value.clone(), Style::default())
                };
                Line::from(vec![
                    Span::raw(format!("{}: ", field.label)),
                    Span::styled(display, style),
                ])
            })
            .collect()
    }

    /// Column and row of the text cursor relative to the form body.
    pub(crate) fn cursor_offset(&self) -> (u16, u16) {
        let Some(field) = self.fields.get(self.active) else {
            return (0, 0);
        };
        let column = field.label.chars().count() + 2 + field.value.chars().count();
        (column as u16, self.active as u16)
    }

    pub(crate) fn add_user() -> Self {
        Self::new(
            "Add User",
            vec![
                Field::new("ID", "blank = next free id"),
                Field::new("Username", "required"),
                Field::new("Email", "required"),
                Field::new("Password", "required"),
            ],
        )
    }

    pub(crate) fn add_entry() -> Self {
        Self::new(
            "Add Entry",
            vec![
                Field::new("Entry ID", "blank = next free id"),
                Field::new("Title", "required"),
                Field::new("Text", "required"),
                Field::new("User ID", "required"),
            ],
        )
    }

    pub(crate) fn add_reminder() -> Self {
        Self::new(
            "Add Reminder",
            vec![
                Field::new("Reminder ID", "blank = next free id"),
                Field::new("Entry ID", "required"),
                Field::new("Remind at", "YYYY-MM-DD HH:MM:SS"),
                Field::new("Active", "1 = yes, 0 = no"),
            ],
        )
    }

    /// Edit forms start out holding the current row; clearing a field is the
    /// same as keeping its old value.
    pub(crate) fn edit_user(user: &User) -> Self {
        Self::new(
            format!("Edit User {}", user.id),
            vec![
                Field::new("ID", "keep").with_value(user.id.to_string()),
                Field::new("Username", "keep").with_value(&user.username),
                Field::new("Email", "keep").with_value(&user.email),
                Field::new("Password", "keep").with_value(&user.password),
            ],
        )
    }

    pub(crate) fn edit_entry(entry: &Entry) -> Self {
        Self::new(
            format!("Edit Entry {}", entry.id),
            vec![
                Field::new("Entry ID", "keep").with_value(entry.id.to_string()),
                Field::new("Title", "keep").with_value(&entry.title),
                Field::new("Text", "keep").with_value(&entry.text),
                Field::new("User ID", "keep").with_value(entry.user_id.to_string()),
            ],
        )
    }

    pub(crate) fn edit_reminder(reminder: &Reminder) -> Self {
        let active = if reminder.active { "1" } else { "0" };
        Self::new(
            format!("Edit Reminder {}", reminder.id),
            vec![
                Field::new("Reminder ID", "keep").with_value(reminder.id.to_string()),
                Field::new("Entry ID", "keep").with_value(reminder.entry_id.to_string()),
                Field::new("Remind at", "keep")
                    .with_value(format_timestamp(&reminder.remind_at)),
                Field::new("Active", "1 = yes, 0 = no").with_value(active),
            ],
        )
    }

    pub(crate) fn id_prompt(title: impl Into<String>, table: Table) -> Self {
        let label = match table {
            Table::User => "User ID",
            Table::Entry => "Entry ID",
            Table::Reminder => "Reminder ID",
        };
        Self::new(title, vec![Field::new(label, "required")])
    }

    pub(crate) fn text_prompt(title: impl Into<String>, label: &'static str) -> Self {
        Self::new(title, vec![Field::new(label, "required")])
    }

    pub(crate) fn reminder_date() -> Self {
        Self::new(
            "Delete Reminders By Date",
            vec![Field::new("Date", "YYYY-MM-DD")],
        )
    }

    pub(crate) fn reminder_status() -> Self {
        Self::new(
            "Delete Reminders By Status",
            vec![Field::new("Status", "1 = active, 0 = inactive")],
        )
    }

    pub(crate) fn search() -> Self {
        Self::new(
            "Flexible Search (leave blank to skip)",
            vec![
                Field::new("Username", "any"),
                Field::new("Email", "any"),
                Field::new("Entry title", "any"),
                Field::new("Entry text", "any"),
                Field::new("Date from", "YYYY-MM-DD [HH:MM:SS]"),
                Field::new("Date to", "YYYY-MM-DD [HH:MM:SS]"),
                Field::new("Active", "1 = yes, 0 = no, blank = all"),
            ],
        )
    }

    pub(crate) fn generate(table: Table) -> Self {
        Self::new(
            format!("Generate {}", table.plural()),
            vec![Field::new("How many rows", "e.g. 1000")],
        )
    }
}

fn required<'a>(form: &'a Form, index: usize, what: &str) -> Result<&'a str> {
    let value = form.value(index);
    if value.is_empty() {
        return Err(anyhow!("{what} is required."));
    }
    Ok(value)
}

fn parse_id(raw: &str, what: &str) -> Result<i64> {
    raw.parse::<i64>()
        .map_err(|_| anyhow!("{what} must be an integer."))
}

fn required_id(form: &Form, index: usize, what: &str) -> Result<i64> {
    parse_id(required(form, index, what)?, what)
}

fn optional_id(form: &Form, index: usize, what: &str) -> Result<Option<i64>> {
    match form.value(index) {
        "" => Ok(None),
        raw => parse_id(raw, what).map(Some),
    }
}

/// `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD HH:MM`, or a bare date meaning
/// midnight.
pub(crate) fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))
        .or_else(|_| parse_date(raw).map(|day| day.and_time(NaiveTime::MIN)))
        .map_err(|_| anyhow!("Invalid date '{raw}'. Use YYYY-MM-DD HH:MM:SS."))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| anyhow!("Invalid date '{raw}'. Use YYYY-MM-DD."))
}

/// Upper search bound: a bare date covers the whole day.
fn parse_upper_bound(raw: &str) -> Result<NaiveDateTime> {
    match parse_date(raw) {
        Ok(day) => Ok(end_of_day(day)),
        Err(_) => parse_timestamp(raw),
    }
}

/// `1` is active, `0` inactive, anything else keeps the row active.
fn parse_active_or_default(raw: &str) -> bool {
    raw != "0"
}

pub(crate) fn parse_new_user(form: &Form) -> Result<(Option<i64>, String, String, String)> {
    let id = optional_id(form, 0, "ID")?;
    let username = required(form, 1, "Username")?;
    let email = required(form, 2, "Email")?;
    let password = required(form, 3, "Password")?;
    Ok((id, username.into(), email.into(), password.into()))
}

pub(crate) fn parse_new_entry(form: &Form) -> Result<(Option<i64>, String, String, i64)> {
    let id = optional_id(form, 0, "Entry ID")?;
    let title = required(form, 1, "Title")?;
    let text = required(form, 2, "Text")?;
    let user_id = required_id(form, 3, "User ID")?;
    Ok((id, title.into(), text.into(), user_id))
}

pub(crate) fn parse_new_reminder(form: &Form) -> Result<(Option<i64>, i64, NaiveDateTime, bool)> {
    let id = optional_id(form, 0, "Reminder ID")?;
    let entry_id = required_id(form, 1, "Entry ID")?;
    let remind_at = parse_timestamp(required(form, 2, "Date")?)?;
    let active = parse_active_or_default(form.value(3));
    Ok((id, entry_id, remind_at, active))
}

fn or_keep(form: &Form, index: usize, current: &str) -> String {
    match form.value(index) {
        "" => current.to_string(),
        value => value.to_string(),
    }
}

pub(crate) fn parse_edited_user(form: &Form, current: &User) -> Result<User> {
    Ok(User {
        id: parse_id(&or_keep(form, 0, &current.id.to_string()), "ID")?,
        username: or_keep(form, 1, &current.username),
        email: or_keep(form, 2, &current.email),
        password: or_keep(form, 3, &current.password),
    })
}

pub(crate) fn parse_edited_entry(form: &Form, current: &Entry) -> Result<Entry> {
    Ok(Entry {
        id: parse_id(&or_keep(form, 0, &current.id.to_string()), "Entry ID")?,
        title: or_keep(form, 1, &current.title),
        text: or_keep(form, 2, &current.text),
        user_id: parse_id(&or_keep(form, 3, &current.user_id.to_string()), "User ID")?,
    })
}

pub(crate) fn parse_edited_reminder(form: &Form, current: &Reminder) -> Result<Reminder> {
    let remind_at = match form.value(2) {
        "" => current.remind_at,
        raw => parse_timestamp(raw)?,
    };
    let active = match form.value(3) {
        "" => current.active,
        raw => parse_active_or_default(raw),
    };
    Ok(Reminder {
        id: parse_id(&or_keep(form, 0, &current.id.to_string()), "Reminder ID")?,
        entry_id: parse_id(&or_keep(form, 1, &current.entry_id.to_string()), "Entry ID")?,
        remind_at,
        active,
    })
}

pub(crate) fn parse_single_id(form: &Form) -> Result<i64> {
    let what = form.fields.first().map(|field| field.label).unwrap_or("ID");
    required_id(form, 0, what)
}

pub(crate) fn parse_single_text(form: &Form) -> Result<String> {
    let what = form.fields.first().map(|field| field.label).unwrap_or("Value");
    required(form, 0, what).map(str::to_string)
}

pub(crate) fn parse_reminder_date(form: &Form) -> Result<NaiveDate> {
    parse_date(required(form, 0, "Date")?)
}

fn parse_status(raw: &str) -> Result<bool> {
    match raw {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(anyhow!("Enter 1 (active) or 0 (inactive).")),
    }
}

pub(crate) fn parse_reminder_status(form: &Form) -> Result<bool> {
    parse_status(form.value(0))
}

pub(crate) fn parse_search(form: &Form) -> Result<SearchFilters> {
    let text = |index: usize| match form.value(index) {
        "" => None,
        value => Some(value.to_string()),
    };

    let date_range = match (form.value(4), form.value(5)) {
        ("", "") => None,
        (from, to) if !from.is_empty() && !to.is_empty() => Some(DateRange {
            from: parse_timestamp(from)?,
            to: parse_upper_bound(to)?,
        }),
        _ => return Err(anyhow!("Give both dates to filter by a date range.")),
    };

    let active = match form.value(6) {
        "" => None,
        raw => Some(parse_status(raw)?),
    };

    Ok(SearchFilters {
        username: text(0),
        email: text(1),
        title: text(2),
        text: text(3),
        active,
        date_range,
    })
}

pub(crate) fn parse_count(form: &Form) -> Result<usize> {
    let raw = required(form, 0, "Row count")?;
    let count = raw
        .parse::<usize>()
        .map_err(|_| anyhow!("Row count must be a whole number."))?;
    if count == 0 {
        return Err(anyhow!("Row count must be greater than zero."));
    }
    Ok(count)
}

/// Which filter a user-attribute delete applies.
pub(crate) fn attr_prompt(attr: UserAttr) -> Form {
    match attr {
        UserAttr::Username => Form::text_prompt("Delete Users By Username", "Username"),
        UserAttr::Email => Form::text_prompt("Delete Users By Email", "Email"),
    }
}

/// A destructive action waiting for its confirmation phrase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PendingAction {
    ClearTable(Table),
    PurgeAll,
    CascadeUser(i64),
    CascadeUserBy(UserAttr, String),
    CascadeEntry(i64),
    CascadeEntriesByAuthor(String),
}

/// Confirmation dialog: the action only runs when the typed text matches.
#[derive(Clone, Debug)]
pub(crate) struct Confirm {
    pub(crate) title: &'static str,
    pub(crate) lines: Vec<String>,
    pub(crate) phrase: &'static str,
    pub(crate) exact: bool,
    pub(crate) input: String,
    pub(crate) action: PendingAction,
}

impl Confirm {
    pub(crate) fn clear_table(table: Table) -> Self {
        let mut lines = vec![format!(
            "Every row of the {} table will be deleted and ids restart at 1.",
            table
        )];
        match table {
            Table::User => lines.push("This also deletes every entry and reminder.".into()),
            Table::Entry => lines.push("This also deletes every reminder.".into()),
            Table::Reminder => {}
        }
        Self::yes("Clear Table", lines, PendingAction::ClearTable(table))
    }

    pub(crate) fn purge_all() -> Self {
        Self {
            title: "DANGER ZONE",
            lines: vec![
                "All data in all tables will be deleted permanently.".into(),
                "There is no way to recover it.".into(),
            ],
            phrase: PURGE_PHRASE,
            exact: true,
            input: String::new(),
            action: PendingAction::PurgeAll,
        }
    }

    /// Offer to remove the target together with everything that references it.
    pub(crate) fn cascade(reason: String, action: PendingAction) -> Self {
        Self::yes(
            "Cascade Delete",
            vec![
                reason,
                "Delete it together with all dependent data?".into(),
            ],
            action,
        )
    }

    fn yes(title: &'static str, lines: Vec<String>, action: PendingAction) -> Self {
        Self {
            title,
            lines,
            phrase: "yes",
            exact: false,
            input: String::new(),
            action,
        }
    }

    /// The purge phrase must match exactly; `yes` prompts ignore case and
    /// surrounding whitespace.
    pub(crate) fn accepted(&self) -> bool {
        let typed = self.input.trim();
        if self.exact {
            typed == self.phrase
        } else {
            typed.eq_ignore_ascii_case(self.phrase)
        }
    }

    pub(crate) fn prompt(&self) -> String {
        format!("Type '{}' to confirm, Esc to cancel", self.phrase)
    }
}
