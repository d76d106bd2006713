use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use crate::models::{Reminder, Table, DATE_FORMAT, TIMESTAMP_FORMAT};

use super::error::{map_constraint, DataError};
use super::tables::next_id;

fn reminder_from_row(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        remind_at: row.get(2)?,
        active: row.get(3)?,
    })
}

/// Timestamps are stored as text at second precision so lexical order,
/// `date()` and `BETWEEN` all agree.
pub(crate) fn timestamp_text(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// First `limit` reminders ordered by reminder id.
pub fn fetch_reminders(conn: &Connection, limit: u32) -> Result<Vec<Reminder>> {
    let mut stmt = conn
        .prepare(
            "SELECT reminder_id, entry_id, remind_at, active FROM reminder
             ORDER BY reminder_id LIMIT ?1",
        )
        .context("failed to prepare reminder listing")?;

    let reminders = stmt
        .query_map([i64::from(limit)], reminder_from_row)
        .context("failed to load reminders")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect reminders")?;

    Ok(reminders)
}

pub fn find_reminder(conn: &Connection, id: i64) -> Result<Option<Reminder>> {
    conn.query_row(
        "SELECT reminder_id, entry_id, remind_at, active FROM reminder WHERE reminder_id = ?1",
        [id],
        reminder_from_row,
    )
    .optional()
    .context("failed to look up reminder")
}

/// Insert a reminder for an existing entry.
pub fn add_reminder(
    conn: &Connection,
    id: Option<i64>,
    entry_id: i64,
    remind_at: NaiveDateTime,
    active: bool,
) -> Result<Reminder> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let id = match id {
        Some(id) => id,
        None => next_id(&tx, Table::Reminder)?,
    };

    tx.execute(
        "INSERT INTO reminder (reminder_id, entry_id, remind_at, active) VALUES (?1, ?2, ?3, ?4)",
        params![id, entry_id, timestamp_text(&remind_at), active],
    )
    .map_err(|err| {
        map_constraint(
            err,
            DataError::MissingParent {
                parent: Table::Entry,
                id: entry_id,
            },
        )
    })
    .context("failed to insert reminder")?;
    tx.commit().context("failed to commit reminder insert")?;

    info!(id, entry_id, "reminder added");
    Ok(Reminder {
        id,
        entry_id,
        remind_at,
        active,
    })
}

/// Replace every column of the reminder stored under `current_id`.
pub fn update_reminder(conn: &Connection, current_id: i64, reminder: &Reminder) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let updated = tx
        .execute(
            "UPDATE reminder SET reminder_id = ?1, entry_id = ?2, remind_at = ?3, active = ?4
             WHERE reminder_id = ?5",
            params![
                reminder.id,
                reminder.entry_id,
                timestamp_text(&reminder.remind_at),
                reminder.active,
                current_id
            ],
        )
        .map_err(|err| {
            map_constraint(
                err,
                DataError::MissingParent {
                    parent: Table::Entry,
                    id: reminder.entry_id,
                },
            )
        })
        .context("failed to update reminder")?;

    if updated == 0 {
        return Err(DataError::NotFound {
            table: Table::Reminder,
            id: current_id,
        }
        .into());
    }
    tx.commit().context("failed to commit reminder update")?;
    info!(current_id, new_id = reminder.id, "reminder updated");
    Ok(())
}

pub fn delete_reminder(conn: &Connection, id: i64) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let deleted = tx
        .execute("DELETE FROM reminder WHERE reminder_id = ?1", [id])
        .context("failed to delete reminder")?;

    if deleted == 0 {
        return Err(DataError::NotFound {
            table: Table::Reminder,
            id,
        }
        .into());
    }
    tx.commit().context("failed to commit reminder delete")?;
    info!(id, "reminder deleted");
    Ok(())
}

/// Remove every reminder due on `day`, whatever the time of day.
pub fn delete_reminders_by_date(conn: &Connection, day: NaiveDate) -> Result<usize> {
    let day_text = day.format(DATE_FORMAT).to_string();
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let deleted = tx
        .execute("DELETE FROM reminder WHERE date(remind_at) = ?1", [&day_text])
        .context("failed to delete reminders by date")?;

    if deleted == 0 {
        return Err(DataError::NoMatch {
            table: Table::Reminder,
            column: "date",
            value: day_text,
        }
        .into());
    }
    tx.commit().context("failed to commit reminder delete")?;
    info!(day = %day_text, deleted, "reminders deleted by date");
    Ok(deleted)
}

/// Remove every active (or every inactive) reminder.
pub fn delete_reminders_by_status(conn: &Connection, active: bool) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let deleted = tx
        .execute("DELETE FROM reminder WHERE active = ?1", [active])
        .context("failed to delete reminders by status")?;

    if deleted == 0 {
        return Err(DataError::NoMatch {
            table: Table::Reminder,
            column: "active",
            value: active.to_string(),
        }
        .into());
    }
    tx.commit().context("failed to commit reminder delete")?;
    info!(active, deleted, "reminders deleted by status");
    Ok(deleted)
}
