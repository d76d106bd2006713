use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use crate::models::{Entry, Removed, Table};

use super::error::{map_constraint, DataError};
use super::tables::next_id;

const AUTHOR_IDS: &str = "(SELECT id FROM \"user\" WHERE username = ?1)";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        title: row.get(1)?,
        text: row.get(2)?,
        user_id: row.get(3)?,
    })
}

/// First `limit` entries ordered by entry id.
pub fn fetch_entries(conn: &Connection, limit: u32) -> Result<Vec<Entry>> {
    let mut stmt = conn
        .prepare(
            "SELECT entry_id, title, text, user_id FROM entry
             ORDER BY entry_id LIMIT ?1",
        )
        .context("failed to prepare entry listing")?;

    let entries = stmt
        .query_map([i64::from(limit)], entry_from_row)
        .context("failed to load entries")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect entries")?;

    Ok(entries)
}

pub fn find_entry(conn: &Connection, id: i64) -> Result<Option<Entry>> {
    conn.query_row(
        "SELECT entry_id, title, text, user_id FROM entry WHERE entry_id = ?1",
        [id],
        entry_from_row,
    )
    .optional()
    .context("failed to look up entry")
}

/// Insert an entry for an existing user.
pub fn add_entry(
    conn: &Connection,
    id: Option<i64>,
    title: &str,
    text: &str,
    user_id: i64,
) -> Result<Entry> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let id = match id {
        Some(id) => id,
        None => next_id(&tx, Table::Entry)?,
    };

    tx.execute(
        "INSERT INTO entry (entry_id, title, text, user_id) VALUES (?1, ?2, ?3, ?4)",
        params![id, title, text, user_id],
    )
    .map_err(|err| {
        map_constraint(
            err,
            DataError::MissingParent {
                parent: Table::User,
                id: user_id,
            },
        )
    })
    .context("failed to insert entry")?;
    tx.commit().context("failed to commit entry insert")?;

    info!(id, user_id, "entry added");
    Ok(Entry {
        id,
        title: title.to_string(),
        text: text.to_string(),
        user_id,
    })
}

/// Replace every column of the entry stored under `current_id`.
pub fn update_entry(conn: &Connection, current_id: i64, entry: &Entry) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let updated = tx
        .execute(
            "UPDATE entry SET entry_id = ?1, title = ?2, text = ?3, user_id = ?4
             WHERE entry_id = ?5",
            params![entry.id, entry.title, entry.text, entry.user_id, current_id],
        )
        .map_err(|err| map_constraint(err, DataError::ForeignKey { table: Table::Entry }))
        .context("failed to update entry")?;

    if updated == 0 {
        return Err(DataError::NotFound {
            table: Table::Entry,
            id: current_id,
        }
        .into());
    }
    tx.commit().context("failed to commit entry update")?;
    info!(current_id, new_id = entry.id, "entry updated");
    Ok(())
}

/// Remove one entry. Fails while reminders still reference it.
pub fn delete_entry(conn: &Connection, id: i64) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let deleted = tx
        .execute("DELETE FROM entry WHERE entry_id = ?1", [id])
        .map_err(|err| map_constraint(err, entry_has_reminders()))
        .context("failed to delete entry")?;

    if deleted == 0 {
        return Err(DataError::NotFound {
            table: Table::Entry,
            id,
        }
        .into());
    }
    tx.commit().context("failed to commit entry delete")?;
    info!(id, "entry deleted");
    Ok(())
}

/// Remove every entry written by the user called `username`.
pub fn delete_entries_by_author(conn: &Connection, username: &str) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let sql = format!("DELETE FROM entry WHERE user_id = {AUTHOR_IDS}");
    let deleted = tx
        .execute(&sql, [username])
        .map_err(|err| map_constraint(err, entry_has_reminders()))
        .context("failed to delete entries")?;

    if deleted == 0 {
        return Err(no_entries_by(username).into());
    }
    tx.commit().context("failed to commit entry delete")?;
    info!(username, deleted, "entries deleted by author");
    Ok(deleted)
}

/// Remove an entry and its reminders.
pub fn delete_entry_cascade(conn: &Connection, id: i64) -> Result<Removed> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let reminders = tx
        .execute("DELETE FROM reminder WHERE entry_id = ?1", [id])
        .context("failed to delete the entry's reminders")?;
    let entries = tx
        .execute("DELETE FROM entry WHERE entry_id = ?1", [id])
        .context("failed to delete entry")?;

    if entries == 0 {
        return Err(DataError::NotFound {
            table: Table::Entry,
            id,
        }
        .into());
    }
    tx.commit().context("failed to commit cascading delete")?;

    let removed = Removed {
        users: 0,
        entries,
        reminders,
    };
    info!(id, %removed, "entry removed with reminders");
    Ok(removed)
}

/// Remove every entry by `username` along with the reminders on them.
pub fn delete_entries_cascade_by_author(conn: &Connection, username: &str) -> Result<Removed> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let reminders_sql = format!(
        "DELETE FROM reminder
         WHERE entry_id IN (SELECT entry_id FROM entry WHERE user_id = {AUTHOR_IDS})"
    );
    let reminders = tx
        .execute(&reminders_sql, [username])
        .context("failed to delete the author's reminders")?;
    let entries_sql = format!("DELETE FROM entry WHERE user_id = {AUTHOR_IDS}");
    let entries = tx
        .execute(&entries_sql, [username])
        .context("failed to delete the author's entries")?;

    if entries == 0 {
        return Err(no_entries_by(username).into());
    }
    tx.commit().context("failed to commit cascading delete")?;

    let removed = Removed {
        users: 0,
        entries,
        reminders,
    };
    info!(username, %removed, "entries removed with reminders");
    Ok(removed)
}

fn entry_has_reminders() -> DataError {
    DataError::HasDependents {
        table: Table::Entry,
        child: Table::Reminder,
    }
}

fn no_entries_by(username: &str) -> DataError {
    DataError::NoMatch {
        table: Table::Entry,
        column: "author",
        value: username.to_string(),
    }
}
