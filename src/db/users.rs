use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::models::{Entry, Removed, Table, User, UserAttr, UserEntries, UserReminder, UserReminders};

use super::error::{map_constraint, DataError};
use super::tables::next_id;

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
    })
}

/// First `limit` users ordered by id.
pub fn fetch_users(conn: &Connection, limit: u32) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, username, email, password FROM \"user\"
             ORDER BY id LIMIT ?1",
        )
        .context("failed to prepare user listing")?;

    let users = stmt
        .query_map([i64::from(limit)], user_from_row)
        .context("failed to load users")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect users")?;

    Ok(users)
}

pub fn find_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    conn.query_row(
        "SELECT id, username, email, password FROM \"user\" WHERE id = ?1",
        [id],
        user_from_row,
    )
    .optional()
    .context("failed to look up user")
}

/// Insert a user. Without an explicit id the next free integer (max + 1) is
/// used. The hydrated row is returned so the caller can report the id.
pub fn add_user(
    conn: &Connection,
    id: Option<i64>,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let id = match id {
        Some(id) => id,
        None => next_id(&tx, Table::User)?,
    };

    tx.execute(
        "INSERT INTO \"user\" (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
        params![id, username, email, password],
    )
    .map_err(|err| map_constraint(err, DataError::ForeignKey { table: Table::User }))
    .context("failed to insert user")?;
    tx.commit().context("failed to commit user insert")?;

    info!(id, username, "user added");
    Ok(User {
        id,
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    })
}

/// Replace every column of the user currently stored under `current_id`,
/// including the id itself.
pub fn update_user(conn: &Connection, current_id: i64, user: &User) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let updated = tx
        .execute(
            "UPDATE \"user\" SET id = ?1, username = ?2, email = ?3, password = ?4
             WHERE id = ?5",
            params![user.id, user.username, user.email, user.password, current_id],
        )
        .map_err(|err| map_constraint(err, DataError::ForeignKey { table: Table::User }))
        .context("failed to update user")?;

    if updated == 0 {
        return Err(DataError::NotFound {
            table: Table::User,
            id: current_id,
        }
        .into());
    }
    tx.commit().context("failed to commit user update")?;
    info!(current_id, new_id = user.id, "user updated");
    Ok(())
}

/// Remove one user. Fails with [`DataError::HasDependents`] while the user
/// still owns entries.
pub fn delete_user(conn: &Connection, id: i64) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let deleted = tx
        .execute("DELETE FROM \"user\" WHERE id = ?1", [id])
        .map_err(|err| map_constraint(err, user_has_entries()))
        .context("failed to delete user")?;

    if deleted == 0 {
        return Err(DataError::NotFound {
            table: Table::User,
            id,
        }
        .into());
    }
    tx.commit().context("failed to commit user delete")?;
    info!(id, "user deleted");
    Ok(())
}

/// Remove every user whose `attr` equals `value`.
pub fn delete_users_by(conn: &Connection, attr: UserAttr, value: &str) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let sql = format!("DELETE FROM \"user\" WHERE {} = ?1", attr.column());
    let deleted = tx
        .execute(&sql, [value])
        .map_err(|err| map_constraint(err, user_has_entries()))
        .context("failed to delete users")?;

    if deleted == 0 {
        return Err(DataError::NoMatch {
            table: Table::User,
            column: attr.column(),
            value: value.to_string(),
        }
        .into());
    }
    tx.commit().context("failed to commit user delete")?;
    info!(%attr, value, deleted, "users deleted");
    Ok(deleted)
}

/// Remove a user together with their entries and the reminders on those
/// entries.
pub fn delete_user_cascade(conn: &Connection, id: i64) -> Result<Removed> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    if find_user(&tx, id)?.is_none() {
        return Err(DataError::NotFound {
            table: Table::User,
            id,
        }
        .into());
    }

    let removed = cascade_user(&tx, id)?;
    tx.commit().context("failed to commit cascading delete")?;
    info!(id, %removed, "user removed with dependents");
    Ok(removed)
}

/// Cascade delete for the user identified by a unique attribute.
pub fn delete_user_cascade_by(conn: &Connection, attr: UserAttr, value: &str) -> Result<Removed> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let sql = format!("SELECT id FROM \"user\" WHERE {} = ?1", attr.column());
    let id: Option<i64> = tx
        .query_row(&sql, [value], |row| row.get(0))
        .optional()
        .context("failed to look up user")?;

    let Some(id) = id else {
        return Err(DataError::NoMatch {
            table: Table::User,
            column: attr.column(),
            value: value.to_string(),
        }
        .into());
    };

    let removed = cascade_user(&tx, id)?;
    tx.commit().context("failed to commit cascading delete")?;
    info!(id, %attr, value, %removed, "user removed with dependents");
    Ok(removed)
}

fn cascade_user(conn: &Connection, id: i64) -> Result<Removed> {
    let reminders = conn
        .execute(
            "DELETE FROM reminder
             WHERE entry_id IN (SELECT entry_id FROM entry WHERE user_id = ?1)",
            [id],
        )
        .context("failed to delete the user's reminders")?;
    let entries = conn
        .execute("DELETE FROM entry WHERE user_id = ?1", [id])
        .context("failed to delete the user's entries")?;
    let users = conn
        .execute("DELETE FROM \"user\" WHERE id = ?1", [id])
        .context("failed to delete user")?;

    Ok(Removed {
        users,
        entries,
        reminders,
    })
}

fn user_has_entries() -> DataError {
    DataError::HasDependents {
        table: Table::User,
        child: Table::Entry,
    }
}

fn username_of(conn: &Connection, user_id: i64) -> Result<String> {
    let username: Option<String> = conn
        .query_row(
            "SELECT username FROM \"user\" WHERE id = ?1",
            [user_id],
            |row| row.get(0),
        )
        .optional()
        .context("failed to look up user")?;

    username.ok_or_else(|| {
        DataError::NotFound {
            table: Table::User,
            id: user_id,
        }
        .into()
    })
}

/// Every entry written by the user, ordered by entry id.
pub fn fetch_user_entries(conn: &Connection, user_id: i64) -> Result<UserEntries> {
    let username = username_of(conn, user_id)?;
    let mut stmt = conn
        .prepare(
            "SELECT entry_id, title, text, user_id FROM entry
             WHERE user_id = ?1
             ORDER BY entry_id",
        )
        .context("failed to prepare user entries query")?;

    let entries = stmt
        .query_map([user_id], |row| {
            Ok(Entry {
                id: row.get(0)?,
                title: row.get(1)?,
                text: row.get(2)?,
                user_id: row.get(3)?,
            })
        })
        .context("failed to iterate user entries")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect user entries")?;

    debug!(user_id, count = entries.len(), "loaded user entries");
    Ok(UserEntries { username, entries })
}

/// Every reminder on the user's entries, joined to the entry title and
/// ordered by reminder time.
pub fn fetch_user_reminders(conn: &Connection, user_id: i64) -> Result<UserReminders> {
    let username = username_of(conn, user_id)?;
    let mut stmt = conn
        .prepare(
            "SELECT r.reminder_id, e.title, r.remind_at, r.active
             FROM reminder r
             INNER JOIN entry e ON r.entry_id = e.entry_id
             WHERE e.user_id = ?1
             ORDER BY r.remind_at, r.reminder_id",
        )
        .context("failed to prepare user reminders query")?;

    let reminders = stmt
        .query_map([user_id], |row| {
            Ok(UserReminder {
                reminder_id: row.get(0)?,
                entry_title: row.get(1)?,
                remind_at: row.get(2)?,
                active: row.get(3)?,
            })
        })
        .context("failed to iterate user reminders")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect user reminders")?;

    debug!(user_id, count = reminders.len(), "loaded user reminders");
    Ok(UserReminders {
        username,
        reminders,
    })
}
