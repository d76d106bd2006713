//! Whole-table helpers: id allocation, row counts, truncation and the full
//! purge. Truncation is expressed as plain `DELETE`s in dependency order since
//! SQLite has no `TRUNCATE`; ids are allocated from `MAX(pk) + 1`, so an empty
//! table hands out 1 again.

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

use crate::models::{Removed, Table};

/// Next free primary key for `table`: current maximum plus one, or 1 when the
/// table is empty.
pub fn next_id(conn: &Connection, table: Table) -> Result<i64> {
    let sql = format!(
        "SELECT COALESCE(MAX({}), 0) + 1 FROM {}",
        table.key_column(),
        table.sql_name()
    );
    conn.query_row(&sql, [], |row| row.get(0))
        .with_context(|| format!("failed to compute next {table} id"))
}

pub fn count_rows(conn: &Connection, table: Table) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.sql_name());
    conn.query_row(&sql, [], |row| row.get(0))
        .with_context(|| format!("failed to count {table} rows"))
}

/// Every key currently stored in `table`, used to pick random parents.
pub(crate) fn all_ids(conn: &Connection, table: Table) -> Result<Vec<i64>> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY 1",
        table.key_column(),
        table.sql_name()
    );
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("failed to prepare {table} id query"))?;
    let ids = stmt
        .query_map([], |row| row.get(0))
        .with_context(|| format!("failed to load {table} ids"))?
        .collect::<Result<Vec<i64>, _>>()
        .with_context(|| format!("failed to collect {table} ids"))?;
    Ok(ids)
}

/// Empty `table` and every table that depends on it: clearing users also
/// clears entries and reminders, clearing entries also clears reminders.
pub fn clear_table(conn: &Connection, table: Table) -> Result<Removed> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let removed = truncate_from(&tx, table)?;
    tx.commit().context("failed to commit table clear")?;
    info!(%table, %removed, "table cleared");
    Ok(removed)
}

/// Empty all three tables.
pub fn purge_all(conn: &Connection) -> Result<Removed> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let removed = truncate_from(&tx, Table::User)?;
    tx.commit().context("failed to commit purge")?;
    info!(%removed, "database purged");
    Ok(removed)
}

fn truncate_from(conn: &Connection, table: Table) -> Result<Removed> {
    let mut removed = Removed::default();
    removed.reminders = delete_all(conn, Table::Reminder)?;
    if matches!(table, Table::Entry | Table::User) {
        removed.entries = delete_all(conn, Table::Entry)?;
    }
    if table == Table::User {
        removed.users = delete_all(conn, Table::User)?;
    }
    Ok(removed)
}

fn delete_all(conn: &Connection, table: Table) -> Result<usize> {
    let sql = format!("DELETE FROM {}", table.sql_name());
    conn.execute(&sql, [])
        .with_context(|| format!("failed to clear {table} table"))
}
