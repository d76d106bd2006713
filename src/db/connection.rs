use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use tracing::info;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".journal-admin";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "journal.sqlite";

/// Schema for the three tables. Foreign keys carry no `ON DELETE` action: the
/// engine rejects deleting a parent that still has children and the
/// application removes children explicitly when asked to cascade. Length
/// limits are named so violations can be reported by name.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS "user" (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE CONSTRAINT username_length CHECK (length(username) <= 50),
    email TEXT NOT NULL UNIQUE CONSTRAINT email_length CHECK (length(email) <= 100),
    password TEXT NOT NULL CONSTRAINT password_length CHECK (length(password) <= 100)
);

CREATE TABLE IF NOT EXISTS entry (
    entry_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL CONSTRAINT title_length CHECK (length(title) <= 50),
    text TEXT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES "user"(id)
);

CREATE TABLE IF NOT EXISTS reminder (
    reminder_id INTEGER PRIMARY KEY,
    entry_id INTEGER NOT NULL REFERENCES entry(entry_id),
    remind_at TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS entry_user_id_idx ON entry(user_id);
CREATE INDEX IF NOT EXISTS reminder_entry_id_idx ON reminder(entry_id);
"#;

/// Open the database file at `path`, creating its directory and the schema
/// when missing. Foreign keys are switched on for every connection because
/// SQLite leaves them off by default.
pub fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("failed to create data directory")?;
        }
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database at {}", path.display()))?;
    ensure_schema(&conn)?;
    info!(path = %path.display(), "database ready");
    Ok(conn)
}

/// Same schema on a private in-memory database.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// Enable foreign keys, register the SQL helper functions and create any
/// missing tables and indexes.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;
    register_functions(conn)?;
    conn.execute_batch(SCHEMA_SQL)
        .context("failed to create schema")?;
    Ok(())
}

/// `casefold(text)` lowercases with full Unicode rules; SQLite's own
/// `lower` and `LIKE` only fold ASCII. NULL stays NULL.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )
    .context("failed to register casefold function")?;
    Ok(())
}

/// Resolve the default database location inside the user's home.
pub fn default_db_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creation_is_idempotent() -> Result<()> {
        let conn = open_in_memory()?;
        ensure_schema(&conn)?;

        let tables: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type = 'table' AND name IN ('user', 'entry', 'reminder')",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(tables, 3);

        let foreign_keys: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        assert_eq!(foreign_keys, 1);
        Ok(())
    }

    #[test]
    fn casefold_lowers_beyond_ascii() -> Result<()> {
        let conn = open_in_memory()?;
        let folded: String =
            conn.query_row("SELECT casefold('ÄRGER Олена')", [], |row| row.get(0))?;
        assert_eq!(folded, "ärger олена");

        let missing: Option<String> =
            conn.query_row("SELECT casefold(NULL)", [], |row| row.get(0))?;
        assert_eq!(missing, None);
        Ok(())
    }
}
