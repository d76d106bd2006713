//! Command-line configuration. Every flag can also come from the environment
//! so the tool can be pointed at a scratch database without retyping paths.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::db::default_db_path;

/// Rows shown by the "view table" listings unless overridden.
pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "journal-admin",
    version,
    about = "Terminal admin console for the users / entries / reminders database"
)]
pub struct Cli {
    /// SQLite database file (default: ~/.journal-admin/journal.sqlite)
    #[arg(long, env = "JOURNAL_ADMIN_DB")]
    pub db: Option<PathBuf>,

    /// Number of rows shown when viewing a table
    #[arg(long, env = "JOURNAL_ADMIN_LIMIT", default_value_t = DEFAULT_LIMIT)]
    pub limit: u32,

    /// Directory for the log file (default: next to the database)
    #[arg(long, env = "JOURNAL_ADMIN_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long)]
    pub debug: bool,
}

/// Resolved settings the application runs with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub limit: u32,
    pub debug: bool,
}

impl Cli {
    /// Fill in defaults that depend on the environment.
    pub fn resolve(self) -> Result<Settings> {
        let db_path = match self.db {
            Some(path) => path,
            None => default_db_path()?,
        };
        let log_dir = self.log_dir.unwrap_or_else(|| {
            db_path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
        });

        Ok(Settings {
            db_path,
            log_dir,
            limit: self.limit.max(1),
            debug: self.debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_dir_defaults_to_the_database_directory() -> Result<()> {
        let cli = Cli::try_parse_from(["journal-admin", "--db", "/tmp/scratch/journal.sqlite"])?;
        let settings = cli.resolve()?;
        assert_eq!(settings.db_path, PathBuf::from("/tmp/scratch/journal.sqlite"));
        assert_eq!(settings.log_dir, PathBuf::from("/tmp/scratch"));
        assert_eq!(settings.limit, DEFAULT_LIMIT);
        Ok(())
    }

    #[test]
    fn explicit_flags_win() -> Result<()> {
        let cli = Cli::try_parse_from([
            "journal-admin",
            "--db",
            "local.sqlite",
            "--limit",
            "25",
            "--log-dir",
            "logs",
            "--debug",
        ])?;
        let settings = cli.resolve()?;
        assert_eq!(settings.limit, 25);
        assert_eq!(settings.log_dir, PathBuf::from("logs"));
        assert!(settings.debug);
        Ok(())
    }
}
