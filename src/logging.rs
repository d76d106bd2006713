//! Tracing setup. The terminal belongs to the TUI while the app runs, so
//! events go to `journal-admin.log` in the configured log directory.
//!
//!   RUST_LOG=journal_admin=debug journal-admin   # fine-grained filter
//!   journal-admin --debug                       # debug unless RUST_LOG is set

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "journal-admin";
const LOG_FILE_SUFFIX: &str = "log";

/// Install the global subscriber writing plain-text events to the log file.
pub fn init_tracing(log_dir: &Path, debug: bool) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fs::create_dir_all(log_dir).context("failed to create log directory")?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(log_dir)
        .context("failed to open log file")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(appender)
        .with_ansi(false)
        .with_target(debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}
