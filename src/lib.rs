//! Core library surface for the journal-admin TUI.
//!
//! `db` holds every data-access operation over the users / entries /
//! reminders schema and can be used without the terminal front-end.
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod ui;

pub use config::{Cli, Settings};
pub use db::DataError;
pub use logging::init_tracing;
pub use models::{Entry, Reminder, Table, User};
pub use ui::{run_app, App};
