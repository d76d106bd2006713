//! Persistence module split across logical submodules: one per table plus
//! the cross-table search, the generators, and whole-table maintenance.

mod connection;
mod entries;
mod error;
mod generate;
mod reminders;
mod search;
mod tables;
mod users;

pub use connection::{default_db_path, ensure_schema, open, open_in_memory};
pub use entries::{
    add_entry, delete_entries_by_author, delete_entries_cascade_by_author, delete_entry,
    delete_entry_cascade, fetch_entries, find_entry, update_entry,
};
pub use error::DataError;
pub use generate::{
    generate_entries, generate_entries_with, generate_reminders, generate_reminders_with,
    generate_users, generate_users_with,
};
pub use reminders::{
    add_reminder, delete_reminder, delete_reminders_by_date, delete_reminders_by_status,
    fetch_reminders, find_reminder, update_reminder,
};
pub use search::search;
pub use tables::{clear_table, count_rows, next_id, purge_all};
pub use users::{
    add_user, delete_user, delete_user_cascade, delete_user_cascade_by, delete_users_by,
    fetch_user_entries, fetch_user_reminders, fetch_users, find_user, update_user,
};
