use rusqlite::ffi;
use rusqlite::Error as SqlError;
use thiserror::Error;
use tracing::warn;

use crate::models::Table;

/// Failures the persistence layer reports in terms of the domain. Every other
/// database failure ends up in [`DataError::Database`] with SQLite's own
/// message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("{table} with id {id} not found.")]
    NotFound { table: Table, id: i64 },

    #[error("No {table} rows with {column} = '{value}'.")]
    NoMatch {
        table: Table,
        column: &'static str,
        value: String,
    },

    #[error("Value already in use ({target}): the id, username or email must be unique.")]
    Duplicate { target: String },

    #[error("{parent} id {id} does not exist.")]
    MissingParent { parent: Table, id: i64 },

    #[error("Cannot delete: the {table} still has dependent {child} rows.")]
    HasDependents { table: Table, child: Table },

    #[error("Cannot update {table}: the referenced parent does not exist or dependent rows still use the old id.")]
    ForeignKey { table: Table },

    #[error("Value too long ({constraint}).")]
    ValueTooLong { constraint: String },

    #[error("No {parent} rows exist yet; generate {parent} rows before {child} rows.")]
    NoParents { parent: Table, child: Table },

    #[error("Row count must be greater than zero.")]
    InvalidCount,

    #[error("{0}")]
    Database(String),
}

impl DataError {
    /// True when the failure came from rows that still point at the target,
    /// i.e. a cascade delete would succeed where the plain delete did not.
    pub fn needs_cascade(&self) -> bool {
        matches!(self, DataError::HasDependents { .. })
    }
}

/// Coerce SQLite constraint errors into domain errors. A foreign-key failure
/// means different things depending on the statement, so the caller passes
/// the error to report for that case.
pub(crate) fn map_constraint(err: SqlError, foreign_key: DataError) -> DataError {
    let mapped = match &err {
        SqlError::SqliteFailure(code, message) => {
            let detail = message.as_deref().unwrap_or_default();
            match code.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    DataError::Duplicate {
                        target: constraint_target(detail),
                    }
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => foreign_key,
                ffi::SQLITE_CONSTRAINT_CHECK => DataError::ValueTooLong {
                    constraint: constraint_target(detail),
                },
                _ => DataError::Database(err.to_string()),
            }
        }
        _ => DataError::Database(err.to_string()),
    };
    warn!(error = %err, mapped = %mapped, "statement rejected");
    mapped
}

/// SQLite reports constraint failures as `"<KIND> constraint failed: <target>"`.
fn constraint_target(detail: &str) -> String {
    detail
        .split_once(": ")
        .map(|(_, target)| target.to_string())
        .unwrap_or_else(|| detail.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(extended_code: i32, message: &str) -> SqlError {
        SqlError::SqliteFailure(
            ffi::Error::new(extended_code),
            Some(message.to_string()),
        )
    }

    #[test]
    fn unique_violations_name_the_column() {
        let err = failure(
            ffi::SQLITE_CONSTRAINT_UNIQUE,
            "UNIQUE constraint failed: user.email",
        );
        let mapped = map_constraint(err, DataError::InvalidCount);
        assert_eq!(
            mapped,
            DataError::Duplicate {
                target: "user.email".into()
            }
        );
    }

    #[test]
    fn foreign_key_failures_use_the_callers_error() {
        let err = failure(
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            "FOREIGN KEY constraint failed",
        );
        let mapped = map_constraint(
            err,
            DataError::MissingParent {
                parent: Table::User,
                id: 7,
            },
        );
        assert_eq!(mapped.to_string(), "User id 7 does not exist.");
    }

    #[test]
    fn check_failures_report_the_constraint_name() {
        let err = failure(
            ffi::SQLITE_CONSTRAINT_CHECK,
            "CHECK constraint failed: username_length",
        );
        let mapped = map_constraint(err, DataError::InvalidCount);
        assert_eq!(
            mapped,
            DataError::ValueTooLong {
                constraint: "username_length".into()
            }
        );
    }

    #[test]
    fn other_failures_keep_the_raw_message() {
        let mapped = map_constraint(SqlError::QueryReturnedNoRows, DataError::InvalidCount);
        assert!(matches!(mapped, DataError::Database(_)));
        assert!(!mapped.needs_cascade());
    }
}
