use anyhow::Error;
use chrono::NaiveDateTime;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::db::DataError;
use crate::models::TIMESTAMP_FORMAT;

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant message from a chained error: the domain error
/// when the persistence layer produced one, otherwise the root cause.
pub(crate) fn surface_error(err: &Error) -> String {
    if let Some(data_err) = err.downcast_ref::<DataError>() {
        return data_err.to_string();
    }
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

/// True when a delete failed only because child rows still reference the
/// target, so offering a cascade makes sense.
pub(crate) fn needs_cascade(err: &Error) -> bool {
    err.downcast_ref::<DataError>()
        .is_some_and(DataError::needs_cascade)
}

pub(crate) fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn format_flag(active: bool) -> String {
    if active { "yes" } else { "no" }.to_string()
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Context};

    use super::*;
    use crate::models::Table;

    #[test]
    fn domain_errors_win_over_context() {
        let err = Err::<(), _>(DataError::HasDependents {
            table: Table::User,
            child: Table::Entry,
        })
        .context("failed to delete user")
        .unwrap_err();

        assert_eq!(
            surface_error(&err),
            "Cannot delete: the User still has dependent Entry rows."
        );
        assert!(needs_cascade(&err));
    }

    #[test]
    fn plain_errors_surface_their_root_cause() {
        let err = anyhow!("disk full").context("failed to insert user");
        assert_eq!(surface_error(&err), "disk full");
        assert!(!needs_cascade(&err));
    }
}
