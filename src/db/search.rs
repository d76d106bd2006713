use std::time::Instant;

use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::models::{SearchFilters, SearchOutcome, UserSummary};

use super::reminders::timestamp_text;

const SEARCH_BASE: &str = "SELECT
        u.id,
        u.username,
        u.email,
        COUNT(DISTINCT e.entry_id),
        COUNT(DISTINCT r.reminder_id)
    FROM \"user\" u
    LEFT JOIN entry e ON u.id = e.user_id
    LEFT JOIN reminder r ON e.entry_id = r.entry_id
    WHERE 1 = 1";

/// Compose the search statement and its positional parameters. Only the
/// filters that are set contribute a predicate. Text filters are
/// case-insensitive substring matches through the `casefold` function
/// registered on every connection, so `%` and `_` carry no meaning.
fn build_query(filters: &SearchFilters) -> (String, Vec<Value>) {
    let mut sql = String::from(SEARCH_BASE);
    let mut values = Vec::new();

    let substring_filters = [
        ("u.username", &filters.username),
        ("u.email", &filters.email),
        ("e.title", &filters.title),
        ("e.text", &filters.text),
    ];
    for (column, filter) in substring_filters {
        if let Some(needle) = filter.as_deref().filter(|needle| !needle.is_empty()) {
            sql.push_str(&format!(" AND instr(casefold({column}), casefold(?)) > 0"));
            values.push(Value::Text(needle.to_owned()));
        }
    }

    if let Some(active) = filters.active {
        sql.push_str(" AND r.active = ?");
        values.push(Value::Integer(i64::from(active)));
    }

    if let Some(range) = filters.date_range {
        sql.push_str(" AND r.remind_at BETWEEN ? AND ?");
        values.push(Value::Text(timestamp_text(&range.from)));
        values.push(Value::Text(timestamp_text(&range.to)));
    }

    sql.push_str(" GROUP BY u.id, u.username, u.email ORDER BY u.id");
    (sql, values)
}

/// Users joined to their entries and reminders, filtered by every set
/// predicate and grouped per user with counts of the matching entries and
/// reminders.
pub fn search(conn: &Connection, filters: &SearchFilters) -> Result<SearchOutcome> {
    let started = Instant::now();
    let (sql, values) = build_query(filters);
    debug!(%sql, params = values.len(), "running flexible search");

    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare search query")?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            Ok(UserSummary {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                entries: row.get(3)?,
                reminders: row.get(4)?,
            })
        })
        .context("failed to run search")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect search results")?;

    let elapsed = started.elapsed();
    debug!(matches = rows.len(), ?elapsed, "search finished");
    Ok(SearchOutcome { rows, elapsed })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::DateRange;

    #[test]
    fn unfiltered_query_has_no_parameters() {
        let (sql, values) = build_query(&SearchFilters::default());
        assert!(values.is_empty());
        assert!(sql.ends_with("GROUP BY u.id, u.username, u.email ORDER BY u.id"));
        assert!(!sql.contains("casefold"));
    }

    #[test]
    fn each_filter_adds_its_predicate() {
        let day = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let filters = SearchFilters {
            username: Some("ann".into()),
            text: Some("milk".into()),
            active: Some(false),
            date_range: Some(DateRange::days(day, day)),
            ..SearchFilters::default()
        };
        let (sql, values) = build_query(&filters);

        assert!(sql.contains("instr(casefold(u.username), casefold(?)) > 0"));
        assert!(sql.contains("instr(casefold(e.text), casefold(?)) > 0"));
        assert!(!sql.contains("casefold(u.email)"));
        assert!(sql.contains("r.active = ?"));
        assert!(sql.contains("BETWEEN ? AND ?"));
        assert_eq!(
            values,
            vec![
                Value::Text("ann".into()),
                Value::Text("milk".into()),
                Value::Integer(0),
                Value::Text("2025-10-01 00:00:00".into()),
                Value::Text("2025-10-01 23:59:59".into()),
            ]
        );
    }

    #[test]
    fn blank_text_filters_are_skipped() {
        let filters = SearchFilters {
            title: Some(String::new()),
            ..SearchFilters::default()
        };
        let (sql, values) = build_query(&filters);
        assert!(values.is_empty());
        assert!(!sql.contains("e.title"));
    }
}
