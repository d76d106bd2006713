//! Bulk random data. Each run inserts `count` rows with ids continuing from the
//! current maximum, inside one transaction with a single prepared statement.

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::{params, Connection};
use tracing::info;

use crate::models::{Generated, Table};

use super::error::{map_constraint, DataError};
use super::reminders::timestamp_text;
use super::tables::{all_ids, next_id};

/// Window random reminder timestamps are drawn from.
fn reminder_window() -> (NaiveDateTime, NaiveDateTime) {
    let start = NaiveDate::from_ymd_opt(2025, 9, 1).and_then(|day| day.and_hms_opt(8, 0, 0));
    let end = NaiveDate::from_ymd_opt(2026, 6, 30).and_then(|day| day.and_hms_opt(20, 0, 0));
    match (start, end) {
        (Some(start), Some(end)) => (start, end),
        _ => (NaiveDateTime::MIN, NaiveDateTime::MIN),
    }
}

fn random_letters(rng: &mut impl Rng, len: usize) -> String {
    (0..len).map(|_| rng.gen_range(b'A'..=b'Z') as char).collect()
}

fn random_timestamp(rng: &mut impl Rng) -> NaiveDateTime {
    let (start, end) = reminder_window();
    let span = (end - start).num_seconds();
    start + Duration::seconds(rng.gen_range(0..=span))
}

fn check_count(count: usize) -> Result<()> {
    if count == 0 {
        return Err(DataError::InvalidCount.into());
    }
    Ok(())
}

/// Ids of every row in `parent`, or [`DataError::NoParents`] when it is empty.
fn parent_ids(conn: &Connection, parent: Table, child: Table) -> Result<Vec<i64>> {
    let ids = all_ids(conn, parent)?;
    if ids.is_empty() {
        return Err(DataError::NoParents { parent, child }.into());
    }
    Ok(ids)
}

fn finish(table: Table, count: usize, first_id: i64, started: Instant) -> Generated {
    let generated = Generated {
        table,
        count,
        first_id,
        elapsed: started.elapsed(),
    };
    info!(%table, count, first_id, elapsed = ?generated.elapsed, "rows generated");
    generated
}

pub fn generate_users(conn: &Connection, count: usize) -> Result<Generated> {
    generate_users_with(conn, count, &mut rand::thread_rng())
}

pub fn generate_entries(conn: &Connection, count: usize) -> Result<Generated> {
    generate_entries_with(conn, count, &mut rand::thread_rng())
}

pub fn generate_reminders(conn: &Connection, count: usize) -> Result<Generated> {
    generate_reminders_with(conn, count, &mut rand::thread_rng())
}

/// Users named `<6 letters>_<id>` with email `<3 letters><id>@gen.com` and a
/// ten letter password. The id suffix keeps both unique columns collision free.
pub fn generate_users_with(conn: &Connection, count: usize, rng: &mut impl Rng) -> Result<Generated> {
    check_count(count)?;
    let started = Instant::now();
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let first_id = next_id(&tx, Table::User)?;
    {
        let mut stmt = tx
            .prepare("INSERT INTO \"user\" (id, username, email, password) VALUES (?1, ?2, ?3, ?4)")
            .context("failed to prepare user insert")?;
        for id in (first_id..).take(count) {
            let username = format!("{}_{id}", random_letters(rng, 6));
            let email = format!("{}{id}@gen.com", random_letters(rng, 3));
            let password = random_letters(rng, 10);
            stmt.execute(params![id, username, email, password])
                .map_err(|err| map_constraint(err, DataError::ForeignKey { table: Table::User }))
                .context("failed to insert generated user")?;
        }
    }
    tx.commit().context("failed to commit generated users")?;
    Ok(finish(Table::User, count, first_id, started))
}

/// Entries with ten letter titles and texts, each owned by a uniformly random
/// existing user. Refused when there are no users.
pub fn generate_entries_with(
    conn: &Connection,
    count: usize,
    rng: &mut impl Rng,
) -> Result<Generated> {
    check_count(count)?;
    let user_ids = parent_ids(conn, Table::User, Table::Entry)?;
    let started = Instant::now();
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let first_id = next_id(&tx, Table::Entry)?;
    {
        let mut stmt = tx
            .prepare("INSERT INTO entry (entry_id, title, text, user_id) VALUES (?1, ?2, ?3, ?4)")
            .context("failed to prepare entry insert")?;
        for id in (first_id..).take(count) {
            let title = random_letters(rng, 10);
            let text = random_letters(rng, 10);
            let Some(&user_id) = user_ids.choose(rng) else {
                break;
            };
            stmt.execute(params![id, title, text, user_id])
                .map_err(|err| {
                    map_constraint(
                        err,
                        DataError::MissingParent {
                            parent: Table::User,
                            id: user_id,
                        },
                    )
                })
                .context("failed to insert generated entry")?;
        }
    }
    tx.commit().context("failed to commit generated entries")?;
    Ok(finish(Table::Entry, count, first_id, started))
}

/// Reminders on uniformly random existing entries, due somewhere between
/// 2025-09-01 08:00 and 2026-06-30 20:00, active with probability one half.
/// Refused when there are no entries.
pub fn generate_reminders_with(
    conn: &Connection,
    count: usize,
    rng: &mut impl Rng,
) -> Result<Generated> {
    check_count(count)?;
    let entry_ids = parent_ids(conn, Table::Entry, Table::Reminder)?;
    let started = Instant::now();
    let tx = conn
        .unchecked_transaction()
        .context("failed to start transaction")?;
    let first_id = next_id(&tx, Table::Reminder)?;
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO reminder (reminder_id, entry_id, remind_at, active)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .context("failed to prepare reminder insert")?;
        for id in (first_id..).take(count) {
            let Some(&entry_id) = entry_ids.choose(rng) else {
                break;
            };
            let remind_at = random_timestamp(rng);
            let active = rng.gen_bool(0.5);
            stmt.execute(params![id, entry_id, timestamp_text(&remind_at), active])
                .map_err(|err| {
                    map_constraint(
                        err,
                        DataError::MissingParent {
                            parent: Table::Entry,
                            id: entry_id,
                        },
                    )
                })
                .context("failed to insert generated reminder")?;
        }
    }
    tx.commit().context("failed to commit generated reminders")?;
    Ok(finish(Table::Reminder, count, first_id, started))
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn random_letters_are_capitals() {
        let mut rng = StdRng::seed_from_u64(7);
        let word = random_letters(&mut rng, 32);
        assert_eq!(word.len(), 32);
        assert!(word.chars().all(|ch| ch.is_ascii_uppercase()));
    }

    #[test]
    fn random_timestamps_stay_in_the_window() {
        let mut rng = StdRng::seed_from_u64(11);
        let (start, end) = reminder_window();
        for _ in 0..500 {
            let at = random_timestamp(&mut rng);
            assert!(at >= start && at <= end, "{at} outside window");
        }
    }
}
