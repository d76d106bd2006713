use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rusqlite::Connection;

use journal_admin::db::{
    add_entry, add_reminder, add_user, clear_table, count_rows, delete_entries_by_author,
    delete_entry, delete_entry_cascade, delete_reminders_by_date, delete_reminders_by_status,
    delete_user, delete_user_cascade, delete_user_cascade_by, delete_users_by,
    fetch_user_entries, fetch_user_reminders, fetch_users, find_entry, find_reminder, find_user,
    generate_entries_with, generate_reminders_with, generate_users_with, next_id,
    open_in_memory, purge_all, search, update_entry, update_user, DataError,
};
use journal_admin::models::{DateRange, SearchFilters, Table, User, UserAttr};

fn at(day: u32, hour: u32) -> Result<chrono::NaiveDateTime> {
    NaiveDate::from_ymd_opt(2025, 10, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .ok_or_else(|| anyhow!("bad test timestamp"))
}

fn data_error(err: &anyhow::Error) -> Option<&DataError> {
    err.downcast_ref::<DataError>()
}

/// Two users: ann with two entries and three reminders, bob with nothing.
fn seeded() -> Result<Connection> {
    let conn = open_in_memory()?;
    add_user(&conn, None, "ann", "ann@x.io", "pw1")?;
    add_user(&conn, None, "bob", "bob@y.io", "pw2")?;
    add_entry(&conn, None, "Monday", "went running", 1)?;
    add_entry(&conn, None, "Tuesday", "read a book", 1)?;
    add_reminder(&conn, None, 1, at(1, 9)?, true)?;
    add_reminder(&conn, None, 1, at(2, 9)?, false)?;
    add_reminder(&conn, None, 2, at(3, 18)?, true)?;
    Ok(conn)
}

#[test]
fn auto_ids_continue_from_the_maximum() -> Result<()> {
    let conn = open_in_memory()?;
    assert_eq!(next_id(&conn, Table::User)?, 1);
    assert_eq!(add_user(&conn, None, "ann", "ann@x.io", "pw")?.id, 1);
    add_user(&conn, Some(7), "bob", "bob@y.io", "pw")?;
    assert_eq!(add_user(&conn, None, "cy", "cy@z.io", "pw")?.id, 8);
    Ok(())
}

#[test]
fn deleting_a_user_with_entries_needs_a_cascade() -> Result<()> {
    let conn = seeded()?;

    let err = delete_user(&conn, 1).unwrap_err();
    assert_eq!(
        data_error(&err),
        Some(&DataError::HasDependents {
            table: Table::User,
            child: Table::Entry,
        })
    );
    assert!(find_user(&conn, 1)?.is_some());

    let removed = delete_user_cascade(&conn, 1)?;
    assert_eq!((removed.users, removed.entries, removed.reminders), (1, 2, 3));
    assert!(find_user(&conn, 1)?.is_none());
    assert!(find_entry(&conn, 1)?.is_none());
    assert!(find_reminder(&conn, 1)?.is_none());
    assert!(find_user(&conn, 2)?.is_some());
    Ok(())
}

#[test]
fn cascading_a_missing_user_reports_not_found() -> Result<()> {
    let conn = seeded()?;
    let err = delete_user_cascade(&conn, 99).unwrap_err();
    assert_eq!(
        data_error(&err),
        Some(&DataError::NotFound {
            table: Table::User,
            id: 99,
        })
    );
    Ok(())
}

#[test]
fn entry_cascade_removes_its_reminders() -> Result<()> {
    let conn = seeded()?;
    assert!(data_error(&delete_entry(&conn, 1).unwrap_err())
        .is_some_and(DataError::needs_cascade));

    let removed = delete_entry_cascade(&conn, 1)?;
    assert_eq!((removed.entries, removed.reminders), (1, 2));
    assert_eq!(count_rows(&conn, Table::Reminder)?, 1);
    Ok(())
}

#[test]
fn clearing_a_table_restarts_ids() -> Result<()> {
    let conn = seeded()?;
    let removed = clear_table(&conn, Table::Entry)?;
    assert_eq!((removed.users, removed.entries, removed.reminders), (0, 2, 3));
    assert_eq!(next_id(&conn, Table::Entry)?, 1);
    assert_eq!(count_rows(&conn, Table::User)?, 2);

    let removed = purge_all(&conn)?;
    assert_eq!(removed.users, 2);
    assert_eq!(next_id(&conn, Table::User)?, 1);
    Ok(())
}

#[test]
fn unfiltered_search_counts_every_user() -> Result<()> {
    let conn = seeded()?;
    let outcome = search(&conn, &SearchFilters::default())?;
    let counts: Vec<_> = outcome
        .rows
        .iter()
        .map(|row| (row.id, row.username.as_str(), row.entries, row.reminders))
        .collect();
    assert_eq!(counts, vec![(1, "ann", 2, 3), (2, "bob", 0, 0)]);
    Ok(())
}

#[test]
fn search_filters_narrow_the_result() -> Result<()> {
    let conn = seeded()?;

    let by_name = SearchFilters {
        username: Some("AN".into()),
        ..SearchFilters::default()
    };
    let outcome = search(&conn, &by_name)?;
    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.rows[0].username, "ann");

    let active_in_range = SearchFilters {
        active: Some(true),
        date_range: Some(DateRange::days(
            NaiveDate::from_ymd_opt(2025, 10, 1).ok_or_else(|| anyhow!("bad date"))?,
            NaiveDate::from_ymd_opt(2025, 10, 2).ok_or_else(|| anyhow!("bad date"))?,
        )),
        ..SearchFilters::default()
    };
    let outcome = search(&conn, &active_in_range)?;
    assert_eq!(outcome.rows.len(), 1);
    assert_eq!((outcome.rows[0].entries, outcome.rows[0].reminders), (1, 1));

    let wildcard = SearchFilters {
        title: Some("%".into()),
        ..SearchFilters::default()
    };
    assert!(search(&conn, &wildcard)?.rows.is_empty());
    Ok(())
}

#[test]
fn search_ignores_case_outside_ascii() -> Result<()> {
    let conn = seeded()?;
    add_user(&conn, None, "Олена", "olena@x.io", "pw3")?;
    add_user(&conn, None, "Jürgen", "juergen@x.io", "pw4")?;
    add_entry(&conn, None, "ÉTÉ", "Straße", 4)?;

    let find = |filters: SearchFilters| -> Result<Vec<String>> {
        Ok(search(&conn, &filters)?
            .rows
            .into_iter()
            .map(|row| row.username)
            .collect())
    };

    let cyrillic = SearchFilters {
        username: Some("олена".into()),
        ..SearchFilters::default()
    };
    assert_eq!(find(cyrillic)?, vec!["Олена"]);

    let umlaut = SearchFilters {
        username: Some("JÜRGEN".into()),
        ..SearchFilters::default()
    };
    assert_eq!(find(umlaut)?, vec!["Jürgen"]);

    let accented_title = SearchFilters {
        title: Some("été".into()),
        text: Some("STRASSE".into()),
        ..SearchFilters::default()
    };
    assert!(find(accented_title)?.is_empty());

    let accented_title = SearchFilters {
        title: Some("été".into()),
        text: Some("straße".into()),
        ..SearchFilters::default()
    };
    assert_eq!(find(accented_title)?, vec!["Jürgen"]);
    Ok(())
}

#[test]
fn duplicate_primary_key_update_leaves_the_row_alone() -> Result<()> {
    let conn = seeded()?;
    let moved = User {
        id: 1,
        username: "bobby".into(),
        email: "bob@y.io".into(),
        password: "pw2".into(),
    };

    let err = update_user(&conn, 2, &moved).unwrap_err();
    assert!(matches!(data_error(&err), Some(DataError::Duplicate { .. })));

    let bob = find_user(&conn, 2)?.ok_or_else(|| anyhow!("bob missing"))?;
    assert_eq!(bob.username, "bob");
    Ok(())
}

#[test]
fn updates_report_missing_rows_and_parents() -> Result<()> {
    let conn = seeded()?;
    let mut entry = find_entry(&conn, 2)?.ok_or_else(|| anyhow!("entry missing"))?;

    let err = update_entry(&conn, 42, &entry).unwrap_err();
    assert_eq!(
        data_error(&err),
        Some(&DataError::NotFound {
            table: Table::Entry,
            id: 42,
        })
    );

    entry.user_id = 99;
    let err = update_entry(&conn, 2, &entry).unwrap_err();
    assert!(matches!(data_error(&err), Some(DataError::ForeignKey { .. })));
    Ok(())
}

#[test]
fn over_long_values_are_rejected() -> Result<()> {
    let conn = open_in_memory()?;
    let err = add_user(&conn, None, &"x".repeat(51), "a@b.c", "pw").unwrap_err();
    assert!(matches!(data_error(&err), Some(DataError::ValueTooLong { .. })));
    assert_eq!(count_rows(&conn, Table::User)?, 0);
    Ok(())
}

#[test]
fn attribute_deletes_match_exactly() -> Result<()> {
    let conn = seeded()?;

    let err = delete_users_by(&conn, UserAttr::Email, "nobody@x.io").unwrap_err();
    assert!(matches!(data_error(&err), Some(DataError::NoMatch { .. })));

    assert_eq!(delete_users_by(&conn, UserAttr::Username, "bob")?, 1);
    let err = delete_users_by(&conn, UserAttr::Username, "ann").unwrap_err();
    assert!(data_error(&err).is_some_and(DataError::needs_cascade));

    let removed = delete_user_cascade_by(&conn, UserAttr::Email, "ann@x.io")?;
    assert_eq!(removed.total(), 6);
    assert!(fetch_users(&conn, 10)?.is_empty());
    Ok(())
}

#[test]
fn reminders_delete_by_day_and_status() -> Result<()> {
    let conn = seeded()?;
    let day = NaiveDate::from_ymd_opt(2025, 10, 3).ok_or_else(|| anyhow!("bad date"))?;
    assert_eq!(delete_reminders_by_date(&conn, day)?, 1);
    assert!(delete_reminders_by_date(&conn, day).is_err());

    assert_eq!(delete_reminders_by_status(&conn, false)?, 1);
    assert_eq!(count_rows(&conn, Table::Reminder)?, 1);

    assert!(data_error(&delete_entries_by_author(&conn, "ann").unwrap_err())
        .is_some_and(DataError::needs_cascade));
    Ok(())
}

#[test]
fn per_user_listings() -> Result<()> {
    let conn = seeded()?;

    let entries = fetch_user_entries(&conn, 1)?;
    assert_eq!(entries.username, "ann");
    let titles: Vec<_> = entries.entries.iter().map(|entry| entry.title.as_str()).collect();
    assert_eq!(titles, vec!["Monday", "Tuesday"]);

    let reminders = fetch_user_reminders(&conn, 1)?;
    let order: Vec<_> = reminders
        .reminders
        .iter()
        .map(|reminder| (reminder.reminder_id, reminder.entry_title.as_str()))
        .collect();
    assert_eq!(order, vec![(1, "Monday"), (2, "Monday"), (3, "Tuesday")]);

    assert!(fetch_user_entries(&conn, 2)?.entries.is_empty());
    Ok(())
}

#[test]
fn generating_children_without_parents_is_refused() -> Result<()> {
    let conn = open_in_memory()?;
    let mut rng = StdRng::seed_from_u64(7);

    let err = generate_entries_with(&conn, 5, &mut rng).unwrap_err();
    assert_eq!(
        data_error(&err),
        Some(&DataError::NoParents {
            parent: Table::User,
            child: Table::Entry,
        })
    );
    assert_eq!(count_rows(&conn, Table::Entry)?, 0);

    add_user(&conn, None, "ann", "ann@x.io", "pw")?;
    let err = generate_reminders_with(&conn, 5, &mut rng).unwrap_err();
    assert_eq!(
        data_error(&err),
        Some(&DataError::NoParents {
            parent: Table::Entry,
            child: Table::Reminder,
        })
    );
    assert_eq!(count_rows(&conn, Table::Reminder)?, 0);
    Ok(())
}

#[test]
fn generating_zero_rows_is_refused() -> Result<()> {
    let conn = open_in_memory()?;
    let mut rng = StdRng::seed_from_u64(3);

    let err = generate_users_with(&conn, 0, &mut rng).unwrap_err();
    assert!(matches!(data_error(&err), Some(DataError::InvalidCount)));
    assert_eq!(count_rows(&conn, Table::User)?, 0);
    Ok(())
}

#[test]
fn generation_fills_every_table() -> Result<()> {
    let conn = open_in_memory()?;
    let mut rng = StdRng::seed_from_u64(42);

    let users = generate_users_with(&conn, 20, &mut rng)?;
    assert_eq!((users.count, users.first_id), (20, 1));
    generate_entries_with(&conn, 50, &mut rng)?;
    let reminders = generate_reminders_with(&conn, 100, &mut rng)?;
    assert_eq!(reminders.first_id, 1);

    assert_eq!(count_rows(&conn, Table::User)?, 20);
    assert_eq!(count_rows(&conn, Table::Entry)?, 50);
    assert_eq!(count_rows(&conn, Table::Reminder)?, 100);

    let outcome = search(&conn, &SearchFilters::default())?;
    assert_eq!(outcome.rows.iter().map(|row| row.entries).sum::<i64>(), 50);
    assert_eq!(outcome.rows.iter().map(|row| row.reminders).sum::<i64>(), 100);
    Ok(())
}
