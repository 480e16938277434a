//! Ordered schema steps for the key-value database.
//!
//! Each step runs once, inside the same transaction that bumps
//! `PRAGMA user_version` to its number.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// `(version, sql)` pairs in ascending version order.
const MIGRATIONS: &[(u32, &str)] = &[(1, include_str!("0001_kv_entries.sql"))];

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |(version, _)| *version)
}

/// Brings `conn` up to [`latest_version`].
///
/// Fails with `UnsupportedSchemaVersion` when the file is already ahead.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = user_version(conn)?;
    let to = latest_version();
    if from > to {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: to,
        });
    }

    let pending: Vec<_> = MIGRATIONS
        .iter()
        .filter(|(version, _)| *version > from)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in pending {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", *version)?;
    }
    tx.commit()?;
    info!("event=db_migrate module=db status=ok from_version={from} to_version={to}");
    Ok(())
}

fn user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
