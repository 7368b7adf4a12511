//! Schema migrations for the night store.
//!
//! # Invariants
//! - Steps are listed in strictly increasing `version` order.
//! - After a step commits, `PRAGMA user_version` equals its version.
//! - A database stamped newer than `latest_version()` is never touched.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// One schema step, applied once per database.
#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    name: "daily_sleep_quality_table",
    sql: include_str!("0001_init.sql"),
}];

/// Highest schema version this build can write.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Reads the schema version stamped on `conn`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}

/// Brings `conn` up to `latest_version()` in a single transaction.
///
/// Returns the number of steps applied; zero when already current.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let from = schema_version(conn)?;
    let to = latest_version();
    if from > to {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: to,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .skip_while(|step| step.version <= from)
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={from} to_version={to} steps={}",
        pending.len()
    );
    Ok(pending.len())
}
