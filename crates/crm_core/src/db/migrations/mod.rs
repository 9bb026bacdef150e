//! Versioned CRM schema.
//!
//! # Invariants
//! - Registry versions start at 1 and increase by exactly one.
//! - Pending steps run in one transaction; `PRAGMA user_version` is bumped
//!   after each step so it always names the last applied step.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;
use std::cmp::Ordering;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    name: "crm_init",
    sql: include_str!("0001_crm_init.sql"),
}];

/// Returns the latest schema version known by this build.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS
        .iter()
        .map(|step| step.version)
        .max()
        .unwrap_or_default()
}

fn steps_after(version: u32) -> impl Iterator<Item = &'static SchemaStep> {
    SCHEMA_STEPS.iter().filter(move |step| step.version > version)
}

/// Brings the connection's schema up to [`latest_version`].
///
/// A database stamped with a newer version than this build knows is
/// rejected without changes.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = current_user_version(conn)?;
    let to = latest_version();

    match from.cmp(&to) {
        Ordering::Greater => {
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: from,
                latest_supported: to,
            })
        }
        Ordering::Equal => {
            debug!("event=db_migrate module=db status=skip version={from}");
            return Ok(());
        }
        Ordering::Less => {}
    }

    let tx = conn.transaction()?;
    for step in steps_after(from) {
        let started_at = Instant::now();
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        debug!(
            "event=db_migrate_step module=db status=ok version={} name={} duration_ms={}",
            step.version,
            step.name,
            started_at.elapsed().as_millis()
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from={from} to={to}");
    Ok(())
}

/// Reads `PRAGMA user_version` from a connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, current_user_version, latest_version, steps_after, SCHEMA_STEPS};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn registry_versions_are_contiguous_from_one() {
        for (index, step) in SCHEMA_STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.name);
        }
        assert_eq!(latest_version() as usize, SCHEMA_STEPS.len());
    }

    #[test]
    fn pending_steps_depend_on_current_version() {
        assert_eq!(steps_after(0).count(), SCHEMA_STEPS.len());
        assert_eq!(steps_after(latest_version()).count(), 0);
    }

    #[test]
    fn raw_connection_is_stamped_with_latest_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(current_user_version(&conn).unwrap(), 0);

        apply_migrations(&mut conn).unwrap();
        assert_eq!(current_user_version(&conn).unwrap(), latest_version());

        apply_migrations(&mut conn).unwrap();
        assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn newer_schema_is_left_untouched() {
        let mut conn = Connection::open_in_memory().unwrap();
        let future = latest_version() + 1;
        conn.pragma_update(None, "user_version", future).unwrap();

        let err = apply_migrations(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            DbError::UnsupportedSchemaVersion { db_version, .. } if db_version == future
        ));
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);
    }
}
