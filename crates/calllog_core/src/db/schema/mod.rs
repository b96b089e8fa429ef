//! Create-if-absent schema management.
//!
//! # Responsibility
//! - Create the caller/phone-call tables in one savepoint, so creation nests
//!   under an open transaction and commits on its own otherwise.
//! - Refuse to touch databases written by a newer schema.
//!
//! # Invariants
//! - There is exactly one schema shape; no incremental migration chain.
//! - Created schema version is mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Schema version written by this binary.
pub const SCHEMA_VERSION: u32 = 1;

/// Tables owned by the schema, in creation order.
pub const TABLES: [&str; 3] = ["callers", "phone_calls", "phone_call_topics"];

/// Creates the schema when the database has none.
///
/// Returns `true` when tables were created, `false` when the schema was
/// already present.
pub fn ensure_created(conn: &Connection) -> DbResult<bool> {
    let current = current_user_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: SCHEMA_VERSION,
        });
    }
    if current == SCHEMA_VERSION {
        info!("event=schema_ensure module=db status=ok created=false version={current}");
        return Ok(false);
    }

    conn.execute_batch("SAVEPOINT schema_ensure;")?;
    let created = conn
        .execute_batch(SCHEMA_SQL)
        .and_then(|()| conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};")));
    if let Err(err) = created {
        let _ = conn.execute_batch("ROLLBACK TO schema_ensure; RELEASE schema_ensure;");
        return Err(err.into());
    }
    conn.execute_batch("RELEASE schema_ensure;")?;

    info!("event=schema_ensure module=db status=ok created=true version={SCHEMA_VERSION}");
    Ok(true)
}

/// Reads `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
