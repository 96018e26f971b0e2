//! PRAGMA configuration applied to the store connection.
//!
//! WAL mode, NORMAL sync, foreign_keys ON, busy_timeout from config,
//! temp_store MEMORY.

use std::time::Duration;

use rusqlite::Connection;
use tally_core::config::DatabaseConfig;
use tally_core::errors::StorageError;

use super::to_storage_err;

/// Apply performance and safety pragmas to a connection.
pub fn apply_pragmas(conn: &Connection, config: &DatabaseConfig) -> Result<(), StorageError> {
    conn.busy_timeout(Duration::from_millis(config.effective_busy_timeout_ms()))
        .map_err(to_storage_err)?;

    if config.effective_wal() {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(to_storage_err)?;
    }

    conn.execute_batch(
        "
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA temp_store = MEMORY;
        ",
    )
    .map_err(|e| StorageError::SqliteError {
        message: format!("failed to apply pragmas: {e}"),
    })
}

/// Verify that WAL mode is active.
pub fn verify_wal_mode(conn: &Connection) -> Result<bool, StorageError> {
    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .map_err(to_storage_err)?;
    Ok(mode.eq_ignore_ascii_case("wal"))
}

pub fn foreign_keys_enabled(conn: &Connection) -> Result<bool, StorageError> {
    conn.pragma_query_value(None, "foreign_keys", |row| row.get::<_, i64>(0))
        .map(|v| v == 1)
        .map_err(to_storage_err)
}
