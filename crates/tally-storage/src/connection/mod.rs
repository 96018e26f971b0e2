//! Connection management: one owned connection, reconciled at open.

pub mod pragmas;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, ErrorCode};
use tally_core::config::ReconcileConfig;
use tally_core::errors::StorageError;
use tally_core::TallyConfig;

use self::pragmas::apply_pragmas;
use crate::catalog;
use crate::reconcile::{self, ReconcileOptions, ReconcileResult};
use crate::schema::SchemaVersion;

pub(crate) fn to_storage_err(e: rusqlite::Error) -> StorageError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => StorageError::DbBusy {
            message: e.to_string(),
        },
        _ => StorageError::SqliteError {
            message: e.to_string(),
        },
    }
}

impl From<&ReconcileConfig> for ReconcileOptions {
    fn from(config: &ReconcileConfig) -> Self {
        Self {
            run_backfills: config.effective_run_backfills(),
            stamp_user_version: config.effective_stamp_user_version(),
        }
    }
}

/// Decide whether a reconcile result should stop the application starting.
///
/// Fatal when a failure touched a required table, or any failure when
/// `fail_on_error` is set.
pub fn check_startup(result: &ReconcileResult, config: &ReconcileConfig) -> Result<(), StorageError> {
    let failed = result.failed_tables();
    if failed.is_empty() {
        return Ok(());
    }
    let required = config.effective_required_tables();
    let fatal: Vec<String> = if config.effective_fail_on_error() {
        failed
    } else {
        failed
            .into_iter()
            .filter(|t| required.iter().any(|r| r.eq_ignore_ascii_case(t)))
            .collect()
    };
    if fatal.is_empty() {
        tracing::warn!(failures = result.failures().count(), "schema reconciled with non-fatal failures");
        return Ok(());
    }
    Err(StorageError::ReconcileFailed {
        tables: fatal,
        failures: result.failures().count(),
    })
}

/// Owns the store connection for the lifetime of the application.
pub struct DatabaseManager {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    config: TallyConfig,
    startup: ReconcileResult,
}

impl DatabaseManager {
    /// Open the configured database file, apply pragmas, reconcile the POS schema.
    pub fn open(config: &TallyConfig) -> Result<Self, StorageError> {
        let path = config.database.effective_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::SqliteError {
                message: format!("create {}: {e}", parent.display()),
            })?;
        }
        let conn = Connection::open(&path).map_err(to_storage_err)?;
        Self::start(conn, Some(path), config)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory(config: &TallyConfig) -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(to_storage_err)?;
        Self::start(conn, None, config)
    }

    fn start(conn: Connection, path: Option<PathBuf>, config: &TallyConfig) -> Result<Self, StorageError> {
        apply_pragmas(&conn, &config.database)?;

        let schema = catalog::pos_schema()?;
        let options = ReconcileOptions::from(&config.reconcile);
        let startup = reconcile::reconcile_with(&conn, &schema, &options);
        check_startup(&startup, &config.reconcile)?;
        tracing::info!(
            path = %path.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| ":memory:".to_string()),
            version = schema.version(),
            "store ready"
        );

        Ok(Self {
            conn: Mutex::new(conn),
            path,
            config: config.clone(),
            startup,
        })
    }

    /// Run a closure against the owned connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let guard = self.conn.lock().map_err(|_| StorageError::SqliteError {
            message: "connection lock poisoned".to_string(),
        })?;
        f(&guard)
    }

    /// Reconcile an additional schema (e.g. an app extension) on the owned connection.
    pub fn reconcile(&self, schema: &SchemaVersion) -> Result<ReconcileResult, StorageError> {
        let options = ReconcileOptions::from(&self.config.reconcile);
        self.with_conn(|conn| Ok(reconcile::reconcile_with(conn, schema, &options)))
    }

    /// Result of the reconcile run performed at open.
    pub fn startup_report(&self) -> &ReconcileResult {
        &self.startup
    }

    /// Database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
