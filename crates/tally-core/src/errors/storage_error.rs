//! Storage-layer errors for SQLite operations.

use super::error_code::{self, TallyErrorCode};
use super::SchemaError;

/// Errors raised while opening, configuring or reconciling the store.
///
/// Individual reconciliation steps never produce these; they are recorded
/// as step outcomes. `ReconcileFailed` is the host-side escalation of those
/// outcomes.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("database busy: {message}")]
    DbBusy { message: String },

    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("schema reconciliation failed for {tables:?}: {failures} failed step(s)")]
    ReconcileFailed { tables: Vec<String>, failures: usize },
}

impl TallyErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::SqliteError { .. } => error_code::STORAGE_ERROR,
            Self::DbBusy { .. } => error_code::DB_BUSY,
            Self::Schema(e) => e.error_code(),
            Self::ReconcileFailed { .. } => error_code::RECONCILE_FAILED,
        }
    }
}
