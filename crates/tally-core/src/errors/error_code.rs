//! Stable error codes for logs and host applications.

/// Every error enum implements this to expose a structured code string
/// the hosting application can match on without parsing messages.
pub trait TallyErrorCode {
    /// Returns the error code string (e.g., "SCHEMA_INVALID").
    fn error_code(&self) -> &'static str;

    /// Returns `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const DB_BUSY: &str = "DB_BUSY";
pub const RECONCILE_FAILED: &str = "RECONCILE_FAILED";
pub const SCHEMA_INVALID: &str = "SCHEMA_INVALID";
pub const SCHEMA_PARSE_ERROR: &str = "SCHEMA_PARSE_ERROR";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
