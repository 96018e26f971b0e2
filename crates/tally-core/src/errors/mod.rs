//! Error handling for Tally.
//! One error enum per concern, `thiserror` only.

pub mod config_error;
pub mod error_code;
pub mod schema_error;
pub mod storage_error;

pub use config_error::ConfigError;
pub use error_code::TallyErrorCode;
pub use schema_error::SchemaError;
pub use storage_error::StorageError;
