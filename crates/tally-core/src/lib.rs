//! Core types for the Tally point-of-sale store: errors, configuration
//! and tracing setup shared by every other crate in the workspace.

pub mod config;
pub mod errors;
pub mod tracing;

pub use config::TallyConfig;
pub use errors::{ConfigError, SchemaError, StorageError, TallyErrorCode};
