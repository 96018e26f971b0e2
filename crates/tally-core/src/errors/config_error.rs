//! Configuration errors.

use super::error_code::{self, TallyErrorCode};

/// Errors raised while loading `tally.toml` and `TALLY_*` overrides.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}")]
    FileNotFound { path: String },

    #[error("invalid TOML in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("{field}: {message}")]
    ValidationFailed { field: String, message: String },

    #[error("bad value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl TallyErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        error_code::CONFIG_ERROR
    }
}
