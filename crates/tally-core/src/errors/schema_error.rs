//! Errors for declarative schema definitions.

use super::error_code::{self, TallyErrorCode};

/// A `SchemaVersion` that cannot be reconciled as declared.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid identifier {name:?}: must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidIdentifier { name: String },

    #[error("duplicate table {table} in schema version {version}")]
    DuplicateTable { version: u32, table: String },

    #[error("duplicate column {table}.{column}")]
    DuplicateColumn { table: String, column: String },

    #[error("table {table} declares no columns")]
    EmptyTable { table: String },

    #[error("{table}.{column}: default must be a finite number")]
    InvalidDefault { table: String, column: String },

    #[error("index {index} on {table} reuses a name already declared in this schema")]
    DuplicateIndex { table: String, index: String },

    #[error("{table}.{column}: a foreign key column can only default to NULL")]
    ForeignKeyDefault { table: String, column: String },

    #[error("{table}: index {index} lists no columns")]
    EmptyIndex { table: String, index: String },

    #[error("{table}: {context} refers to unknown column {column}")]
    UnknownColumn {
        table: String,
        column: String,
        context: String,
    },

    #[error("{table}: foreign key on {column} references {target}, which is declared later")]
    ForwardReference {
        table: String,
        column: String,
        target: String,
    },

    #[error("schema versions must be strictly increasing: {previous} is followed by {next}")]
    NonIncreasingVersion { previous: u32, next: u32 },

    #[error("no schema versions supplied")]
    NoVersions,

    #[error("schema parse error: {message}")]
    ParseError { message: String },
}

impl TallyErrorCode for SchemaError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ParseError { .. } => error_code::SCHEMA_PARSE_ERROR,
            _ => error_code::SCHEMA_INVALID,
        }
    }
}
