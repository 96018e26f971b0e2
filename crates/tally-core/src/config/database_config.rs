//! Database location and connection settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the SQLite store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file path. Default: `tally.db` next to the project config.
    pub path: Option<String>,
    /// SQLite busy timeout in milliseconds. Default: 5000.
    pub busy_timeout_ms: Option<u64>,
    /// Use WAL journaling. Default: true.
    pub wal: Option<bool>,
}

impl DatabaseConfig {
    pub const DEFAULT_PATH: &'static str = "tally.db";

    /// Returns the effective database path.
    pub fn effective_path(&self) -> PathBuf {
        PathBuf::from(self.path.as_deref().unwrap_or(Self::DEFAULT_PATH))
    }

    /// Returns the effective busy timeout, defaulting to 5000ms.
    pub fn effective_busy_timeout_ms(&self) -> u64 {
        self.busy_timeout_ms.unwrap_or(5000)
    }

    pub fn effective_wal(&self) -> bool {
        self.wal.unwrap_or(true)
    }
}
