//! Top-level Tally configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{DatabaseConfig, ReconcileConfig};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`TALLY_*`)
/// 2. Project config (`tally.toml` in the project root)
/// 3. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TallyConfig {
    pub database: DatabaseConfig,
    pub reconcile: ReconcileConfig,
}

impl TallyConfig {
    pub const FILE_NAME: &'static str = "tally.toml";

    /// Load configuration for the project rooted at `root`.
    ///
    /// A missing `tally.toml` is not an error; an unreadable or invalid one is.
    /// A relative `database.path` is resolved against `root`.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let project_config_path = root.join(Self::FILE_NAME);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
            ::tracing::debug!(path = %project_config_path.display(), "loaded project config");
        }

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

        let db_path = config.database.effective_path();
        if db_path.is_relative() {
            config.database.path = Some(root.join(db_path).display().to_string());
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &TallyConfig) -> Result<(), ConfigError> {
        if let Some(path) = &config.database.path {
            if path.trim().is_empty() {
                return Err(ConfigError::ValidationFailed {
                    field: "database.path".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }
        if config.database.busy_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "database.busy_timeout_ms".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config
            .reconcile
            .required_tables
            .iter()
            .any(|t| t.trim().is_empty())
        {
            return Err(ConfigError::ValidationFailed {
                field: "reconcile.required_tables".to_string(),
                message: "table names must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn merge_toml_file(config: &mut TallyConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: TallyConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins only where it sets a value.
    fn merge(base: &mut TallyConfig, other: &TallyConfig) {
        // Database
        if other.database.path.is_some() {
            base.database.path = other.database.path.clone();
        }
        if other.database.busy_timeout_ms.is_some() {
            base.database.busy_timeout_ms = other.database.busy_timeout_ms;
        }
        if other.database.wal.is_some() {
            base.database.wal = other.database.wal;
        }

        // Reconcile
        if other.reconcile.fail_on_error.is_some() {
            base.reconcile.fail_on_error = other.reconcile.fail_on_error;
        }
        if !other.reconcile.required_tables.is_empty() {
            base.reconcile.required_tables = other.reconcile.required_tables.clone();
        }
        if other.reconcile.run_backfills.is_some() {
            base.reconcile.run_backfills = other.reconcile.run_backfills;
        }
        if other.reconcile.stamp_user_version.is_some() {
            base.reconcile.stamp_user_version = other.reconcile.stamp_user_version;
        }
    }

    /// Apply `TALLY_*` overrides read through `lookup`.
    pub(crate) fn apply_env_overrides<F>(
        config: &mut TallyConfig,
        lookup: F,
    ) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("TALLY_DB_PATH") {
            config.database.path = Some(val);
        }
        if let Some(val) = lookup("TALLY_BUSY_TIMEOUT_MS") {
            let v = val.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                field: "TALLY_BUSY_TIMEOUT_MS".to_string(),
                message: e.to_string(),
            })?;
            config.database.busy_timeout_ms = Some(v);
        }
        if let Some(val) = lookup("TALLY_FAIL_ON_ERROR") {
            let v = val.parse::<bool>().map_err(|e| ConfigError::InvalidValue {
                field: "TALLY_FAIL_ON_ERROR".to_string(),
                message: e.to_string(),
            })?;
            config.reconcile.fail_on_error = Some(v);
        }
        Ok(())
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}
