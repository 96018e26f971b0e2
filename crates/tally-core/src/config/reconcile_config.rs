//! Startup schema reconciliation policy.

use serde::{Deserialize, Serialize};

/// How the host treats the outcome of the startup reconcile run.
///
/// The reconciler itself never aborts; these settings decide which
/// failed steps the host escalates into a startup error.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Refuse to start if any step failed. Default: false.
    pub fail_on_error: Option<bool>,
    /// Tables whose failed steps always abort startup.
    /// Default: `products`, `sales`, `sale_items`.
    pub required_tables: Vec<String>,
    /// Run declared backfill statements. Default: true.
    pub run_backfills: Option<bool>,
    /// Raise `PRAGMA user_version` after a clean run. Default: true.
    pub stamp_user_version: Option<bool>,
}

impl ReconcileConfig {
    pub fn effective_fail_on_error(&self) -> bool {
        self.fail_on_error.unwrap_or(false)
    }

    /// Returns the tables whose failure is fatal to startup.
    pub fn effective_required_tables(&self) -> Vec<String> {
        if self.required_tables.is_empty() {
            ["products", "sales", "sale_items"]
                .iter()
                .map(|t| t.to_string())
                .collect()
        } else {
            self.required_tables.clone()
        }
    }

    pub fn effective_run_backfills(&self) -> bool {
        self.run_backfills.unwrap_or(true)
    }

    pub fn effective_stamp_user_version(&self) -> bool {
        self.stamp_user_version.unwrap_or(true)
    }
}
