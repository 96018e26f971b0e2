//! Idempotent, additive schema reconciliation.
//!
//! `reconcile` compares a declared `SchemaVersion` with the live catalog and
//! applies the missing pieces one statement at a time: `CREATE TABLE IF NOT
//! EXISTS` for absent tables, one `ALTER TABLE ... ADD COLUMN` per missing
//! column, missing indexes, then guarded backfills. Nothing is ever dropped
//! or renamed. Detection is always re-derived from introspection, so a run
//! that was interrupted heals on the next one, and a second run against the
//! same schema issues no DDL.
//!
//! Failures are recorded per step and never abort the run; the caller
//! decides from the returned `ReconcileResult` whether to refuse startup.

pub mod drift;
pub mod introspect;
pub mod outcome;
pub mod step;

use rusqlite::Connection;

pub use drift::{detect_drift, DriftReport, TableDrift, TypeMismatch};
pub use outcome::{ReconcileResult, ReconcileSummary, SkipReason, StepAction, StepOutcome};
pub use step::{apply_step, plan, plan_table, MigrationStep};

use crate::schema::SchemaVersion;

/// Knobs for a reconcile run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Run declared backfill statements.
    pub run_backfills: bool,
    /// Raise `PRAGMA user_version` to the schema version after a clean run.
    pub stamp_user_version: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            run_backfills: true,
            stamp_user_version: true,
        }
    }
}

/// Reconcile with default options.
pub fn reconcile(conn: &Connection, schema: &SchemaVersion) -> ReconcileResult {
    reconcile_with(conn, schema, &ReconcileOptions::default())
}

pub fn reconcile_with(
    conn: &Connection,
    schema: &SchemaVersion,
    options: &ReconcileOptions,
) -> ReconcileResult {
    let mut result = ReconcileResult::new(schema.version());
    tracing::debug!(version = schema.version(), tables = schema.tables().len(), "reconciling schema");

    for table in schema.tables() {
        let drift = drift::detect_table_drift(conn, table);

        if let Some(error) = &drift.error {
            result.record(StepOutcome::new(
                &table.name,
                None,
                StepAction::Failed,
                format!("introspection failed: {error}"),
            ));
            continue;
        }
        for mismatch in &drift.type_mismatches {
            tracing::warn!(
                table = %table.name,
                column = %mismatch.column,
                expected = %mismatch.expected,
                actual = %mismatch.actual,
                "column type differs from declaration; left unchanged"
            );
        }
        if drift.is_satisfied() {
            result.record(StepOutcome::new(
                &table.name,
                None,
                StepAction::Skipped {
                    reason: SkipReason::AlreadySatisfied,
                },
                "up to date",
            ));
        }

        // Columns that could not be added get no backfills this run.
        let mut failed_columns: Vec<String> = Vec::new();
        for step in plan_table(table, &drift, options.run_backfills) {
            if let MigrationStep::Backfill { backfill, .. } = &step {
                if failed_columns.iter().any(|c| c.eq_ignore_ascii_case(&backfill.column)) {
                    continue;
                }
            }
            let outcome = apply_step(conn, &step);
            if let MigrationStep::AddColumn { column, .. } = &step {
                if outcome.action == StepAction::Failed {
                    failed_columns.push(column.name.clone());
                }
            }
            // A guarded backfill that touched nothing is not worth reporting.
            if outcome.action == (StepAction::Backfilled { rows: 0 }) {
                continue;
            }
            result.record(outcome);
        }
    }

    if options.stamp_user_version && !result.has_failures() {
        result.stamped_version = stamp_user_version(conn, schema.version());
    }

    tracing::info!(version = schema.version(), summary = %result.summary(), "schema reconciled");
    result
}

/// Raise `user_version` if it is below `version`. Returns the value written.
fn stamp_user_version(conn: &Connection, version: u32) -> Option<u32> {
    let current = match introspect::user_version(conn) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "could not read user_version");
            return None;
        }
    };
    if current >= version {
        return None;
    }
    match conn.pragma_update(None, "user_version", version) {
        Ok(()) => Some(version),
        Err(e) => {
            tracing::warn!(error = %e, version, "could not stamp user_version");
            None
        }
    }
}
