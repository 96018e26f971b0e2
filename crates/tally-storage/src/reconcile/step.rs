//! Migration steps: derived from drift, applied one at a time.

use rusqlite::Connection;
use serde::Serialize;

use super::drift::{DriftReport, TableDrift};
use super::introspect;
use super::outcome::{SkipReason, StepAction, StepOutcome};
use crate::schema::{
    ddl, BackfillSpec, ColumnSpec, DefaultValue, ForeignKey, IndexSpec, SchemaVersion, TableSpec,
};

/// One corrective action. Always additive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum MigrationStep {
    CreateTable {
        table: TableSpec,
    },
    AddColumn {
        table: String,
        column: ColumnSpec,
        foreign_key: Option<ForeignKey>,
    },
    CreateIndex {
        table: String,
        index: IndexSpec,
    },
    Backfill {
        table: String,
        backfill: BackfillSpec,
    },
}

impl MigrationStep {
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable { table } => &table.name,
            Self::AddColumn { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::Backfill { table, .. } => table,
        }
    }

    pub fn column(&self) -> Option<&str> {
        match self {
            Self::AddColumn { column, .. } => Some(&column.name),
            Self::Backfill { backfill, .. } => Some(&backfill.column),
            Self::CreateTable { .. } | Self::CreateIndex { .. } => None,
        }
    }

    /// The SQL this step executes.
    pub fn sql(&self) -> String {
        match self {
            Self::CreateTable { table } => ddl::create_table(table),
            Self::AddColumn {
                table,
                column,
                foreign_key,
            } => ddl::add_column(table, column, foreign_key.as_ref()),
            Self::CreateIndex { table, index } => ddl::create_index(table, index),
            Self::Backfill { table, backfill } => ddl::backfill(table, backfill),
        }
    }

    pub fn is_ddl(&self) -> bool {
        !matches!(self, Self::Backfill { .. })
    }
}

/// Steps that bring one table from `drift` to `table`.
///
/// Order: create or add columns, then the timestamp backfills those additions
/// need, then indexes, then declared backfills (when `with_backfills`).
pub fn plan_table(table: &TableSpec, drift: &TableDrift, with_backfills: bool) -> Vec<MigrationStep> {
    let mut steps = Vec::new();
    if drift.error.is_some() {
        return steps;
    }

    if drift.table_missing {
        steps.push(MigrationStep::CreateTable {
            table: table.clone(),
        });
    } else {
        let added: Vec<&ColumnSpec> = drift
            .missing_columns
            .iter()
            .filter_map(|name| table.find_column(name))
            .collect();

        for column in &added {
            steps.push(MigrationStep::AddColumn {
                table: table.name.clone(),
                column: (*column).clone(),
                foreign_key: table.foreign_key_for(&column.name).cloned(),
            });
        }
        for column in &added {
            if column.default.as_ref().is_some_and(|d| !d.is_constant()) {
                steps.push(MigrationStep::Backfill {
                    table: table.name.clone(),
                    backfill: BackfillSpec::new(
                        column.name.clone(),
                        DefaultValue::CurrentTimestamp.to_sql(),
                    ),
                });
            }
        }
    }

    for index in &table.indexes {
        if drift.missing_indexes.iter().any(|m| m.eq_ignore_ascii_case(&index.name)) {
            steps.push(MigrationStep::CreateIndex {
                table: table.name.clone(),
                index: index.clone(),
            });
        }
    }

    if with_backfills {
        for backfill in &table.backfills {
            steps.push(MigrationStep::Backfill {
                table: table.name.clone(),
                backfill: backfill.clone(),
            });
        }
    }

    steps
}

/// Dry run: every step a reconcile would attempt for `report`.
pub fn plan(schema: &SchemaVersion, report: &DriftReport) -> Vec<MigrationStep> {
    schema
        .tables()
        .iter()
        .filter_map(|table| report.table(&table.name).map(|drift| (table, drift)))
        .flat_map(|(table, drift)| plan_table(table, drift, true))
        .collect()
}

/// Execute one step and classify what happened. Never returns an error.
///
/// Each step re-checks the catalog before running and again after a failure,
/// so a target that already exists is reported as a benign conflict. A
/// statement that succeeds without producing its target (an `IF NOT EXISTS`
/// swallowed by a view, or an index name held by another table) is a failure.
pub fn apply_step(conn: &Connection, step: &MigrationStep) -> StepOutcome {
    let table = step.table();
    let column = step.column();
    let outcome = |action, detail: String| StepOutcome::new(table, column, action, detail);
    let benign = |detail: &str| {
        outcome(
            StepAction::Skipped {
                reason: SkipReason::BenignConflict,
            },
            detail.to_string(),
        )
    };

    let present = || -> rusqlite::Result<bool> {
        match step {
            MigrationStep::CreateTable { table } => introspect::table_exists(conn, &table.name),
            MigrationStep::AddColumn { table, column, .. } => {
                introspect::column_exists(conn, table, &column.name)
            }
            MigrationStep::CreateIndex { table, index } => {
                introspect::index_exists(conn, table, &index.name)
            }
            MigrationStep::Backfill { .. } => Ok(false),
        }
    };

    match present() {
        Ok(true) => return benign("already exists"),
        Ok(false) => {}
        Err(e) => return outcome(StepAction::Failed, format!("introspection failed: {e}")),
    }

    let sql = step.sql();
    match conn.execute(&sql, []) {
        Ok(rows) => {
            let action = match step {
                MigrationStep::CreateTable { .. } => StepAction::Created,
                MigrationStep::AddColumn { .. } => StepAction::Added,
                MigrationStep::CreateIndex { .. } => StepAction::IndexCreated,
                MigrationStep::Backfill { .. } => StepAction::Backfilled { rows },
            };
            if matches!(step, MigrationStep::Backfill { .. }) {
                return outcome(action, sql);
            }
            match present() {
                Ok(true) => outcome(action, sql),
                Ok(false) => outcome(StepAction::Failed, occupied_detail(conn, step)),
                Err(e) => outcome(StepAction::Failed, format!("introspection failed: {e}")),
            }
        }
        Err(e) => match present() {
            Ok(true) => benign("already exists (appeared concurrently)"),
            _ => outcome(StepAction::Failed, e.to_string()),
        },
    }
}

fn occupied_detail(conn: &Connection, step: &MigrationStep) -> String {
    let name = match step {
        MigrationStep::CreateIndex { index, .. } => index.name.as_str(),
        _ => step.table(),
    };
    match introspect::schema_object(conn, name) {
        Ok(Some((kind, owner))) if kind == "index" => {
            format!("{name} is already an index on {owner}")
        }
        Ok(Some((kind, _))) => format!("{name} is occupied by a {kind}"),
        _ => format!("{name} was not created"),
    }
}
