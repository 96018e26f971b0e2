//! Per-step outcomes and the aggregate result of a reconcile run.

use std::fmt;

use serde::Serialize;

/// Why a step did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The live schema already matched the declaration.
    AlreadySatisfied,
    /// The target appeared between detection and execution.
    BenignConflict,
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    Created,
    Added,
    IndexCreated,
    Backfilled { rows: usize },
    Skipped { reason: SkipReason },
    Failed,
}

impl StepAction {
    /// Whether this action changed the schema.
    pub fn is_ddl(&self) -> bool {
        matches!(self, Self::Created | Self::Added | Self::IndexCreated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub table: String,
    pub column: Option<String>,
    #[serde(flatten)]
    pub action: StepAction,
    pub detail: String,
}

impl StepOutcome {
    pub(crate) fn new(
        table: &str,
        column: Option<&str>,
        action: StepAction,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            table: table.to_string(),
            column: column.map(str::to_string),
            action,
            detail: detail.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.action == StepAction::Failed
    }

    pub(crate) fn log(&self) {
        let column = self.column.as_deref().unwrap_or("-");
        match &self.action {
            StepAction::Failed => tracing::warn!(
                table = %self.table, column, detail = %self.detail, "schema step failed"
            ),
            StepAction::Skipped { reason } => tracing::debug!(
                table = %self.table, column, ?reason, detail = %self.detail, "schema step skipped"
            ),
            action => tracing::info!(
                table = %self.table, column, ?action, detail = %self.detail, "schema step applied"
            ),
        }
    }
}

/// Everything a reconcile run did, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileResult {
    pub version: u32,
    pub outcomes: Vec<StepOutcome>,
    /// `PRAGMA user_version` written at the end of the run, if any.
    pub stamped_version: Option<u32>,
}

impl ReconcileResult {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, outcome: StepOutcome) {
        outcome.log();
        self.outcomes.push(outcome);
    }

    /// Number of statements that changed the schema.
    pub fn ddl_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.action.is_ddl()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(StepOutcome::is_failure)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Distinct tables with at least one failed step, in first-failure order.
    pub fn failed_tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = Vec::new();
        for outcome in self.failures() {
            if !tables.iter().any(|t| t.eq_ignore_ascii_case(&outcome.table)) {
                tables.push(outcome.table.clone());
            }
        }
        tables
    }

    /// No DDL applied and nothing failed.
    pub fn is_clean(&self) -> bool {
        self.ddl_count() == 0 && !self.has_failures()
    }

    pub fn summary(&self) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        for outcome in &self.outcomes {
            match outcome.action {
                StepAction::Created => summary.created += 1,
                StepAction::Added => summary.added += 1,
                StepAction::IndexCreated => summary.indexes += 1,
                StepAction::Backfilled { rows } => summary.backfilled_rows += rows,
                StepAction::Skipped { .. } => summary.skipped += 1,
                StepAction::Failed => summary.failed += 1,
            }
        }
        summary
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Counts per action, for a one-line startup log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub created: usize,
    pub added: usize,
    pub indexes: usize,
    pub backfilled_rows: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} added, {} indexes, {} rows backfilled, {} skipped, {} failed",
            self.created, self.added, self.indexes, self.backfilled_rows, self.skipped, self.failed
        )
    }
}
