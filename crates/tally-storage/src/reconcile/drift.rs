//! Drift detection: compare a desired `SchemaVersion` with the live catalog.

use rusqlite::Connection;
use serde::Serialize;

use super::introspect;
use crate::schema::{SchemaVersion, TableSpec};

/// A column present on both sides with a different declared type.
/// Reported only; the reconciler never rewrites existing columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMismatch {
    pub column: String,
    pub expected: String,
    pub actual: String,
}

/// Drift of one declared table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableDrift {
    pub table: String,
    pub table_missing: bool,
    /// Missing column names, in declared order.
    pub missing_columns: Vec<String>,
    /// Missing index names, in declared order.
    pub missing_indexes: Vec<String>,
    pub type_mismatches: Vec<TypeMismatch>,
    /// Set when the table could not be introspected.
    pub error: Option<String>,
}

impl TableDrift {
    /// True when nothing needs to be created or added.
    pub fn is_satisfied(&self) -> bool {
        !self.table_missing
            && self.missing_columns.is_empty()
            && self.missing_indexes.is_empty()
            && self.error.is_none()
    }
}

/// Per-table drift for a whole schema version, in declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    pub version: u32,
    pub tables: Vec<TableDrift>,
}

impl DriftReport {
    pub fn is_empty(&self) -> bool {
        self.tables.iter().all(TableDrift::is_satisfied)
    }

    pub fn table(&self, name: &str) -> Option<&TableDrift> {
        self.tables.iter().find(|t| t.table.eq_ignore_ascii_case(name))
    }

    pub fn missing_tables(&self) -> impl Iterator<Item = &str> {
        self.tables
            .iter()
            .filter(|t| t.table_missing)
            .map(|t| t.table.as_str())
    }
}

/// Compute drift for every declared table. Always read fresh from the catalog.
pub fn detect_drift(conn: &Connection, schema: &SchemaVersion) -> DriftReport {
    DriftReport {
        version: schema.version(),
        tables: schema
            .tables()
            .iter()
            .map(|table| detect_table_drift(conn, table))
            .collect(),
    }
}

pub fn detect_table_drift(conn: &Connection, table: &TableSpec) -> TableDrift {
    let mut drift = TableDrift {
        table: table.name.clone(),
        ..TableDrift::default()
    };

    match introspect::table_exists(conn, &table.name) {
        Ok(true) => {}
        Ok(false) => {
            drift.table_missing = true;
            drift.missing_indexes = table.indexes.iter().map(|i| i.name.clone()).collect();
            return drift;
        }
        Err(e) => {
            drift.error = Some(e.to_string());
            return drift;
        }
    }

    let live = match introspect::table_columns(conn, &table.name) {
        Ok(live) => live,
        Err(e) => {
            drift.error = Some(e.to_string());
            return drift;
        }
    };

    for column in &table.columns {
        match live.iter().find(|l| l.name.eq_ignore_ascii_case(&column.name)) {
            None => drift.missing_columns.push(column.name.clone()),
            Some(existing) => {
                if !existing.declared_type.eq_ignore_ascii_case(column.ty.sql_name()) {
                    drift.type_mismatches.push(TypeMismatch {
                        column: column.name.clone(),
                        expected: column.ty.sql_name().to_string(),
                        actual: existing.declared_type.clone(),
                    });
                }
            }
        }
    }

    for index in &table.indexes {
        match introspect::index_exists(conn, &table.name, &index.name) {
            Ok(true) => {}
            Ok(false) => drift.missing_indexes.push(index.name.clone()),
            Err(e) => {
                drift.error = Some(e.to_string());
                return drift;
            }
        }
    }

    drift
}
