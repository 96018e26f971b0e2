//! Live catalog queries. Every decision the reconciler makes starts here.

use rusqlite::{params, Connection, OptionalExtension};

/// A column as reported by `pragma_table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    pub name: String,
    pub declared_type: String,
}

pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        params![table],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

/// True only when `index` exists and belongs to `table`.
pub fn index_exists(conn: &Connection, table: &str, index: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master \
         WHERE type = 'index' AND name = ?1 COLLATE NOCASE AND tbl_name = ?2 COLLATE NOCASE",
        params![index, table],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

/// Type and owning table of whatever schema object holds `name`.
pub fn schema_object(conn: &Connection, name: &str) -> rusqlite::Result<Option<(String, String)>> {
    conn.query_row(
        "SELECT type, tbl_name FROM sqlite_master WHERE name = ?1 COLLATE NOCASE",
        params![name],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

/// Columns of `table` in declaration order. Empty if the table is absent.
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<LiveColumn>> {
    let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1)")?;
    let rows = stmt.query_map(params![table], |row| {
        Ok(LiveColumn {
            name: row.get(0)?,
            declared_type: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    Ok(table_columns(conn, table)?
        .iter()
        .any(|c| c.name.eq_ignore_ascii_case(column)))
}

/// All user tables, sorted by name.
pub fn table_names(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

pub fn user_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}
