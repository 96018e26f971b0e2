//! SQL rendering for migration steps.
//!
//! Identifiers are validated by `SchemaVersion::new` and double-quoted here.
//! Backfill value expressions are trusted SQL supplied by the application.

use super::column::{ColumnSpec, DefaultValue};
use super::table::{BackfillSpec, ForeignKey, IndexSpec, TableSpec};

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn references_clause(fk: &ForeignKey) -> String {
    let mut sql = format!(
        "REFERENCES {}({})",
        quote_ident(&fk.references_table),
        quote_ident(&fk.references_column)
    );
    if let Some(action) = fk.on_delete {
        sql.push_str(" ON DELETE ");
        sql.push_str(action.sql());
    }
    sql
}

/// Column definition as it appears inside `CREATE TABLE`.
fn column_definition(column: &ColumnSpec, inline_primary_key: bool) -> String {
    let mut sql = format!("{} {}", quote_ident(&column.name), column.ty.sql_name());
    if inline_primary_key {
        sql.push_str(" PRIMARY KEY");
    } else if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default.to_sql());
    }
    sql
}

/// `CREATE TABLE IF NOT EXISTS` for the full table declaration.
pub fn create_table(table: &TableSpec) -> String {
    let pk_columns = table.primary_key_columns();
    let single_pk = pk_columns.len() == 1;

    let mut parts: Vec<String> = table
        .columns
        .iter()
        .map(|c| column_definition(c, single_pk && c.primary_key))
        .collect();

    if pk_columns.len() > 1 {
        let cols: Vec<String> = pk_columns.iter().map(|c| quote_ident(&c.name)).collect();
        parts.push(format!("PRIMARY KEY ({})", cols.join(", ")));
    }
    for fk in &table.foreign_keys {
        parts.push(format!(
            "FOREIGN KEY ({}) {}",
            quote_ident(&fk.column),
            references_clause(fk)
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote_ident(&table.name),
        parts.join(",\n    ")
    )
}

/// `ALTER TABLE ... ADD COLUMN` for one column.
///
/// A `CurrentTimestamp` default is dropped together with `NOT NULL`, since
/// SQLite rejects non-constant defaults on `ADD COLUMN`; the reconciler
/// backfills those rows instead.
pub fn add_column(table: &str, column: &ColumnSpec, fk: Option<&ForeignKey>) -> String {
    let mut sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote_ident(table),
        quote_ident(&column.name),
        column.ty.sql_name()
    );
    if column.primary_key {
        sql.push_str(" PRIMARY KEY");
    }
    let constant_default = column.default.as_ref().filter(|d| d.is_constant());
    let deferred_default = column.default.as_ref().is_some_and(|d| !d.is_constant());
    if !column.nullable && !deferred_default {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = constant_default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default.to_sql());
    }
    if let Some(fk) = fk {
        sql.push(' ');
        sql.push_str(&references_clause(fk));
    }
    sql
}

pub fn create_index(table: &str, index: &IndexSpec) -> String {
    let cols: Vec<String> = index.columns.iter().map(|c| quote_ident(c)).collect();
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {}({})",
        if index.unique { "UNIQUE " } else { "" },
        quote_ident(&index.name),
        quote_ident(table),
        cols.join(", ")
    )
}

/// Guarded UPDATE: only rows still NULL (or holding the sentinel) whose
/// value would actually change are touched, so a repeat run updates nothing.
pub fn backfill(table: &str, backfill: &BackfillSpec) -> String {
    let column = quote_ident(&backfill.column);
    let mut guard = format!("{column} IS NULL");
    if let Some(sentinel) = backfill.sentinel.as_ref().filter(|s| **s != DefaultValue::Null) {
        guard.push_str(&format!(" OR {column} = {}", sentinel.to_sql()));
    }
    format!(
        "UPDATE {table} SET {column} = {value} WHERE ({guard}) AND ({value}) IS NOT {column}",
        table = quote_ident(table),
        value = backfill.value
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSpec, FkAction};

    #[test]
    fn create_table_renders_inline_primary_key_and_foreign_keys() {
        let table = TableSpec::new("sale_items")
            .column(ColumnSpec::integer("id").primary_key())
            .column(ColumnSpec::integer("sale_id").not_null())
            .column(ColumnSpec::real("qty").default(DefaultValue::Integer(1)))
            .foreign_key(ForeignKey::new("sale_id", "sales", "id").on_delete(FkAction::Cascade));

        assert_eq!(
            create_table(&table),
            "CREATE TABLE IF NOT EXISTS \"sale_items\" (\n    \
             \"id\" INTEGER PRIMARY KEY,\n    \
             \"sale_id\" INTEGER NOT NULL,\n    \
             \"qty\" REAL DEFAULT 1,\n    \
             FOREIGN KEY (\"sale_id\") REFERENCES \"sales\"(\"id\") ON DELETE CASCADE\n)"
        );
    }

    #[test]
    fn composite_primary_key_becomes_table_constraint() {
        let table = TableSpec::new("stock")
            .column(ColumnSpec::integer("product_id").primary_key())
            .column(ColumnSpec::text("batch").primary_key());
        let sql = create_table(&table);
        assert!(sql.contains("\"product_id\" INTEGER NOT NULL"));
        assert!(sql.contains("PRIMARY KEY (\"product_id\", \"batch\")"));
    }

    #[test]
    fn add_column_with_literal_default() {
        let col = ColumnSpec::real("price").default(DefaultValue::Integer(0));
        assert_eq!(
            add_column("products", &col, None),
            "ALTER TABLE \"products\" ADD COLUMN \"price\" REAL DEFAULT 0"
        );
    }

    #[test]
    fn add_column_defers_current_timestamp() {
        let col = ColumnSpec::timestamp("updated_at")
            .not_null()
            .default(DefaultValue::CurrentTimestamp);
        assert_eq!(
            add_column("products", &col, None),
            "ALTER TABLE \"products\" ADD COLUMN \"updated_at\" TIMESTAMP"
        );
    }

    #[test]
    fn add_column_carries_foreign_key() {
        let col = ColumnSpec::integer("supplier_id");
        let fk = ForeignKey::new("supplier_id", "suppliers", "id").on_delete(FkAction::SetNull);
        assert_eq!(
            add_column("products", &col, Some(&fk)),
            "ALTER TABLE \"products\" ADD COLUMN \"supplier_id\" INTEGER \
             REFERENCES \"suppliers\"(\"id\") ON DELETE SET NULL"
        );
    }

    #[test]
    fn backfill_guards_on_null_and_sentinel() {
        let bf = BackfillSpec::new("gst_rate", "18.0").with_sentinel(DefaultValue::Integer(0));
        assert_eq!(
            backfill("products", &bf),
            "UPDATE \"products\" SET \"gst_rate\" = 18.0 \
             WHERE (\"gst_rate\" IS NULL OR \"gst_rate\" = 0) AND (18.0) IS NOT \"gst_rate\""
        );
    }

    #[test]
    fn unique_index() {
        let idx = IndexSpec::new("idx_products_barcode", ["barcode"]).unique();
        assert_eq!(
            create_index("products", &idx),
            "CREATE UNIQUE INDEX IF NOT EXISTS \"idx_products_barcode\" ON \"products\"(\"barcode\")"
        );
    }
}
