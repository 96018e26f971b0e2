//! Versioned desired end-state of the schema.

use serde::{Deserialize, Serialize};
use tally_core::errors::SchemaError;

use super::column::DefaultValue;
use super::table::TableSpec;

/// An ordered set of tables describing the schema at `version`.
///
/// Only constructible through validation, so the reconciler can rely on
/// well-formed identifiers and internally consistent references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSchemaVersion")]
pub struct SchemaVersion {
    version: u32,
    #[serde(rename = "table")]
    tables: Vec<TableSpec>,
}

#[derive(Deserialize)]
struct RawSchemaVersion {
    version: u32,
    #[serde(default, rename = "table")]
    tables: Vec<TableSpec>,
}

impl TryFrom<RawSchemaVersion> for SchemaVersion {
    type Error = SchemaError;

    fn try_from(raw: RawSchemaVersion) -> Result<Self, Self::Error> {
        Self::new(raw.version, raw.tables)
    }
}

impl SchemaVersion {
    pub fn new(version: u32, tables: Vec<TableSpec>) -> Result<Self, SchemaError> {
        validate(version, &tables)?;
        Ok(Self { version, tables })
    }

    /// Parse a schema declared in TOML:
    ///
    /// ```toml
    /// version = 2
    ///
    /// [[table]]
    /// name = "products"
    /// columns = [
    ///     { name = "id", type = "integer", primary_key = true },
    ///     { name = "price", type = "real", default = 0 },
    /// ]
    /// ```
    pub fn from_toml(toml_str: &str) -> Result<Self, SchemaError> {
        toml::from_str(toml_str).map_err(|e| SchemaError::ParseError {
            message: e.to_string(),
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// The last of a sequence of versions, checking they strictly increase.
    pub fn latest(versions: &[SchemaVersion]) -> Result<&SchemaVersion, SchemaError> {
        for pair in versions.windows(2) {
            if pair[1].version <= pair[0].version {
                return Err(SchemaError::NonIncreasingVersion {
                    previous: pair[0].version,
                    next: pair[1].version,
                });
            }
        }
        versions.last().ok_or(SchemaError::NoVersions)
    }
}

pub(crate) fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_identifier(name: &str) -> Result<(), SchemaError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

fn validate(version: u32, tables: &[TableSpec]) -> Result<(), SchemaError> {
    // Index names share one namespace across the whole database.
    let mut index_names: Vec<&str> = Vec::new();
    for (position, table) in tables.iter().enumerate() {
        check_identifier(&table.name)?;
        if tables[..position]
            .iter()
            .any(|t| t.name.eq_ignore_ascii_case(&table.name))
        {
            return Err(SchemaError::DuplicateTable {
                version,
                table: table.name.clone(),
            });
        }
        if table.columns.is_empty() {
            return Err(SchemaError::EmptyTable {
                table: table.name.clone(),
            });
        }

        for (i, column) in table.columns.iter().enumerate() {
            check_identifier(&column.name)?;
            if table.columns[..i].iter().any(|c| c.is_named(&column.name)) {
                return Err(SchemaError::DuplicateColumn {
                    table: table.name.clone(),
                    column: column.name.clone(),
                });
            }
            if let Some(default) = &column.default {
                if !default.is_finite() {
                    return Err(SchemaError::InvalidDefault {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }

        for fk in &table.foreign_keys {
            require_column(table, &fk.column, "foreign key")?;
            let non_null_default = table
                .find_column(&fk.column)
                .and_then(|c| c.default.as_ref())
                .is_some_and(|d| *d != DefaultValue::Null);
            if non_null_default {
                return Err(SchemaError::ForeignKeyDefault {
                    table: table.name.clone(),
                    column: fk.column.clone(),
                });
            }
            check_identifier(&fk.references_table)?;
            check_identifier(&fk.references_column)?;
            if fk.references_table.eq_ignore_ascii_case(&table.name) {
                require_column(table, &fk.references_column, "self reference")?;
                continue;
            }
            let declared_later = tables[position + 1..]
                .iter()
                .any(|t| t.name.eq_ignore_ascii_case(&fk.references_table));
            if declared_later {
                return Err(SchemaError::ForwardReference {
                    table: table.name.clone(),
                    column: fk.column.clone(),
                    target: fk.references_table.clone(),
                });
            }
            if let Some(target) = tables[..position]
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(&fk.references_table))
            {
                require_column(target, &fk.references_column, "referenced column")?;
            }
        }

        for index in &table.indexes {
            check_identifier(&index.name)?;
            if index_names.iter().any(|n| n.eq_ignore_ascii_case(&index.name)) {
                return Err(SchemaError::DuplicateIndex {
                    table: table.name.clone(),
                    index: index.name.clone(),
                });
            }
            index_names.push(&index.name);
            if index.columns.is_empty() {
                return Err(SchemaError::EmptyIndex {
                    table: table.name.clone(),
                    index: index.name.clone(),
                });
            }
            for column in &index.columns {
                require_column(table, column, &format!("index {}", index.name))?;
            }
        }

        for backfill in &table.backfills {
            require_column(table, &backfill.column, "backfill")?;
        }
    }
    Ok(())
}

fn require_column(table: &TableSpec, column: &str, context: &str) -> Result<(), SchemaError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(SchemaError::UnknownColumn {
            table: table.name.clone(),
            column: column.to_string(),
            context: context.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSpec, ForeignKey, IndexSpec};

    fn products() -> TableSpec {
        TableSpec::new("products")
            .column(ColumnSpec::integer("id").primary_key())
            .column(ColumnSpec::text("name").not_null())
    }

    #[test]
    fn identifiers_are_restricted() {
        assert!(is_valid_identifier("sale_items"));
        assert!(is_valid_identifier("_tmp1"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("name; DROP TABLE x"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn duplicate_table_names_are_rejected_case_insensitively() {
        let err = SchemaVersion::new(1, vec![products(), {
            let mut t = products();
            t.name = "PRODUCTS".to_string();
            t
        }])
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateTable { .. }));
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let table = products().column(ColumnSpec::text("Name"));
        let err = SchemaVersion::new(1, vec![table]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateColumn { .. }));
    }

    #[test]
    fn foreign_key_must_name_a_declared_column() {
        let table = products().foreign_key(ForeignKey::new("category_id", "categories", "id"));
        let err = SchemaVersion::new(1, vec![table]).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownColumn { .. }));
    }

    #[test]
    fn forward_references_are_rejected() {
        let sales = TableSpec::new("sales")
            .column(ColumnSpec::integer("id").primary_key())
            .column(ColumnSpec::integer("product_id"))
            .foreign_key(ForeignKey::new("product_id", "products", "id"));
        let err = SchemaVersion::new(1, vec![sales, products()]).unwrap_err();
        assert!(matches!(err, SchemaError::ForwardReference { .. }));
    }

    #[test]
    fn index_columns_must_exist() {
        let table = products().index(IndexSpec::new("idx_products_sku", ["sku"]));
        assert!(SchemaVersion::new(1, vec![table]).is_err());
    }

    #[test]
    fn index_names_must_be_unique_across_tables() {
        let sales = TableSpec::new("sales")
            .column(ColumnSpec::text("invoice_no"))
            .index(IndexSpec::new("idx_invoice", ["invoice_no"]).unique());
        let purchases = TableSpec::new("purchases")
            .column(ColumnSpec::text("invoice_no"))
            .index(IndexSpec::new("IDX_INVOICE", ["invoice_no"]).unique());

        let err = SchemaVersion::new(1, vec![sales, purchases]).unwrap_err();
        match err {
            SchemaError::DuplicateIndex { table, .. } => assert_eq!(table, "purchases"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn foreign_key_column_cannot_default_to_a_value() {
        let sales = TableSpec::new("sales")
            .column(ColumnSpec::integer("id").primary_key())
            .column(ColumnSpec::integer("product_id").default(DefaultValue::Integer(1)))
            .foreign_key(ForeignKey::new("product_id", "products", "id"));
        let err = SchemaVersion::new(1, vec![products(), sales.clone()]).unwrap_err();
        assert!(matches!(err, SchemaError::ForeignKeyDefault { .. }));

        let mut nullable = sales;
        nullable.columns[1].default = Some(DefaultValue::Null);
        assert!(SchemaVersion::new(1, vec![products(), nullable]).is_ok());
    }

    #[test]
    fn latest_requires_strictly_increasing_versions() {
        let v1 = SchemaVersion::new(1, vec![products()]).unwrap();
        let v2 = SchemaVersion::new(2, vec![products()]).unwrap();
        assert_eq!(SchemaVersion::latest(&[v1.clone(), v2.clone()]).unwrap().version(), 2);

        let err = SchemaVersion::latest(&[v2, v1]).unwrap_err();
        assert!(matches!(err, SchemaError::NonIncreasingVersion { previous: 2, next: 1 }));
        assert!(matches!(SchemaVersion::latest(&[]), Err(SchemaError::NoVersions)));
    }

    #[test]
    fn parses_toml_declaration() {
        let schema = SchemaVersion::from_toml(
            r#"
            version = 3

            [[table]]
            name = "products"
            columns = [
                { name = "id", type = "integer", primary_key = true },
                { name = "name", type = "text", nullable = false },
                { name = "gst_rate", type = "real", default = 18.0 },
                { name = "created_at", type = "timestamp", default = "current_timestamp" },
            ]
            backfills = [{ column = "gst_rate", value = "18.0", sentinel = 0 }]
            "#,
        )
        .unwrap();

        assert_eq!(schema.version(), 3);
        let products = schema.table("products").unwrap();
        assert_eq!(products.columns.len(), 4);
        assert!(!products.find_column("name").unwrap().nullable);
        assert_eq!(
            products.find_column("created_at").unwrap().default,
            Some(crate::schema::DefaultValue::CurrentTimestamp)
        );
    }

    #[test]
    fn invalid_toml_schema_fails_validation() {
        let err = SchemaVersion::from_toml(
            r#"
            version = 1
            [[table]]
            name = "bad name"
            columns = [{ name = "id", type = "integer" }]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::ParseError { .. }));
    }
}
