//! Property tests: idempotence and additive-only over random legacy tables.

use proptest::prelude::*;
use rusqlite::Connection;
use tally_storage::reconcile::introspect::table_columns;
use tally_storage::reconcile::reconcile;
use tally_storage::schema::{ColumnSpec, DefaultValue, SchemaVersion, TableSpec};

/// Columns the desired schema declares, with the legacy DDL for each.
fn candidates() -> Vec<(ColumnSpec, &'static str)> {
    vec![
        (ColumnSpec::text("name"), "name TEXT"),
        (
            ColumnSpec::real("price").default(DefaultValue::Integer(0)),
            "price REAL DEFAULT 0",
        ),
        (
            ColumnSpec::integer("qty").not_null().default(DefaultValue::Integer(1)),
            "qty INTEGER NOT NULL DEFAULT 1",
        ),
        (
            ColumnSpec::boolean("active").default(DefaultValue::Bool(true)),
            "active BOOLEAN DEFAULT 1",
        ),
        (
            ColumnSpec::timestamp("added_on").default(DefaultValue::CurrentTimestamp),
            "added_on TIMESTAMP",
        ),
        (
            ColumnSpec::text("notes").default(DefaultValue::Text("n/a".to_string())),
            "notes TEXT DEFAULT 'n/a'",
        ),
    ]
}

const LEGACY_ONLY: [&str; 2] = ["legacy_code TEXT", "old_flag INTEGER"];

fn desired() -> SchemaVersion {
    let mut table = TableSpec::new("items").column(ColumnSpec::integer("id").primary_key());
    for (column, _) in candidates() {
        table = table.column(column);
    }
    SchemaVersion::new(1, vec![table]).unwrap()
}

fn column_set(conn: &Connection) -> Vec<String> {
    let mut names: Vec<String> = table_columns(conn, "items")
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    names.sort();
    names
}

fn schema_sql(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT sql FROM sqlite_master WHERE sql IS NOT NULL ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .filter_map(|r| r.ok())
        .collect()
}

/// Build a legacy `items` table (or none) from the chosen column subsets.
fn legacy_db(table_exists: bool, present: &[bool], extras: &[bool], rows: usize) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    if table_exists {
        let mut defs = vec!["id INTEGER PRIMARY KEY".to_string()];
        for ((_, ddl), keep) in candidates().iter().zip(present) {
            if *keep {
                defs.push(ddl.to_string());
            }
        }
        for (ddl, keep) in LEGACY_ONLY.iter().zip(extras) {
            if *keep {
                defs.push(ddl.to_string());
            }
        }
        conn.execute_batch(&format!("CREATE TABLE items ({})", defs.join(", ")))
            .unwrap();
        for _ in 0..rows {
            conn.execute("INSERT INTO items DEFAULT VALUES", []).unwrap();
        }
    }
    conn
}

proptest! {
    #[test]
    fn prop_second_run_is_a_no_op(
        table_exists in any::<bool>(),
        present in proptest::collection::vec(any::<bool>(), 6),
        extras in proptest::collection::vec(any::<bool>(), 2),
        rows in 0usize..5,
    ) {
        let conn = legacy_db(table_exists, &present, &extras, rows);
        let schema = desired();

        let first = reconcile(&conn, &schema);
        prop_assert!(!first.has_failures(), "{:?}", first.outcomes);
        let after_first = schema_sql(&conn);

        let second = reconcile(&conn, &schema);
        prop_assert_eq!(second.ddl_count(), 0);
        prop_assert!(second.is_clean());
        prop_assert_eq!(schema_sql(&conn), after_first);
    }

    #[test]
    fn prop_reconcile_only_adds(
        present in proptest::collection::vec(any::<bool>(), 6),
        extras in proptest::collection::vec(any::<bool>(), 2),
        rows in 0usize..5,
    ) {
        let conn = legacy_db(true, &present, &extras, rows);
        let before = column_set(&conn);

        let result = reconcile(&conn, &desired());
        let after = column_set(&conn);

        for column in &before {
            prop_assert!(after.contains(column), "lost column {}", column);
        }
        let mut expected: Vec<String> = std::iter::once("id".to_string())
            .chain(candidates().into_iter().map(|(c, _)| c.name))
            .chain(before.iter().cloned())
            .collect();
        expected.sort();
        expected.dedup();
        prop_assert_eq!(after, expected);

        let missing = present.iter().filter(|p| !**p).count();
        prop_assert_eq!(result.summary().added, missing);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap();
        prop_assert_eq!(count as usize, rows);
    }
}
