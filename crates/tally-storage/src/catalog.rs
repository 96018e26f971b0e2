//! The point-of-sale store schema.
//!
//! Tables are declared in foreign-key order. Amounts are stored as REAL
//! rupees; GST rates as percentages.

use tally_core::errors::SchemaError;

use crate::schema::{
    BackfillSpec, ColumnSpec, DefaultValue, FkAction, ForeignKey, IndexSpec, SchemaVersion,
    TableSpec,
};

pub const CATALOG_VERSION: u32 = 7;

/// GST slab applied to products that predate per-product rates.
pub const DEFAULT_GST_RATE: f64 = 18.0;

fn id() -> ColumnSpec {
    ColumnSpec::integer("id").primary_key()
}

fn created_at() -> ColumnSpec {
    ColumnSpec::timestamp("created_at").default(DefaultValue::CurrentTimestamp)
}

fn money(name: &str) -> ColumnSpec {
    ColumnSpec::real(name).not_null().default(DefaultValue::Integer(0))
}

fn categories() -> TableSpec {
    TableSpec::new("categories")
        .column(id())
        .column(ColumnSpec::text("name").not_null())
        .column(created_at())
        .index(IndexSpec::new("idx_categories_name", ["name"]).unique())
}

fn party(name: &str) -> TableSpec {
    TableSpec::new(name)
        .column(id())
        .column(ColumnSpec::text("name").not_null())
        .column(ColumnSpec::text("phone"))
        .column(ColumnSpec::text("email"))
        .column(ColumnSpec::text("address"))
        .column(ColumnSpec::text("gstin"))
        .column(ColumnSpec::text("state_code"))
        .column(money("balance"))
        .column(created_at())
        .index(IndexSpec::new(format!("idx_{name}_phone"), ["phone"]))
}

fn products() -> TableSpec {
    TableSpec::new("products")
        .column(id())
        .column(ColumnSpec::text("name").not_null())
        .column(ColumnSpec::text("barcode"))
        .column(ColumnSpec::text("hsn_code"))
        .column(ColumnSpec::integer("category_id"))
        .column(ColumnSpec::integer("supplier_id"))
        .column(ColumnSpec::text("unit").not_null().default(DefaultValue::Text("pcs".to_string())))
        .column(money("mrp"))
        .column(money("selling_price"))
        .column(money("purchase_price"))
        .column(ColumnSpec::real("gst_rate").not_null().default(DefaultValue::Real(DEFAULT_GST_RATE)))
        .column(ColumnSpec::boolean("price_includes_gst").not_null().default(DefaultValue::Bool(true)))
        .column(ColumnSpec::real("stock").not_null().default(DefaultValue::Integer(0)))
        .column(ColumnSpec::real("reorder_level").not_null().default(DefaultValue::Integer(0)))
        .column(ColumnSpec::boolean("active").not_null().default(DefaultValue::Bool(true)))
        .column(created_at())
        .column(ColumnSpec::timestamp("updated_at").default(DefaultValue::CurrentTimestamp))
        .foreign_key(ForeignKey::new("category_id", "categories", "id").on_delete(FkAction::SetNull))
        .foreign_key(ForeignKey::new("supplier_id", "suppliers", "id").on_delete(FkAction::SetNull))
        .index(IndexSpec::new("idx_products_barcode", ["barcode"]).unique())
        .index(IndexSpec::new("idx_products_name", ["name"]))
        // Legacy rows carried a zero selling price until it was split from MRP.
        .backfill(BackfillSpec::new("selling_price", "mrp").with_sentinel(DefaultValue::Integer(0)))
}

fn document(name: &str, party_table: &str, party_column: &str) -> TableSpec {
    TableSpec::new(name)
        .column(id())
        .column(ColumnSpec::text("invoice_no").not_null())
        .column(ColumnSpec::integer(party_column))
        .column(ColumnSpec::timestamp("invoice_date").default(DefaultValue::CurrentTimestamp))
        .column(money("subtotal"))
        .column(money("discount"))
        .column(money("cgst"))
        .column(money("sgst"))
        .column(money("igst"))
        .column(money("total"))
        .column(ColumnSpec::text("payment_mode").not_null().default(DefaultValue::Text("cash".to_string())))
        .column(money("amount_paid"))
        .column(ColumnSpec::text("notes"))
        .column(created_at())
        .foreign_key(ForeignKey::new(party_column, party_table, "id").on_delete(FkAction::SetNull))
        .index(IndexSpec::new(format!("idx_{name}_invoice_no"), ["invoice_no"]).unique())
        .index(IndexSpec::new(format!("idx_{name}_date"), ["invoice_date"]))
}

fn line_items(name: &str, parent: &str, parent_column: &str) -> TableSpec {
    TableSpec::new(name)
        .column(id())
        .column(ColumnSpec::integer(parent_column).not_null())
        .column(ColumnSpec::integer("product_id"))
        .column(ColumnSpec::text("description"))
        .column(ColumnSpec::real("quantity").not_null().default(DefaultValue::Integer(1)))
        .column(money("rate"))
        .column(money("discount"))
        .column(ColumnSpec::real("gst_rate").not_null().default(DefaultValue::Integer(0)))
        .column(money("tax_amount"))
        .column(money("amount"))
        .foreign_key(ForeignKey::new(parent_column, parent, "id").on_delete(FkAction::Cascade))
        .foreign_key(ForeignKey::new("product_id", "products", "id").on_delete(FkAction::SetNull))
        .index(IndexSpec::new(format!("idx_{name}_{parent_column}"), [parent_column]))
        // Older line items stored tax inline without a computed amount.
        .backfill(
            BackfillSpec::new("amount", "quantity * rate - discount + tax_amount")
                .with_sentinel(DefaultValue::Integer(0)),
        )
}

fn settings() -> TableSpec {
    TableSpec::new("settings")
        .column(ColumnSpec::text("key").primary_key())
        .column(ColumnSpec::text("value"))
        .column(ColumnSpec::timestamp("updated_at").default(DefaultValue::CurrentTimestamp))
}

/// The desired end state of the store, at `CATALOG_VERSION`.
pub fn pos_schema() -> Result<SchemaVersion, SchemaError> {
    let tables = vec![
        categories(),
        party("suppliers"),
        party("customers"),
        products(),
        document("sales", "customers", "customer_id"),
        line_items("sale_items", "sales", "sale_id"),
        document("purchases", "suppliers", "supplier_id"),
        line_items("purchase_items", "purchases", "purchase_id"),
        settings(),
    ];
    SchemaVersion::new(CATALOG_VERSION, tables)
}
