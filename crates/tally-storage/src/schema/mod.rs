//! Declarative schema model: what the database should look like.

pub mod column;
pub mod ddl;
pub mod table;
pub mod version;

pub use column::{ColumnSpec, ColumnType, DefaultValue};
pub use table::{BackfillSpec, FkAction, ForeignKey, IndexSpec, TableSpec};
pub use version::SchemaVersion;
