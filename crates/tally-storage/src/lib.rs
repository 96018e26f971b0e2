//! SQLite persistence for the Tally point-of-sale store.
//!
//! The centerpiece is [`reconcile`]: a declarative, idempotent, additive
//! schema reconciler that replaces hand-written one-off migrations. The
//! [`catalog`] declares the store's own tables and [`connection`] wires both
//! into application startup.

pub mod catalog;
pub mod connection;
pub mod reconcile;
pub mod schema;

pub use connection::DatabaseManager;
pub use reconcile::{reconcile, reconcile_with, ReconcileOptions, ReconcileResult};
pub use schema::SchemaVersion;
