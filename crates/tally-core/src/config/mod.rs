//! Configuration system for Tally.
//! TOML-based, layered resolution: env > project file > defaults.

pub mod database_config;
pub mod reconcile_config;
pub mod tally_config;

pub use database_config::DatabaseConfig;
pub use reconcile_config::ReconcileConfig;
pub use tally_config::TallyConfig;
