//! # mysql-pg-migrate
//!
//! MySQL to PostgreSQL migration library for configuration-center data.
//!
//! Copies the `tenant_info` and `config_info` tables from a MySQL source into
//! an existing PostgreSQL schema:
//!
//! - **One connection per side**, both pinged before any table is touched
//! - **One transaction per table**, so a table is migrated entirely or not at all
//! - **NULL to empty string** for every source column
//! - **Synthetic columns** (`version`, `create_time`) filled in at the target
//!
//! ## Example
//!
//! ```rust,no_run
//! use mysql_pg_migrate::{Config, MigrateError, Orchestrator};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), MigrateError> {
//!     let config = Config::load("config.yaml")?;
//!     let result = Orchestrator::new(config).run().await?;
//!     println!("Migrated {} rows", result.rows_transferred);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod transfer;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::{Config, MigrationConfig, MysqlConfig, PostgresConfig, SourceConfig, TargetConfig};
pub use error::{MigrateError, Result, Side};
pub use orchestrator::{HealthCheckResult, MigrationResult, Orchestrator, Session, TableResult};
pub use transfer::{TableMigrator, TableSpec};
