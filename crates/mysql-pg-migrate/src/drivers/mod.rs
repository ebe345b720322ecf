//! Database driver implementations.
//!
//! - [`mysql`]: source reader over a single MySQL connection
//! - [`postgres`]: target writer over a single PostgreSQL connection
//! - [`common`]: shared utilities (TLS)
//!
//! [`NativeConnector`] wires the two drivers into the engine's
//! [`Connector`](crate::core::Connector) seam.

pub mod common;
pub mod mysql;
pub mod postgres;

pub use common::{SslMode, TlsBuilder};
pub use mysql::MysqlReader;
pub use postgres::PostgresWriter;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{MysqlConfig, PostgresConfig};
use crate::core::traits::{Connector, DriverResult, SourceReader, TargetWriter};
use crate::error::{MigrateError, Result, Side};

/// Database engines known to the migrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Mysql,
    Postgres,
}

impl EngineKind {
    /// Parse a database type string. Only the exact names are accepted.
    pub fn from_db_type(db_type: &str) -> Option<Self> {
        match db_type {
            "mysql" => Some(EngineKind::Mysql),
            "postgresql" => Some(EngineKind::Postgres),
            _ => None,
        }
    }

    /// The only engine supported on the given side.
    pub fn supported(side: Side) -> Self {
        match side {
            Side::Source => EngineKind::Mysql,
            Side::Target => EngineKind::Postgres,
        }
    }

    /// Check that `db_type` names the engine supported on `side`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedEngine` naming the side and the given value.
    pub fn require(side: Side, db_type: &str) -> Result<Self> {
        match Self::from_db_type(db_type) {
            Some(kind) if kind == Self::supported(side) => Ok(kind),
            _ => Err(MigrateError::UnsupportedEngine {
                side,
                kind: db_type.to_string(),
            }),
        }
    }
}

/// Connects with [`MysqlReader`] and [`PostgresWriter`].
///
/// `release_timeout` bounds how long each driver waits for the server while
/// closing; `None` waits indefinitely.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeConnector {
    release_timeout: Option<Duration>,
}

impl NativeConnector {
    pub fn new(release_timeout: Option<Duration>) -> Self {
        Self { release_timeout }
    }
}

#[async_trait]
impl Connector for NativeConnector {
    async fn connect_source(&self, endpoint: &MysqlConfig) -> DriverResult<Box<dyn SourceReader>> {
        let reader = MysqlReader::connect(endpoint).await?;
        Ok(Box::new(reader.with_release_timeout(self.release_timeout)))
    }

    async fn connect_target(
        &self,
        endpoint: &PostgresConfig,
    ) -> DriverResult<Box<dyn TargetWriter>> {
        let writer = PostgresWriter::connect(endpoint).await?;
        Ok(Box::new(writer.with_release_timeout(self.release_timeout)))
    }
}
