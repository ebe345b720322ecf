//! Core traits for the migration engine.
//!
//! - [`SourceReader`] / [`RowCursor`]: forward-only reads from the source
//! - [`TargetWriter`] / [`TargetTransaction`]: transactional inserts into the target
//! - [`Connector`]: opens one reader and one writer from configuration
//!
//! Drivers report failures as [`DriverError`]; the engine wraps them with the
//! side and table they belong to.

use async_trait::async_trait;

use crate::config::{MysqlConfig, PostgresConfig};
use crate::error::DriverError;

use super::value::{SourceRow, TargetValue};

/// Result type for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// A forward-only cursor over the rows of one source query.
#[async_trait]
pub trait RowCursor: Send {
    /// Fetch the next row, or `None` once the result set is exhausted.
    ///
    /// Every column is decoded as a nullable string.
    async fn next_row(&mut self) -> DriverResult<Option<SourceRow>>;
}

/// Read rows from a source database over a single connection.
#[async_trait]
pub trait SourceReader: Send {
    /// Liveness check.
    async fn ping(&mut self) -> DriverResult<()>;

    /// Start a query and return a cursor over its rows.
    ///
    /// The cursor borrows the connection, so only one query runs at a time.
    async fn query<'a>(&'a mut self, sql: &str) -> DriverResult<Box<dyn RowCursor + 'a>>;

    /// Release the connection. Calling this more than once is a no-op.
    async fn close(&mut self);
}

/// An open transaction on the target.
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait TargetTransaction: Send {
    /// Execute a positional insert with the given values.
    async fn insert(&mut self, sql: &str, values: &[TargetValue]) -> DriverResult<()>;

    /// Commit everything inserted so far.
    async fn commit(self: Box<Self>) -> DriverResult<()>;

    /// Discard everything inserted so far.
    async fn rollback(self: Box<Self>) -> DriverResult<()>;
}

/// Write rows to a target database over a single connection.
#[async_trait]
pub trait TargetWriter: Send {
    /// Liveness check.
    async fn ping(&mut self) -> DriverResult<()>;

    /// Begin a transaction. It borrows the connection until it is finished.
    async fn begin<'a>(&'a mut self) -> DriverResult<Box<dyn TargetTransaction + 'a>>;

    /// Release the connection. Calling this more than once is a no-op.
    async fn close(&mut self);
}

/// Opens driver connections for a session.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to the source endpoint.
    async fn connect_source(&self, endpoint: &MysqlConfig) -> DriverResult<Box<dyn SourceReader>>;

    /// Connect to the target endpoint.
    async fn connect_target(
        &self,
        endpoint: &PostgresConfig,
    ) -> DriverResult<Box<dyn TargetWriter>>;
}
