//! Error types for the migration library.

use std::fmt;

use thiserror::Error;

/// Boxed error produced by a database driver.
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// Exit code for configuration errors (bad YAML, missing fields, unknown engine).
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for connection failures on either side.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Exit code for a failed table migration.
pub const EXIT_TRANSFER_ERROR: u8 = 3;
/// Exit code for result serialization failures.
pub const EXIT_SERIALIZATION_ERROR: u8 = 5;
/// Exit code for file system errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Which end of the migration an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Target => f.write_str("target"),
        }
    }
}

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid values, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configured engine kind is not supported on this side.
    #[error("Unsupported {side} engine '{kind}'")]
    UnsupportedEngine { side: Side, kind: String },

    /// Opening or pinging a connection failed.
    #[error("Connection error ({side}): {source}")]
    Connection {
        side: Side,
        #[source]
        source: DriverError,
    },

    /// The source query for a table could not be started.
    #[error("Query failed for table {table}: {source}")]
    Query {
        table: String,
        #[source]
        source: DriverError,
    },

    /// The target transaction for a table could not be started.
    #[error("Could not begin target transaction for table {table}: {source}")]
    Begin {
        table: String,
        #[source]
        source: DriverError,
    },

    /// Reading or decoding a source row failed.
    #[error("Failed to read row {row} of table {table}: {source}")]
    RowRead {
        table: String,
        row: u64,
        #[source]
        source: DriverError,
    },

    /// Inserting a row into the target failed.
    #[error("Failed to write row {row} of table {table}: {source}")]
    RowWrite {
        table: String,
        row: u64,
        #[source]
        source: DriverError,
    },

    /// The target transaction could not be committed.
    #[error("Commit failed for table {table}: {source}")]
    Commit {
        table: String,
        #[source]
        source: DriverError,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Connection error for the given side.
    pub fn connection(side: Side, source: impl Into<DriverError>) -> Self {
        MigrateError::Connection {
            side,
            source: source.into(),
        }
    }

    /// Name of the table this error is attached to, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            MigrateError::Query { table, .. }
            | MigrateError::Begin { table, .. }
            | MigrateError::RowRead { table, .. }
            | MigrateError::RowWrite { table, .. }
            | MigrateError::Commit { table, .. } => Some(table),
            _ => None,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_)
            | MigrateError::UnsupportedEngine { .. }
            | MigrateError::Yaml(_) => EXIT_CONFIG_ERROR,
            MigrateError::Connection { .. } => EXIT_CONNECTION_ERROR,
            MigrateError::Query { .. }
            | MigrateError::Begin { .. }
            | MigrateError::RowRead { .. }
            | MigrateError::RowWrite { .. }
            | MigrateError::Commit { .. } => EXIT_TRANSFER_ERROR,
            MigrateError::Json(_) => EXIT_SERIALIZATION_ERROR,
            MigrateError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // The Display impls above already inline the immediate cause, so start one level down.
        let mut source = std::error::Error::source(self).and_then(|e| e.source());
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
