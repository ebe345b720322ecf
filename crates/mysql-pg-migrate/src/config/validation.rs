//! Configuration validation.

use super::Config;
use crate::drivers::common::SslMode;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
///
/// Engine kinds are not checked here; an unknown kind surfaces as
/// `UnsupportedEngine` when the session opens.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    let mysql = &config.source.mysql;
    if mysql.host.is_empty() {
        return Err(MigrateError::Config("source.mysql.host is required".into()));
    }
    if mysql.port == 0 {
        return Err(MigrateError::Config("source.mysql.port must be non-zero".into()));
    }
    if mysql.database.is_empty() {
        return Err(MigrateError::Config(
            "source.mysql.database is required".into(),
        ));
    }
    if mysql.username.is_empty() {
        return Err(MigrateError::Config(
            "source.mysql.username is required".into(),
        ));
    }
    // Interpolated into SET NAMES, so keep it to a bare identifier.
    if mysql.charset.is_empty()
        || !mysql
            .charset
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(MigrateError::Config(format!(
            "source.mysql.charset '{}' is not a valid character set name",
            mysql.charset
        )));
    }

    // Target validation
    let pg = &config.target.postgresql;
    if pg.host.is_empty() {
        return Err(MigrateError::Config(
            "target.postgresql.host is required".into(),
        ));
    }
    if pg.port == 0 {
        return Err(MigrateError::Config(
            "target.postgresql.port must be non-zero".into(),
        ));
    }
    if pg.database.is_empty() {
        return Err(MigrateError::Config(
            "target.postgresql.database is required".into(),
        ));
    }
    if pg.username.is_empty() {
        return Err(MigrateError::Config(
            "target.postgresql.username is required".into(),
        ));
    }
    SslMode::parse(&pg.sslmode)?;

    // Migration config validation
    if config.migration.batch_size == 0 {
        return Err(MigrateError::Config(
            "migration.batch_size must be at least 1".into(),
        ));
    }

    Ok(())
}
