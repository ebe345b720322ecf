//! Configuration type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (MySQL).
    pub source: SourceConfig,

    /// Target database configuration (PostgreSQL).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Source side: engine kind plus the MySQL endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Engine kind. Must be "mysql"; checked when the session opens, so an
    /// omitted kind is rejected there.
    #[serde(default)]
    pub r#type: String,

    /// MySQL connection parameters.
    pub mysql: MysqlConfig,
}

/// Target side: engine kind plus the PostgreSQL endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Engine kind. Must be "postgresql"; checked when the session opens.
    #[serde(default)]
    pub r#type: String,

    /// PostgreSQL connection parameters.
    pub postgresql: PostgresConfig,
}

/// MySQL endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct MysqlConfig {
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    pub username: String,

    #[serde(default)]
    pub password: String,

    pub database: String,

    /// Connection character set, issued as `SET NAMES` (default: utf8mb4).
    #[serde(default = "default_charset")]
    pub charset: String,
}

impl fmt::Debug for MysqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MysqlConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("charset", &self.charset)
            .finish()
    }
}

/// PostgreSQL endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    pub username: String,

    #[serde(default)]
    pub password: String,

    pub database: String,

    /// SSL mode: disable, require, verify-ca or verify-full (default: disable).
    #[serde(default = "default_sslmode")]
    pub sslmode: String,
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("sslmode", &self.sslmode)
            .finish()
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Rows per batch. Accepted but not applied: each table commits as one transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seconds allowed for each connect and ping step; 0 disables the bound.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Tenant names to migrate. Accepted but not applied as a filter.
    #[serde(default)]
    pub tenant_names: Vec<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            timeout_seconds: default_timeout_seconds(),
            tenant_names: Vec::new(),
        }
    }
}

// Default value functions for serde
fn default_mysql_port() -> u16 {
    3306
}

fn default_pg_port() -> u16 {
    5432
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

fn default_sslmode() -> String {
    "disable".to_string()
}

fn default_batch_size() -> usize {
    1000
}

fn default_timeout_seconds() -> u64 {
    30
}
