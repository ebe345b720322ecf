//! Migration orchestrator - main workflow coordinator.

pub mod session;

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::core::traits::Connector;
use crate::drivers::{EngineKind, NativeConnector};
use crate::error::{MigrateError, Result, Side};
use crate::transfer::{default_tables, Clock, TableMigrator, TableSpec};

pub use session::Session;

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    tables: Vec<TableSpec>,
    progress: bool,
    clock: Clock,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Committed tables in migration order.
    pub tables: Vec<TableResult>,

    /// Total rows transferred.
    pub rows_transferred: u64,
}

/// One committed table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableResult {
    pub table: String,
    pub rows: u64,
    pub duration_seconds: f64,
}

/// Result of a connection health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    pub source_error: Option<String>,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    pub target_error: Option<String>,
    pub healthy: bool,
}

impl Orchestrator {
    /// Create an orchestrator for the default table list.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tables: default_tables(),
            progress: false,
            clock: chrono::Local::now,
        }
    }

    /// Print a line to stdout before and after each table.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    /// Replace the clock used for run timestamps.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn native_connector(&self) -> NativeConnector {
        NativeConnector::new(self.config.migration.connect_timeout())
    }

    /// Run the migration against the configured databases.
    pub async fn run(&self) -> Result<MigrationResult> {
        self.run_with(&self.native_connector()).await
    }

    /// Run the migration, obtaining connections from `connector`.
    ///
    /// Tables run in order and the run stops at the first failed table.
    /// Tables committed before the failure stay committed. The session is
    /// closed on every path once it has been opened.
    pub async fn run_with(&self, connector: &dyn Connector) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        info!("Starting migration run: {}", run_id);
        self.warn_inert_options();

        let mut session = Session::open_with(&self.config, connector).await?;
        let outcome = self.migrate_tables(&mut session).await;
        session.close().await;
        let tables = outcome?;

        let rows_transferred: u64 = tables.iter().map(|t| t.rows).sum();
        let duration_seconds = start.elapsed().as_secs_f64();
        info!(
            "Migration run {} completed: {} tables, {} rows in {:.2}s",
            run_id,
            tables.len(),
            rows_transferred,
            duration_seconds
        );

        Ok(MigrationResult {
            run_id,
            status: "completed".to_string(),
            duration_seconds,
            started_at,
            completed_at: Utc::now(),
            tables,
            rows_transferred,
        })
    }

    async fn migrate_tables(&self, session: &mut Session) -> Result<Vec<TableResult>> {
        let (source, target) = session.endpoints()?;
        let mut results = Vec::with_capacity(self.tables.len());

        for spec in &self.tables {
            if self.progress {
                println!("Migrating {}...", spec.name);
            }
            let table_start = Instant::now();

            let rows = TableMigrator::new(spec)
                .with_clock(self.clock)
                .migrate(&mut *source, &mut *target)
                .await
                .map_err(|e| {
                    error!("Table {} failed: {}", spec.name, e);
                    e
                })?;

            let duration_seconds = table_start.elapsed().as_secs_f64();
            if self.progress {
                println!(
                    "Migrated {}: {} rows in {:.2}s",
                    spec.name, rows, duration_seconds
                );
            }
            results.push(TableResult {
                table: spec.name.to_string(),
                rows,
                duration_seconds,
            });
        }

        Ok(results)
    }

    fn warn_inert_options(&self) {
        let migration = &self.config.migration;
        if !migration.tenant_names.is_empty() {
            warn!(
                "migration.tenant_names is set ({} names) but tenant filtering is not supported; all rows are migrated",
                migration.tenant_names.len()
            );
        }
    }

    /// Test both connections.
    pub async fn health_check(&self) -> Result<HealthCheckResult> {
        self.health_check_with(&self.native_connector()).await
    }

    /// Test both connections through `connector`.
    ///
    /// Each side is connected, pinged and closed independently; a failure on
    /// one side does not prevent checking the other.
    ///
    /// # Errors
    ///
    /// An unsupported engine kind is a configuration error, returned before
    /// either side is dialed.
    pub async fn health_check_with(&self, connector: &dyn Connector) -> Result<HealthCheckResult> {
        EngineKind::require(Side::Source, &self.config.source.r#type)?;
        EngineKind::require(Side::Target, &self.config.target.r#type)?;
        let timeout = self.config.migration.connect_timeout();

        let source_start = Instant::now();
        let source = async {
            let mut reader = session::bounded(
                timeout,
                connector.connect_source(&self.config.source.mysql),
            )
            .await
            .map_err(|e| MigrateError::connection(Side::Source, e))?;
            let pinged = session::bounded(timeout, reader.ping()).await;
            reader.close().await;
            pinged.map_err(|e| MigrateError::connection(Side::Source, e))
        }
        .await;
        let source_latency_ms = source_start.elapsed().as_millis() as u64;

        let target_start = Instant::now();
        let target = async {
            let mut writer = session::bounded(
                timeout,
                connector.connect_target(&self.config.target.postgresql),
            )
            .await
            .map_err(|e| MigrateError::connection(Side::Target, e))?;
            let pinged = session::bounded(timeout, writer.ping()).await;
            writer.close().await;
            pinged.map_err(|e| MigrateError::connection(Side::Target, e))
        }
        .await;
        let target_latency_ms = target_start.elapsed().as_millis() as u64;

        if let Err(ref e) = source {
            warn!("Source health check failed: {}", e);
        }
        if let Err(ref e) = target {
            warn!("Target health check failed: {}", e);
        }

        let healthy = source.is_ok() && target.is_ok();
        Ok(HealthCheckResult {
            source_connected: source.is_ok(),
            source_latency_ms,
            source_error: source.err().map(|e| e.to_string()),
            target_connected: target.is_ok(),
            target_latency_ms,
            target_error: target.err().map(|e| e.to_string()),
            healthy,
        })
    }
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::TargetValue;
    use crate::testing::{rows, sample_config, MemoryConnector, MemorySource, MemoryTarget};
    use chrono::{Local, TimeZone};

    fn fixed_clock() -> chrono::DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    fn config_rows() -> Vec<crate::core::value::SourceRow> {
        rows(&[
            &[Some("app.yaml"), Some("DEFAULT_GROUP"), Some("a: 1"), Some("public"), Some("yaml")],
            &[Some("db.properties"), Some("DEFAULT_GROUP"), Some("x=1"), None, None],
        ])
    }

    #[tokio::test]
    async fn test_run_migrates_tenants_end_to_end() {
        let source = MemorySource::new()
            .with_table(
                "tenant_info",
                rows(&[
                    &[Some("1"), Some("acme"), Some("desc")],
                    &[Some("2"), None, Some("x")],
                ]),
            )
            .with_table("config_info", Vec::new());
        let connector = MemoryConnector::new(source, MemoryTarget::new());

        let result = Orchestrator::new(sample_config())
            .run_with(&connector)
            .await
            .unwrap();

        assert_eq!(
            connector.target.text_rows("tenant_info"),
            vec![vec!["1", "acme", "desc"], vec!["2", "", "x"]]
        );
        assert!(connector.target.rows("config_info").is_empty());

        assert_eq!(result.status, "completed");
        assert_eq!(result.rows_transferred, 2);
        assert_eq!(result.tables.len(), 2);
        assert_eq!(result.tables[0].table, "tenant_info");
        assert_eq!(result.tables[0].rows, 2);
        assert_eq!(result.tables[1].table, "config_info");
        assert_eq!(result.tables[1].rows, 0);

        // Both tables committed, including the empty one.
        assert_eq!(connector.target.state().commits, 2);
        assert!(!connector.source.state().open);
        assert!(!connector.target.state().open);
        assert_eq!(connector.source.state().close_calls, 1);
    }

    #[tokio::test]
    async fn test_tables_run_in_order() {
        let source = MemorySource::new()
            .with_table("tenant_info", Vec::new())
            .with_table("config_info", config_rows());
        let connector = MemoryConnector::new(source, MemoryTarget::new());

        Orchestrator::new(sample_config())
            .with_clock(fixed_clock)
            .run_with(&connector)
            .await
            .unwrap();

        let queries = connector.source.state().queries.clone();
        assert_eq!(queries.len(), 2);
        assert!(queries[0].ends_with("FROM tenant_info"));
        assert!(queries[1].ends_with("FROM config_info"));

        let migrated = connector.target.rows("config_info");
        assert_eq!(migrated.len(), 2);
        assert_eq!(migrated[1][3], TargetValue::from(""));
        assert_eq!(migrated[1][5], TargetValue::Integer(1));
        assert_eq!(migrated[1][6], TargetValue::Timestamp(fixed_clock()));
    }

    #[tokio::test]
    async fn test_unreachable_target_migrates_nothing() {
        let source = MemorySource::new().with_table("tenant_info", Vec::new());
        let connector = MemoryConnector {
            target_unreachable: true,
            ..MemoryConnector::new(source, MemoryTarget::new())
        };

        let err = Orchestrator::new(sample_config())
            .run_with(&connector)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MigrateError::Connection {
                side: Side::Target,
                ..
            }
        ));
        assert_eq!(err.exit_code(), crate::error::EXIT_CONNECTION_ERROR);
        assert!(connector.source.state().queries.is_empty());
        assert!(!connector.source.state().open);
    }

    #[tokio::test]
    async fn test_unreachable_source_migrates_nothing() {
        let connector = MemoryConnector {
            source_unreachable: true,
            ..MemoryConnector::new(MemorySource::new(), MemoryTarget::new())
        };

        let err = Orchestrator::new(sample_config())
            .run_with(&connector)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MigrateError::Connection {
                side: Side::Source,
                ..
            }
        ));
        assert_eq!(err.exit_code(), crate::error::EXIT_CONNECTION_ERROR);
        // The target is never dialed once the source is unreachable.
        assert_eq!(connector.connect_count(), 1);
        assert!(connector.source.state().queries.is_empty());
        let target = connector.target.state();
        assert!(!target.open);
        assert_eq!(target.begun, 0);
        assert!(target.inserts.is_empty());
    }

    #[tokio::test]
    async fn test_tenant_failure_skips_config() {
        let source = MemorySource::new()
            .with_table("tenant_info", rows(&[&[Some("1"), Some("acme"), Some("d")]]))
            .with_table("config_info", config_rows());
        let target = MemoryTarget::new().fail_insert_at("tenant_info", 0);
        let connector = MemoryConnector::new(source, target);

        let err = Orchestrator::new(sample_config())
            .run_with(&connector)
            .await
            .unwrap_err();

        assert_eq!(err.table(), Some("tenant_info"));
        assert_eq!(connector.source.state().queries.len(), 1);
        assert!(connector.target.rows("config_info").is_empty());
        assert!(!connector.source.state().open);
        assert!(!connector.target.state().open);
    }

    #[tokio::test]
    async fn test_config_failure_keeps_tenants_committed() {
        let source = MemorySource::new()
            .with_table("tenant_info", rows(&[&[Some("1"), Some("acme"), Some("d")]]))
            .with_table("config_info", config_rows());
        let target = MemoryTarget::new().fail_insert_at("config_info", 1);
        let connector = MemoryConnector::new(source, target);

        let err = Orchestrator::new(sample_config())
            .run_with(&connector)
            .await
            .unwrap_err();

        assert!(matches!(err, MigrateError::RowWrite { row: 2, .. }));
        assert_eq!(connector.target.rows("tenant_info").len(), 1);
        assert!(connector.target.rows("config_info").is_empty());
        assert_eq!(connector.target.state().rollbacks, 1);
    }

    #[tokio::test]
    async fn test_result_serializes_to_json() {
        let source = MemorySource::new()
            .with_table("tenant_info", Vec::new())
            .with_table("config_info", Vec::new());
        let connector = MemoryConnector::new(source, MemoryTarget::new());

        let result = Orchestrator::new(sample_config())
            .run_with(&connector)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

        assert_eq!(json["status"], "completed");
        assert_eq!(json["rows_transferred"], 0);
        assert_eq!(json["tables"][1]["table"], "config_info");
        assert_eq!(json["run_id"].as_str().unwrap().len(), 36);
    }

    #[tokio::test]
    async fn test_health_check_reports_each_side() {
        let connector = MemoryConnector::default();
        let result = Orchestrator::new(sample_config())
            .health_check_with(&connector)
            .await
            .unwrap();
        assert!(result.healthy);
        assert!(result.source_error.is_none());
        assert!(!connector.source.state().open);
        assert!(!connector.target.state().open);

        let connector = MemoryConnector::new(MemorySource::new().fail_ping(), MemoryTarget::new());
        let result = Orchestrator::new(sample_config())
            .health_check_with(&connector)
            .await
            .unwrap();
        assert!(!result.healthy);
        assert!(!result.source_connected);
        assert!(result.source_error.unwrap().contains("source ping failed"));
        // The target is still checked.
        assert!(result.target_connected);
        assert_eq!(connector.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_health_check_rejects_unknown_engine() {
        let mut config = sample_config();
        config.target.r#type = "oracle".to_string();
        let connector = MemoryConnector::default();

        let err = Orchestrator::new(config)
            .health_check_with(&connector)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MigrateError::UnsupportedEngine {
                side: Side::Target,
                ref kind,
            } if kind == "oracle"
        ));
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG_ERROR);
        assert_eq!(connector.connect_count(), 0);
    }
}
