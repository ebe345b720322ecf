//! Migration session: the source and target connections of one run.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::Config;
use crate::core::traits::{Connector, DriverResult, SourceReader, TargetWriter};
use crate::drivers::{EngineKind, NativeConnector};
use crate::error::{DriverError, MigrateError, Result, Side};

/// Exclusively owns one source and one target connection.
///
/// A session returned by [`Session::open`] has pinged both sides. It must be
/// released with [`Session::close`]; closing is idempotent.
pub struct Session {
    source: Option<Box<dyn SourceReader>>,
    target: Option<Box<dyn TargetWriter>>,
}

impl Session {
    /// Open both connections with the native MySQL and PostgreSQL drivers.
    ///
    /// `migration.timeout_seconds` also bounds releasing each connection.
    pub async fn open(config: &Config) -> Result<Self> {
        let connector = NativeConnector::new(config.migration.connect_timeout());
        Self::open_with(config, &connector).await
    }

    /// Open both connections through `connector`.
    ///
    /// Engine kinds are checked before anything is dialed. If a later step
    /// fails, whatever was already opened is closed before the error returns.
    pub async fn open_with(config: &Config, connector: &dyn Connector) -> Result<Self> {
        EngineKind::require(Side::Source, &config.source.r#type)?;
        EngineKind::require(Side::Target, &config.target.r#type)?;

        let mut session = Session {
            source: None,
            target: None,
        };
        if let Err(e) = session.connect(config, connector).await {
            session.close().await;
            return Err(e);
        }
        Ok(session)
    }

    async fn connect(&mut self, config: &Config, connector: &dyn Connector) -> Result<()> {
        let timeout = config.migration.connect_timeout();

        info!("Connecting to MySQL source {}", config.source.mysql.describe());
        let source = bounded(timeout, connector.connect_source(&config.source.mysql))
            .await
            .map_err(|e| MigrateError::connection(Side::Source, e))?;
        let source = self.source.insert(source);
        bounded(timeout, source.ping())
            .await
            .map_err(|e| MigrateError::connection(Side::Source, e))?;

        info!(
            "Connecting to PostgreSQL target {}",
            config.target.postgresql.describe()
        );
        let target = bounded(timeout, connector.connect_target(&config.target.postgresql))
            .await
            .map_err(|e| MigrateError::connection(Side::Target, e))?;
        let target = self.target.insert(target);
        bounded(timeout, target.ping())
            .await
            .map_err(|e| MigrateError::connection(Side::Target, e))?;

        Ok(())
    }

    /// Both connections, borrowed together for one table migration.
    pub fn endpoints(&mut self) -> Result<(&mut dyn SourceReader, &mut dyn TargetWriter)> {
        match (self.source.as_deref_mut(), self.target.as_deref_mut()) {
            (Some(source), Some(target)) => Ok((
                source as &mut dyn SourceReader,
                target as &mut dyn TargetWriter,
            )),
            (None, _) => Err(MigrateError::connection(Side::Source, "session is closed")),
            (_, None) => Err(MigrateError::connection(Side::Target, "session is closed")),
        }
    }

    /// True while both connections are held.
    pub fn is_open(&self) -> bool {
        self.source.is_some() && self.target.is_some()
    }

    /// Release both connections. Sides that were never opened are skipped.
    pub async fn close(&mut self) {
        if let Some(mut target) = self.target.take() {
            target.close().await;
            debug!("Released target connection");
        }
        if let Some(mut source) = self.source.take() {
            source.close().await;
            debug!("Released source connection");
        }
    }
}

/// Await `fut`, failing after `timeout` when one is set.
pub(crate) async fn bounded<T, F>(timeout: Option<Duration>, fut: F) -> DriverResult<T>
where
    F: Future<Output = DriverResult<T>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::from(format!(
                "timed out after {}s",
                limit.as_secs()
            ))),
        },
        None => fut.await,
    }
}
