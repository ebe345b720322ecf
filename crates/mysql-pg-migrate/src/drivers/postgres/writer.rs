//! PostgreSQL target writer implementation.
//!
//! Implements the `TargetWriter` trait over a single `tokio_postgres` client.
//! Inserts are prepared once per statement text inside the open transaction,
//! and each value is coerced to the parameter type the server reports.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, Config as PgConfig, NoTls, Statement, Transaction};
use tracing::{debug, info, warn};

use crate::config::PostgresConfig;
use crate::core::traits::{DriverResult, TargetTransaction, TargetWriter};
use crate::core::value::TargetValue;
use crate::drivers::common::TlsBuilder;
use crate::error::DriverError;

/// A bound insert parameter.
type Param = Box<dyn ToSql + Sync + Send>;

/// PostgreSQL target writer holding one client.
pub struct PostgresWriter {
    client: Option<Client>,
    driver: Option<JoinHandle<()>>,
    endpoint: String,
    release_timeout: Option<Duration>,
}

impl PostgresWriter {
    /// Build connection parameters from the endpoint configuration.
    ///
    /// TLS is negotiated separately from `sslmode` by [`TlsBuilder`].
    pub fn pg_config(config: &PostgresConfig) -> PgConfig {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.username);
        pg_config.password(&config.password);
        pg_config.application_name("mysql-pg-migrate");
        pg_config
    }

    /// Open a connection to the target.
    ///
    /// The connection driver runs on a spawned task that is joined on close.
    pub async fn connect(config: &PostgresConfig) -> DriverResult<Self> {
        let pg_config = Self::pg_config(config);

        let (client, driver) = match TlsBuilder::parse(&config.sslmode)?.build()? {
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let (client, connection) = pg_config.connect(NoTls).await?;
                let driver = tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("PostgreSQL connection error: {}", e);
                    }
                });
                (client, driver)
            }
            Some(tls) => {
                let (client, connection) = pg_config.connect(tls).await?;
                let driver = tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("PostgreSQL connection error: {}", e);
                    }
                });
                (client, driver)
            }
        };

        info!("Connected to PostgreSQL target: {}", config.describe());

        Ok(Self {
            client: Some(client),
            driver: Some(driver),
            endpoint: config.describe(),
            release_timeout: None,
        })
    }

    /// Bound how long [`TargetWriter::close`] waits for the connection task.
    ///
    /// When it elapses the task is aborted, which drops the socket.
    pub fn with_release_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.release_timeout = timeout;
        self
    }

    fn client(&mut self) -> DriverResult<&mut Client> {
        self.client
            .as_mut()
            .ok_or_else(|| DriverError::from("PostgreSQL target connection is closed"))
    }
}

#[async_trait]
impl TargetWriter for PostgresWriter {
    async fn ping(&mut self) -> DriverResult<()> {
        self.client()?.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn begin<'a>(&'a mut self) -> DriverResult<Box<dyn TargetTransaction + 'a>> {
        let tx = self.client()?.transaction().await?;
        Ok(Box::new(PostgresTransaction {
            tx,
            statements: HashMap::new(),
        }))
    }

    async fn close(&mut self) {
        // Dropping the last client handle terminates the session and ends the driver task.
        if self.client.take().is_some() {
            debug!("Closing PostgreSQL target connection to {}", self.endpoint);
        }
        let Some(mut driver) = self.driver.take() else {
            return;
        };
        let joined = match self.release_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, &mut driver).await {
                Ok(joined) => joined,
                Err(_) => {
                    // A request still awaiting its reply keeps the task alive.
                    warn!(
                        "PostgreSQL target {} did not close within {}s; aborting connection",
                        self.endpoint,
                        timeout.as_secs_f64()
                    );
                    driver.abort();
                    return;
                }
            },
            None => driver.await,
        };
        if let Err(e) = joined {
            warn!("PostgreSQL connection task failed: {}", e);
        }
    }
}

/// An open PostgreSQL transaction with its prepared statements.
struct PostgresTransaction<'a> {
    tx: Transaction<'a>,
    statements: HashMap<String, Statement>,
}

#[async_trait]
impl<'a> TargetTransaction for PostgresTransaction<'a> {
    async fn insert(&mut self, sql: &str, values: &[TargetValue]) -> DriverResult<()> {
        let statement = match self.statements.get(sql) {
            Some(statement) => statement.clone(),
            None => {
                let statement = self.tx.prepare(sql).await?;
                self.statements.insert(sql.to_string(), statement.clone());
                statement
            }
        };

        let params = bind_params(statement.params(), values)?;
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        self.tx.execute(&statement, &refs).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> DriverResult<()> {
        let PostgresTransaction { tx, .. } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DriverResult<()> {
        let PostgresTransaction { tx, .. } = *self;
        tx.rollback().await?;
        Ok(())
    }
}

/// Coerce values to the parameter types of a prepared statement.
fn bind_params(types: &[Type], values: &[TargetValue]) -> DriverResult<Vec<Param>> {
    if types.len() != values.len() {
        return Err(DriverError::from(format!(
            "statement expects {} parameters, got {} values",
            types.len(),
            values.len()
        )));
    }

    types
        .iter()
        .zip(values)
        .map(|(ty, value)| to_param(value, ty))
        .collect()
}

/// Convert one value to a parameter accepted by a column of type `ty`.
///
/// Text is passed through unchanged; a type mismatch is reported by the
/// server when the insert executes.
fn to_param(value: &TargetValue, ty: &Type) -> DriverResult<Param> {
    match value {
        TargetValue::Text(s) => Ok(Box::new(s.clone())),
        TargetValue::Integer(i) => match *ty {
            Type::INT2 => Ok(Box::new(i16::try_from(*i)?)),
            Type::INT4 => Ok(Box::new(i32::try_from(*i)?)),
            Type::INT8 => Ok(Box::new(*i)),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR => Ok(Box::new(i.to_string())),
            _ => Err(DriverError::from(format!(
                "cannot bind integer to parameter of type {}",
                ty
            ))),
        },
        TargetValue::Timestamp(ts) => match *ty {
            Type::TIMESTAMP => Ok(Box::new(ts.naive_local())),
            Type::TIMESTAMPTZ => Ok(Box::new(ts.with_timezone(&Utc))),
            Type::TEXT | Type::VARCHAR => Ok(Box::new(ts.to_rfc3339())),
            _ => Err(DriverError::from(format!(
                "cannot bind timestamp to parameter of type {}",
                ty
            ))),
        },
    }
}
