//! MySQL/MariaDB source reader implementation.
//!
//! Implements the `SourceReader` trait over a single `mysql_async` connection.
//! Queries run over the text protocol, so every column arrives as bytes or
//! NULL and decodes directly into a nullable string.

use std::time::Duration;

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, OptsBuilder, QueryResult, Row, TextProtocol};
use tracing::{debug, info, warn};

use crate::config::MysqlConfig;
use crate::core::traits::{DriverResult, RowCursor, SourceReader};
use crate::core::value::SourceRow;
use crate::error::DriverError;

/// MySQL source reader holding one connection.
pub struct MysqlReader {
    conn: Option<Conn>,
    endpoint: String,
    release_timeout: Option<Duration>,
}

impl MysqlReader {
    /// Build connection options from the endpoint configuration.
    ///
    /// The configured charset is applied with `SET NAMES` on connect.
    pub fn opts(config: &MysqlConfig) -> Opts {
        OptsBuilder::default()
            .ip_or_hostname(&config.host)
            .tcp_port(config.port)
            .user(Some(&config.username))
            .pass(Some(&config.password))
            .db_name(Some(&config.database))
            .init(vec![format!("SET NAMES {}", config.charset)])
            .into()
    }

    /// Open a connection to the source.
    pub async fn connect(config: &MysqlConfig) -> DriverResult<Self> {
        let conn = Conn::new(Self::opts(config)).await?;

        info!("Connected to MySQL source: {}", config.describe());

        Ok(Self {
            conn: Some(conn),
            endpoint: config.describe(),
            release_timeout: None,
        })
    }

    /// Bound the orderly disconnect in [`SourceReader::close`].
    ///
    /// When it elapses the connection is dropped without waiting for the server.
    pub fn with_release_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.release_timeout = timeout;
        self
    }

    fn conn(&mut self) -> DriverResult<&mut Conn> {
        self.conn
            .as_mut()
            .ok_or_else(|| DriverError::from("MySQL source connection is closed"))
    }
}

#[async_trait]
impl SourceReader for MysqlReader {
    async fn ping(&mut self) -> DriverResult<()> {
        self.conn()?.ping().await?;
        Ok(())
    }

    async fn query<'a>(&'a mut self, sql: &str) -> DriverResult<Box<dyn RowCursor + 'a>> {
        debug!("MySQL query: {}", sql);
        let result = self.conn()?.query_iter(sql.to_string()).await?;
        Ok(Box::new(MysqlCursor { result }))
    }

    async fn close(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        let disconnected = match self.release_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, conn.disconnect()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        "MySQL source {} did not acknowledge disconnect within {}s; dropping connection",
                        self.endpoint,
                        timeout.as_secs_f64()
                    );
                    return;
                }
            },
            None => conn.disconnect().await,
        };
        match disconnected {
            Ok(()) => debug!("Closed MySQL source connection to {}", self.endpoint),
            Err(e) => warn!("Error closing MySQL source connection: {}", e),
        }
    }
}

/// Streams the rows of one text-protocol result set.
struct MysqlCursor<'a> {
    result: QueryResult<'a, 'static, TextProtocol>,
}

#[async_trait]
impl<'a> RowCursor for MysqlCursor<'a> {
    async fn next_row(&mut self) -> DriverResult<Option<SourceRow>> {
        match self.result.next().await? {
            Some(row) => decode_row(row).map(Some),
            None => Ok(None),
        }
    }
}

/// Decode every column of a row as a nullable string.
fn decode_row(mut row: Row) -> DriverResult<SourceRow> {
    let width = row.len();
    (0..width)
        .map(|i| match row.take_opt::<Option<String>, _>(i) {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(DriverError::from(format!(
                "column {} is not valid text: {}",
                i, e
            ))),
            None => Ok(None),
        })
        .collect()
}
