//! In-memory drivers for exercising the engine without live databases.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::config::{
    Config, MigrationConfig, MysqlConfig, PostgresConfig, SourceConfig, TargetConfig,
};
use crate::core::traits::{
    Connector, DriverResult, RowCursor, SourceReader, TargetTransaction, TargetWriter,
};
use crate::core::value::{SourceRow, TargetValue};
use crate::error::DriverError;

/// A configuration that passes validation and names the supported engines.
pub fn sample_config() -> Config {
    Config {
        source: SourceConfig {
            r#type: "mysql".to_string(),
            mysql: MysqlConfig {
                host: "mysql.test".to_string(),
                port: 3306,
                username: "root".to_string(),
                password: "password".to_string(),
                database: "nacos_config".to_string(),
                charset: "utf8mb4".to_string(),
            },
        },
        target: TargetConfig {
            r#type: "postgresql".to_string(),
            postgresql: PostgresConfig {
                host: "pg.test".to_string(),
                port: 5432,
                username: "postgres".to_string(),
                password: "password".to_string(),
                database: "nacos".to_string(),
                sslmode: "disable".to_string(),
            },
        },
        migration: MigrationConfig::default(),
    }
}

/// Build source rows from string literals.
pub fn rows(data: &[&[Option<&str>]]) -> Vec<SourceRow> {
    data.iter()
        .map(|row| row.iter().map(|v| v.map(str::to_string)).collect())
        .collect()
}

/// Table name following `FROM` in a select.
fn table_of_select(sql: &str) -> String {
    sql.rsplit(' ').next().unwrap_or_default().to_string()
}

/// Table name following `INSERT INTO`.
fn table_of_insert(sql: &str) -> String {
    sql.split_whitespace().nth(2).unwrap_or_default().to_string()
}

#[derive(Default)]
pub struct SourceState {
    tables: HashMap<String, Vec<SourceRow>>,
    fail_read: Option<(String, usize)>,
    fail_ping: bool,
    pub open: bool,
    pub close_calls: usize,
    pub queries: Vec<String>,
}

/// Source whose tables live in memory. Clones share state.
#[derive(Clone, Default)]
pub struct MemorySource(Arc<Mutex<SourceState>>);

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, name: &str, data: Vec<SourceRow>) -> Self {
        self.state().tables.insert(name.to_string(), data);
        self
    }

    /// Fail when the cursor reaches row `index` (0-based) of `table`.
    pub fn fail_read_at(self, table: &str, index: usize) -> Self {
        self.state().fail_read = Some((table.to_string(), index));
        self
    }

    pub fn fail_ping(self) -> Self {
        self.state().fail_ping = true;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, SourceState> {
        self.0.lock().unwrap()
    }
}

#[async_trait]
impl SourceReader for MemorySource {
    async fn ping(&mut self) -> DriverResult<()> {
        if self.state().fail_ping {
            return Err(DriverError::from("source ping failed"));
        }
        Ok(())
    }

    async fn query<'a>(&'a mut self, sql: &str) -> DriverResult<Box<dyn RowCursor + 'a>> {
        let mut state = self.state();
        state.queries.push(sql.to_string());
        let table = table_of_select(sql);
        let data = state
            .tables
            .get(&table)
            .cloned()
            .ok_or_else(|| DriverError::from(format!("Table '{}' doesn't exist", table)))?;
        let fail_at = match &state.fail_read {
            Some((t, index)) if *t == table => Some(*index),
            _ => None,
        };
        Ok(Box::new(MemoryCursor {
            rows: data.into(),
            position: 0,
            fail_at,
        }))
    }

    async fn close(&mut self) {
        let mut state = self.state();
        state.open = false;
        state.close_calls += 1;
    }
}

struct MemoryCursor {
    rows: VecDeque<SourceRow>,
    position: usize,
    fail_at: Option<usize>,
}

#[async_trait]
impl RowCursor for MemoryCursor {
    async fn next_row(&mut self) -> DriverResult<Option<SourceRow>> {
        if self.fail_at == Some(self.position) {
            return Err(DriverError::from("lost connection during fetch"));
        }
        self.position += 1;
        Ok(self.rows.pop_front())
    }
}

#[derive(Default)]
pub struct TargetState {
    committed: HashMap<String, Vec<Vec<TargetValue>>>,
    fail_insert: Option<(String, usize)>,
    fail_commit: bool,
    fail_ping: bool,
    pub open: bool,
    pub close_calls: usize,
    pub begun: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub inserts: Vec<String>,
}

/// Target that keeps committed rows per table. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryTarget(Arc<Mutex<TargetState>>);

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the insert of row `index` (0-based) of `table`.
    pub fn fail_insert_at(self, table: &str, index: usize) -> Self {
        self.state().fail_insert = Some((table.to_string(), index));
        self
    }

    pub fn fail_commit(self) -> Self {
        self.state().fail_commit = true;
        self
    }

    pub fn fail_ping(self) -> Self {
        self.state().fail_ping = true;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, TargetState> {
        self.0.lock().unwrap()
    }

    /// Committed rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<Vec<TargetValue>> {
        self.state().committed.get(table).cloned().unwrap_or_default()
    }

    /// Committed rows of `table`, text columns only.
    pub fn text_rows(&self, table: &str) -> Vec<Vec<String>> {
        self.rows(table)
            .iter()
            .map(|row| {
                row.iter()
                    .filter_map(|v| v.as_text().map(str::to_string))
                    .collect()
            })
            .collect()
    }
}

#[async_trait]
impl TargetWriter for MemoryTarget {
    async fn ping(&mut self) -> DriverResult<()> {
        if self.state().fail_ping {
            return Err(DriverError::from("target ping failed"));
        }
        Ok(())
    }

    async fn begin<'a>(&'a mut self) -> DriverResult<Box<dyn TargetTransaction + 'a>> {
        self.state().begun += 1;
        Ok(Box::new(MemoryTransaction {
            target: self.clone(),
            pending: Vec::new(),
        }))
    }

    async fn close(&mut self) {
        let mut state = self.state();
        state.open = false;
        state.close_calls += 1;
    }
}

struct MemoryTransaction {
    target: MemoryTarget,
    pending: Vec<(String, Vec<TargetValue>)>,
}

#[async_trait]
impl TargetTransaction for MemoryTransaction {
    async fn insert(&mut self, sql: &str, values: &[TargetValue]) -> DriverResult<()> {
        let table = table_of_insert(sql);
        let mut state = self.target.state();
        state.inserts.push(sql.to_string());

        let index = self.pending.iter().filter(|(t, _)| *t == table).count();
        if let Some((t, fail_at)) = &state.fail_insert {
            if *t == table && *fail_at == index {
                return Err(DriverError::from("duplicate key value violates unique constraint"));
            }
        }
        self.pending.push((table, values.to_vec()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> DriverResult<()> {
        let MemoryTransaction { target, pending } = *self;
        let mut state = target.state();
        if state.fail_commit {
            return Err(DriverError::from("could not serialize access"));
        }
        state.commits += 1;
        for (table, values) in pending {
            state.committed.entry(table).or_default().push(values);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DriverResult<()> {
        self.target.state().rollbacks += 1;
        Ok(())
    }
}

/// Hands out the in-memory drivers, or refuses a side to simulate an unreachable host.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    pub source: MemorySource,
    pub target: MemoryTarget,
    pub source_unreachable: bool,
    pub target_unreachable: bool,
    pub connects: Arc<Mutex<usize>>,
}

impl MemoryConnector {
    pub fn new(source: MemorySource, target: MemoryTarget) -> Self {
        Self {
            source,
            target,
            ..Self::default()
        }
    }

    pub fn connect_count(&self) -> usize {
        *self.connects.lock().unwrap()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect_source(&self, _endpoint: &MysqlConfig) -> DriverResult<Box<dyn SourceReader>> {
        *self.connects.lock().unwrap() += 1;
        if self.source_unreachable {
            return Err(DriverError::from("Connection refused (os error 111)"));
        }
        self.source.state().open = true;
        Ok(Box::new(self.source.clone()))
    }

    async fn connect_target(
        &self,
        _endpoint: &PostgresConfig,
    ) -> DriverResult<Box<dyn TargetWriter>> {
        *self.connects.lock().unwrap() += 1;
        if self.target_unreachable {
            return Err(DriverError::from("Connection refused (os error 111)"));
        }
        self.target.state().open = true;
        Ok(Box::new(self.target.clone()))
    }
}
