//! Per-table transfer: one source cursor, one target transaction.
//!
//! A [`TableSpec`] describes a table declaratively (source columns plus
//! synthetic columns); [`TableMigrator`] is the single routine that moves any
//! such table. Rows stream one at a time from the source cursor into a target
//! transaction that is committed only after the cursor is exhausted, so a
//! table is either fully migrated or not at all.

pub mod tables;

use std::fmt;

use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use crate::core::traits::{SourceReader, TargetTransaction, TargetWriter};
use crate::core::value::{SourceRow, TargetValue};
use crate::error::{DriverError, MigrateError, Result};

pub use tables::{default_tables, CONFIG_INFO, TENANT_INFO};

/// Rows between progress log lines.
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Source of the run timestamp.
pub type Clock = fn() -> DateTime<Local>;

/// Value of a target column that has no source counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticValue {
    /// The same integer for every row.
    Constant(i64),
    /// The time the table's migration started, shared by every row of the run.
    RunTimestamp,
}

/// A target-only column appended after the source columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticColumn {
    pub name: &'static str,
    pub value: SyntheticValue,
}

/// Declarative description of one migrated table.
///
/// The source and target tables share `name`. Target columns are the source
/// columns in order, followed by the synthetic columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub source_columns: &'static [&'static str],
    pub synthetic_columns: &'static [SyntheticColumn],
}

impl TableSpec {
    /// The fixed source query, with an explicit column list.
    pub fn select_sql(&self) -> String {
        format!(
            "SELECT {} FROM {}",
            self.source_columns.join(", "),
            self.name
        )
    }

    /// Target column names in insert order.
    pub fn target_columns(&self) -> Vec<&'static str> {
        self.source_columns
            .iter()
            .copied()
            .chain(self.synthetic_columns.iter().map(|c| c.name))
            .collect()
    }

    /// The positional insert for the target.
    pub fn insert_sql(&self) -> String {
        let columns = self.target_columns();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    /// Resolve the synthetic columns for one run.
    pub fn synthetic_values(&self, run_started: DateTime<Local>) -> Vec<TargetValue> {
        self.synthetic_columns
            .iter()
            .map(|c| match c.value {
                SyntheticValue::Constant(v) => TargetValue::Integer(v),
                SyntheticValue::RunTimestamp => TargetValue::Timestamp(run_started),
            })
            .collect()
    }

    /// Map a source row to target values. NULL source values become empty strings.
    pub fn map_row(
        &self,
        row: SourceRow,
        synthetic: &[TargetValue],
    ) -> std::result::Result<Vec<TargetValue>, DriverError> {
        if row.len() != self.source_columns.len() {
            return Err(DriverError::from(format!(
                "expected {} columns, got {}",
                self.source_columns.len(),
                row.len()
            )));
        }

        let mut values: Vec<TargetValue> = row.into_iter().map(TargetValue::text_or_empty).collect();
        values.extend_from_slice(synthetic);
        Ok(values)
    }
}

/// Lifecycle of one table migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TablePhase {
    NotStarted,
    Reading,
    RolledBack,
    Exhausted,
    Committing,
    Failed,
    Committed,
}

impl fmt::Display for TablePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TablePhase::NotStarted => "not_started",
            TablePhase::Reading => "reading",
            TablePhase::RolledBack => "rolled_back",
            TablePhase::Exhausted => "exhausted",
            TablePhase::Committing => "committing",
            TablePhase::Failed => "failed",
            TablePhase::Committed => "committed",
        };
        f.write_str(s)
    }
}

/// Migrates one table inside a single target transaction.
pub struct TableMigrator<'s> {
    spec: &'s TableSpec,
    clock: Clock,
}

impl<'s> TableMigrator<'s> {
    pub fn new(spec: &'s TableSpec) -> Self {
        Self {
            spec,
            clock: Local::now,
        }
    }

    /// Replace the clock used for the run timestamp.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn phase(&self, phase: TablePhase) {
        debug!("{}: {}", self.spec.name, phase);
    }

    /// Copy every source row into the target and commit.
    ///
    /// Returns the number of committed rows (0 for an empty source table).
    /// Any read, mapping or insert failure rolls the transaction back and no
    /// further rows are read.
    pub async fn migrate(
        &self,
        source: &mut dyn SourceReader,
        target: &mut dyn TargetWriter,
    ) -> Result<u64> {
        let table = self.spec.name;
        let select_sql = self.spec.select_sql();
        let insert_sql = self.spec.insert_sql();
        self.phase(TablePhase::NotStarted);

        let mut cursor = source
            .query(&select_sql)
            .await
            .map_err(|source| MigrateError::Query {
                table: table.to_string(),
                source,
            })?;

        let mut tx = target
            .begin()
            .await
            .map_err(|source| MigrateError::Begin {
                table: table.to_string(),
                source,
            })?;

        // Captured once: every row of this run carries the same timestamp.
        let synthetic = self.spec.synthetic_values((self.clock)());

        self.phase(TablePhase::Reading);
        let mut rows: u64 = 0;
        loop {
            let row_number = rows + 1;

            let next = cursor.next_row().await;
            let row = match next {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(source) => {
                    let err = MigrateError::RowRead {
                        table: table.to_string(),
                        row: row_number,
                        source,
                    };
                    return Err(self.abort(tx, err).await);
                }
            };

            let values = match self.spec.map_row(row, &synthetic) {
                Ok(values) => values,
                Err(source) => {
                    let err = MigrateError::RowRead {
                        table: table.to_string(),
                        row: row_number,
                        source,
                    };
                    return Err(self.abort(tx, err).await);
                }
            };

            let inserted = tx.insert(&insert_sql, &values).await;
            if let Err(source) = inserted {
                let err = MigrateError::RowWrite {
                    table: table.to_string(),
                    row: row_number,
                    source,
                };
                return Err(self.abort(tx, err).await);
            }

            rows = row_number;
            if rows % PROGRESS_INTERVAL == 0 {
                info!("{}: migrated {} rows", table, rows);
            }
        }
        drop(cursor);
        self.phase(TablePhase::Exhausted);

        self.phase(TablePhase::Committing);
        if let Err(source) = tx.commit().await {
            self.phase(TablePhase::Failed);
            error!("{}: commit failed, no rows were migrated", table);
            return Err(MigrateError::Commit {
                table: table.to_string(),
                source,
            });
        }
        self.phase(TablePhase::Committed);

        info!("{}: migration complete, {} rows", table, rows);
        Ok(rows)
    }

    /// Roll back after a row failure and hand back the original error.
    async fn abort(
        &self,
        tx: Box<dyn TargetTransaction + '_>,
        err: MigrateError,
    ) -> MigrateError {
        if let Err(e) = tx.rollback().await {
            warn!("{}: rollback failed: {}", self.spec.name, e);
        }
        self.phase(TablePhase::RolledBack);
        err
    }
}
