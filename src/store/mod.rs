//! Warehouse storage abstraction.
//!
//! The pipeline only needs a handful of table-level primitives from the store:
//! full-table reads, truncation, validated appends and script execution. The
//! SQLite implementation backs real runs; the in-memory one backs tests.

pub mod in_memory;
pub mod sqlite;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Layer, TableId};
use crate::snapshot::Snapshot;

pub use in_memory::InMemoryWarehouse;
pub use sqlite::SqliteWarehouse;

/// Store-level conditions that provisioning may be configured to tolerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoverableCondition {
    /// Another connection holds the database (SQLITE_BUSY).
    DatabaseBusy,
    /// A table in the database is locked by this connection (SQLITE_LOCKED).
    DatabaseLocked,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("table {0} does not exist")]
    UnknownTable(String),

    #[error("table {table} has no column(s) {missing:?}")]
    SchemaMismatch { table: String, missing: Vec<String> },

    #[error("row {row} has {found} values but {table} declares {expected} columns")]
    RowWidth {
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("column {column} of {table} holds an unsupported {kind} value")]
    UnsupportedValue {
        table: String,
        column: String,
        kind: &'static str,
    },

    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("operation not supported by this warehouse: {0}")]
    Unsupported(&'static str),

    #[error("warehouse unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Structured condition code, if the failure is one provisioning can be told to tolerate.
    pub fn condition(&self) -> Option<RecoverableCondition> {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => match err.code {
                rusqlite::ErrorCode::DatabaseBusy => Some(RecoverableCondition::DatabaseBusy),
                rusqlite::ErrorCode::DatabaseLocked => Some(RecoverableCondition::DatabaseLocked),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Table-level operations the pipeline needs from a relational store.
pub trait Warehouse {
    /// Read the full current contents of a table.
    fn read_table(&self, layer: Layer, table: TableId) -> Result<Snapshot, StoreError>;

    /// Declared columns of a table, in order.
    fn table_columns(&self, layer: Layer, table: TableId) -> Result<Vec<String>, StoreError>;

    fn truncate(&self, layer: Layer, table: TableId) -> Result<(), StoreError>;

    /// Append every row of `snapshot`, after checking its columns exist in the destination.
    fn append(&self, layer: Layer, table: TableId, snapshot: &Snapshot) -> Result<usize, StoreError>;

    /// Run a multi-statement SQL script.
    fn execute_script(&self, sql: &str) -> Result<(), StoreError>;
}

/// Checks that every snapshot column is declared by the destination table.
pub fn validate_columns(
    qualified: &str,
    declared: &[String],
    snapshot: &Snapshot,
) -> Result<(), StoreError> {
    let missing: Vec<String> = snapshot
        .columns
        .iter()
        .filter(|c| !declared.iter().any(|d| d.eq_ignore_ascii_case(c)))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(StoreError::SchemaMismatch {
            table: qualified.to_string(),
            missing,
        });
    }
    let width = snapshot.columns.len();
    if let Some((row, values)) = snapshot
        .rows
        .iter()
        .enumerate()
        .find(|(_, values)| values.len() != width)
    {
        return Err(StoreError::RowWidth {
            table: qualified.to_string(),
            row,
            expected: width,
            found: values.len(),
        });
    }
    Ok(())
}
