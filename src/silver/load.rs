use tracing::debug;

use crate::catalog::{Layer, TableId};
use crate::error::LoadError;
use crate::snapshot::Snapshot;
use crate::store::Warehouse;

/// Writes cleaned snapshots into silver tables.
pub struct Loader<'a, W: Warehouse + ?Sized> {
    warehouse: &'a W,
}

impl<'a, W: Warehouse + ?Sized> Loader<'a, W> {
    pub fn new(warehouse: &'a W) -> Self {
        Self { warehouse }
    }

    pub fn truncate(&self, table: TableId) -> Result<(), LoadError> {
        self.warehouse
            .truncate(Layer::Silver, table)
            .map_err(|source| LoadError {
                table: table.name().to_string(),
                source,
            })
    }

    /// Append a cleaned snapshot; returns the number of rows written.
    pub fn append(&self, table: TableId, snapshot: &Snapshot) -> Result<usize, LoadError> {
        let written = self
            .warehouse
            .append(Layer::Silver, table, snapshot)
            .map_err(|source| LoadError {
                table: table.name().to_string(),
                source,
            })?;
        debug!(table = %table, rows = written, "Appended to silver");
        Ok(written)
    }

    /// Truncate then append.
    pub fn load(&self, table: TableId, snapshot: &Snapshot) -> Result<usize, LoadError> {
        self.truncate(table)?;
        self.append(table, snapshot)
    }
}
