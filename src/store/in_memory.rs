use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::{validate_columns, StoreError, Warehouse};
use crate::catalog::{Layer, TableId};
use crate::snapshot::Snapshot;

/// Operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOn {
    Read,
    Truncate,
    Append,
}

/// In-memory warehouse implementation for development/testing
#[derive(Clone, Default)]
pub struct InMemoryWarehouse {
    tables: Arc<Mutex<HashMap<(Layer, TableId), Snapshot>>>,
    failures: Arc<Mutex<HashSet<(FailOn, Layer, TableId)>>>,
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// A warehouse with every catalog table created empty in both layers.
    pub fn with_catalog() -> Self {
        let warehouse = Self::new();
        for table in TableId::all() {
            for layer in [Layer::Bronze, Layer::Silver] {
                warehouse.create_table(layer, table, table.columns(layer));
            }
        }
        warehouse
    }

    pub fn create_table(&self, layer: Layer, table: TableId, columns: &[&str]) {
        let mut tables = self.tables.lock().unwrap();
        tables.insert((layer, table), Snapshot::new(table.name(), columns));
    }

    /// Replace a table's rows wholesale, keeping its declared columns.
    pub fn seed(&self, layer: Layer, snapshot: Snapshot) -> Result<(), StoreError> {
        let table: TableId = snapshot
            .table
            .parse()
            .map_err(|_| StoreError::UnknownTable(snapshot.table.clone()))?;
        self.truncate(layer, table)?;
        self.append(layer, table, &snapshot)?;
        Ok(())
    }

    pub fn fail_on(&self, op: FailOn, layer: Layer, table: TableId) {
        self.failures.lock().unwrap().insert((op, layer, table));
    }

    fn check_failure(&self, op: FailOn, layer: Layer, table: TableId) -> Result<(), StoreError> {
        if self.failures.lock().unwrap().contains(&(op, layer, table)) {
            return Err(StoreError::Unavailable(format!(
                "{:?} on {} refused",
                op,
                table.qualified(layer)
            )));
        }
        Ok(())
    }
}

impl Warehouse for InMemoryWarehouse {
    fn read_table(&self, layer: Layer, table: TableId) -> Result<Snapshot, StoreError> {
        self.check_failure(FailOn::Read, layer, table)?;
        let tables = self.tables.lock().unwrap();
        tables
            .get(&(layer, table))
            .cloned()
            .ok_or_else(|| StoreError::UnknownTable(table.qualified(layer)))
    }

    fn table_columns(&self, layer: Layer, table: TableId) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.lock().unwrap();
        tables
            .get(&(layer, table))
            .map(|s| s.columns.clone())
            .ok_or_else(|| StoreError::UnknownTable(table.qualified(layer)))
    }

    fn truncate(&self, layer: Layer, table: TableId) -> Result<(), StoreError> {
        self.check_failure(FailOn::Truncate, layer, table)?;
        let mut tables = self.tables.lock().unwrap();
        let stored = tables
            .get_mut(&(layer, table))
            .ok_or_else(|| StoreError::UnknownTable(table.qualified(layer)))?;
        stored.rows.clear();
        debug!("Truncated {}", table.qualified(layer));
        Ok(())
    }

    fn append(&self, layer: Layer, table: TableId, snapshot: &Snapshot) -> Result<usize, StoreError> {
        self.check_failure(FailOn::Append, layer, table)?;
        let qualified = table.qualified(layer);
        let mut tables = self.tables.lock().unwrap();
        let stored = tables
            .get_mut(&(layer, table))
            .ok_or_else(|| StoreError::UnknownTable(qualified.clone()))?;
        validate_columns(&qualified, &stored.columns, snapshot)?;

        // Reorder each incoming row into the stored column layout, padding with nulls.
        let positions: Vec<Option<usize>> = stored
            .columns
            .iter()
            .map(|c| snapshot.columns.iter().position(|s| s.eq_ignore_ascii_case(c)))
            .collect();
        for values in &snapshot.rows {
            let row = positions
                .iter()
                .map(|p| p.map_or(crate::snapshot::Scalar::Null, |i| values[i].clone()))
                .collect();
            stored.rows.push(row);
        }
        debug!("Appended {} rows to {}", snapshot.len(), qualified);
        Ok(snapshot.len())
    }

    fn execute_script(&self, _sql: &str) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("execute_script"))
    }
}
