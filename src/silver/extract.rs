use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info};

use crate::catalog::{Layer, TableId};
use crate::error::ExtractionError;
use crate::metrics::SilverMetrics;
use crate::snapshot::Snapshot;
use crate::store::Warehouse;

/// Reads bronze tables into in-memory snapshots.
pub struct Extractor<'a, W: Warehouse + ?Sized> {
    warehouse: &'a W,
}

impl<'a, W: Warehouse + ?Sized> Extractor<'a, W> {
    pub fn new(warehouse: &'a W) -> Self {
        Self { warehouse }
    }

    /// Snapshot every requested bronze table.
    ///
    /// All tables are read before anything is returned; the first failure
    /// aborts the extraction and names the table that could not be read.
    pub fn extract(&self, tables: &[TableId]) -> Result<BTreeMap<TableId, Snapshot>, ExtractionError> {
        let start = Instant::now();
        let mut snapshots = BTreeMap::new();
        for &table in tables {
            let snapshot = self
                .warehouse
                .read_table(Layer::Bronze, table)
                .map_err(|source| ExtractionError {
                    table: table.name().to_string(),
                    source,
                })?;
            debug!(table = %table, rows = snapshot.len(), "Extracted bronze table");
            snapshots.insert(table, snapshot);
        }
        let elapsed = start.elapsed();
        SilverMetrics::record_extraction(elapsed.as_secs_f64());
        info!(
            "Extracted {} bronze tables in {:.3}s",
            snapshots.len(),
            elapsed.as_secs_f64()
        );
        Ok(snapshots)
    }
}
