//! Content digests of warehouse tables, used to check that reruns over the
//! same bronze data leave silver unchanged.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::catalog::{Layer, TableId};
use crate::snapshot::Snapshot;
use crate::store::{StoreError, Warehouse};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDigest {
    pub table: TableId,
    pub rows: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerDigest {
    pub layer: Layer,
    pub tables: Vec<TableDigest>,
    /// Digest over the per-table digests, in catalog order
    pub sha256: String,
}

/// SHA-256 over the columns and typed values of every row, in row order.
pub fn digest_snapshot(snapshot: &Snapshot) -> String {
    let mut hasher = Sha256::new();
    hasher.update(snapshot.columns.join("\x1f").as_bytes());
    for row in &snapshot.rows {
        hasher.update(b"\n");
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                hasher.update(b"\x1f");
            }
            // Type tag keeps NULL apart from the text "NULL"
            hasher.update(value.type_name().as_bytes());
            hasher.update(b":");
            hasher.update(value.to_string().as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

pub fn digest_layer<W: Warehouse + ?Sized>(warehouse: &W, layer: Layer) -> Result<LayerDigest, StoreError> {
    let mut tables = Vec::new();
    let mut hasher = Sha256::new();
    for table in TableId::all() {
        let snapshot = warehouse.read_table(layer, table)?;
        let sha256 = digest_snapshot(&snapshot);
        hasher.update(format!("{}={}\n", table.name(), sha256).as_bytes());
        tables.push(TableDigest {
            table,
            rows: snapshot.len(),
            sha256,
        });
    }
    Ok(LayerDigest {
        layer,
        tables,
        sha256: hex::encode(hasher.finalize()),
    })
}
