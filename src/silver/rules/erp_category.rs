use super::CleaningRule;
use crate::catalog::TableId;
use crate::error::CleaningCause;
use crate::snapshot::{Scalar, Snapshot};

/// Cleaning rule for `erp_px_cat_g1v2`: values pass through untouched, the
/// columns are checked and emitted in silver order.
pub struct CategoryRule;

impl CleaningRule for CategoryRule {
    fn table(&self) -> TableId {
        TableId::ErpPxCatG1v2
    }

    fn apply(&self, snapshot: &Snapshot) -> Result<Snapshot, CleaningCause> {
        let table = self.table();
        let silver = table.silver_columns();
        snapshot.require_columns(silver)?;
        let indices: Vec<usize> = silver
            .iter()
            .filter_map(|c| snapshot.column_index(c))
            .collect();
        let rows = snapshot
            .rows
            .iter()
            .map(|values| {
                indices
                    .iter()
                    .map(|&i| values.get(i).cloned().unwrap_or(Scalar::Null))
                    .collect()
            })
            .collect();
        Ok(Snapshot::new(table.name(), silver).with_rows(rows))
    }
}
