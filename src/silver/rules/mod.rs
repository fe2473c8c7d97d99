//! Per-table cleaning rules for the silver layer.
//!
//! Each rule reads its bronze snapshot into typed records, applies pure
//! record-to-record functions, and emits a snapshot in the silver column
//! layout. Rules hold no mutable state and are deterministic for a given
//! input (the ERP customer rule is also given the processing date).

pub mod coerce;
pub mod crm_customer;
pub mod crm_product;
pub mod crm_sales;
pub mod erp_category;
pub mod erp_customer;
pub mod erp_location;

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::catalog::TableId;
use crate::error::{CleaningCause, CleaningError};
use crate::snapshot::Snapshot;

pub use crm_customer::CustomerRule;
pub use crm_product::ProductRule;
pub use crm_sales::SalesRule;
pub use erp_category::CategoryRule;
pub use erp_customer::ErpCustomerRule;
pub use erp_location::LocationRule;

/// A cleaning rule for exactly one source table.
pub trait CleaningRule {
    fn table(&self) -> TableId;

    /// Transform a bronze snapshot into its silver form.
    fn apply(&self, snapshot: &Snapshot) -> Result<Snapshot, CleaningCause>;

    fn clean(&self, snapshot: &Snapshot) -> Result<Snapshot, CleaningError> {
        self.apply(snapshot)
            .map_err(|cause| CleaningError::new(self.table().name(), cause))
    }
}

/// Registry of cleaning rules keyed by table
pub struct RuleSet {
    rules: BTreeMap<TableId, Box<dyn CleaningRule>>,
}

impl RuleSet {
    /// Create a rule set with every built-in rule registered
    pub fn new(processing_date: NaiveDate) -> Self {
        let mut set = Self::empty();
        set.register(Box::new(CustomerRule));
        set.register(Box::new(ProductRule));
        set.register(Box::new(SalesRule));
        set.register(Box::new(ErpCustomerRule::new(processing_date)));
        set.register(Box::new(LocationRule));
        set.register(Box::new(CategoryRule));
        set
    }

    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, rule: Box<dyn CleaningRule>) {
        self.rules.insert(rule.table(), rule);
    }

    pub fn get(&self, table: TableId) -> Option<&dyn CleaningRule> {
        self.rules.get(&table).map(|r| r.as_ref())
    }

    /// Clean a snapshot with the rule registered for `table`
    pub fn clean(&self, table: TableId, snapshot: &Snapshot) -> Result<Snapshot, CleaningError> {
        match self.get(table) {
            Some(rule) => rule.clean(snapshot),
            None => Err(CleaningError::new(table.name(), CleaningCause::NoRule)),
        }
    }

    pub fn tables(&self) -> Vec<TableId> {
        self.rules.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_set_covers_every_table() {
        let set = RuleSet::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(set.tables(), TableId::all());
    }

    #[test]
    fn test_unregistered_table_is_a_cleaning_error() {
        let set = RuleSet::empty();
        let snap = Snapshot::new("erp_loc_a101", TableId::ErpLocA101.bronze_columns());
        let err = set.clean(TableId::ErpLocA101, &snap).unwrap_err();
        assert_eq!(err.table, "erp_loc_a101");
        assert_eq!(err.cause, CleaningCause::NoRule);
    }

    #[test]
    fn test_missing_column_carries_table_name() {
        let set = RuleSet::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let snap = Snapshot::new("erp_px_cat_g1v2", &["id", "cat"]);
        let err = set.clean(TableId::ErpPxCatG1v2, &snap).unwrap_err();
        assert_eq!(err.table, "erp_px_cat_g1v2");
        assert_eq!(err.cause, CleaningCause::MissingColumn("subcat".to_string()));
    }
}
