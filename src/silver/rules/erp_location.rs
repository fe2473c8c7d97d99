use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::CleaningRule;
use crate::catalog::TableId;
use crate::constants::NOT_AVAILABLE;
use crate::error::CleaningCause;
use crate::snapshot::{Scalar, Snapshot};

static COUNTRY_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("DE", "Germany"),
        ("US", "United States"),
        ("USA", "United States"),
    ])
});

/// Trim a customer id and drop its `-` separators.
pub fn normalize_location_id(cid: &str) -> String {
    cid.trim().replace('-', "")
}

/// Country code to full name; blank or null is `N/A`, anything else passes through trimmed.
pub fn canonical_country(cntry: Option<&str>) -> String {
    let trimmed = cntry.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return NOT_AVAILABLE.to_string();
    }
    COUNTRY_NAMES
        .get(trimmed)
        .map(|name| name.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Cleaning rule for `erp_loc_a101`
pub struct LocationRule;

impl CleaningRule for LocationRule {
    fn table(&self) -> TableId {
        TableId::ErpLocA101
    }

    fn apply(&self, snapshot: &Snapshot) -> Result<Snapshot, CleaningCause> {
        let table = self.table();
        let columns = snapshot.require_columns(table.bronze_columns())?;
        let rows = snapshot
            .row_views(&columns)
            .map(|row| {
                let cid = row.text("cid")?.map(|c| normalize_location_id(&c));
                let country = canonical_country(row.text("cntry")?.as_deref());
                Ok(vec![Scalar::from(cid), Scalar::Text(country)])
            })
            .collect::<Result<Vec<_>, CleaningCause>>()?;
        Ok(Snapshot::new(table.name(), table.silver_columns()).with_rows(rows))
    }
}
