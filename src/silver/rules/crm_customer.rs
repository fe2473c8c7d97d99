use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::coerce::trimmed;
use super::CleaningRule;
use crate::catalog::TableId;
use crate::constants::NOT_AVAILABLE;
use crate::error::CleaningCause;
use crate::snapshot::{RowView, Scalar, Snapshot};

/// One CRM customer row after type casting.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub id: Option<i64>,
    pub key: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub marital_status: Option<String>,
    pub gender: Option<String>,
    pub create_date: Option<NaiveDate>,
}

impl CustomerRecord {
    fn from_row(row: &RowView<'_>) -> Result<Self, CleaningCause> {
        Ok(Self {
            id: row.integer("cst_id")?,
            key: row.text("cst_key")?,
            firstname: row.text("cst_firstname")?,
            lastname: row.text("cst_lastname")?,
            marital_status: row.text("cst_material_status")?,
            gender: row.text("cst_gnder")?,
            create_date: row.date("cst_create_date")?,
        })
    }
}

/// Gender code to display value: `M` and `F` only, everything else is `N/A`.
pub fn map_gender(code: Option<&str>) -> &'static str {
    match code.map(|c| c.trim().to_uppercase()).as_deref() {
        Some("M") => "Male",
        Some("F") => "Female",
        _ => NOT_AVAILABLE,
    }
}

/// Marital status code to display value: `M` and `S` only, everything else is `N/A`.
pub fn map_marital_status(code: Option<&str>) -> &'static str {
    match code.map(|c| c.trim().to_uppercase()).as_deref() {
        Some("M") => "Married",
        Some("S") => "Single",
        _ => NOT_AVAILABLE,
    }
}

/// Keep one record per customer id: the one with the latest create date.
///
/// A missing create date loses to any present one; equal dates keep the
/// record seen first. Records without an id are dropped. The result is
/// ordered by id.
pub fn latest_per_customer(records: Vec<CustomerRecord>) -> Vec<CustomerRecord> {
    let mut latest: BTreeMap<i64, CustomerRecord> = BTreeMap::new();
    for record in records {
        let Some(id) = record.id else { continue };
        match latest.get(&id) {
            Some(kept) if kept.create_date >= record.create_date => {}
            _ => {
                latest.insert(id, record);
            }
        }
    }
    latest.into_values().collect()
}

fn standardize(record: CustomerRecord) -> Vec<Scalar> {
    vec![
        Scalar::from(record.id),
        Scalar::from(trimmed(record.key)),
        Scalar::from(trimmed(record.firstname)),
        Scalar::from(trimmed(record.lastname)),
        Scalar::text(map_marital_status(record.marital_status.as_deref())),
        Scalar::text(map_gender(record.gender.as_deref())),
        Scalar::from(record.create_date),
    ]
}

/// Cleaning rule for `crm_customer_info`
pub struct CustomerRule;

impl CleaningRule for CustomerRule {
    fn table(&self) -> TableId {
        TableId::CrmCustomerInfo
    }

    fn apply(&self, snapshot: &Snapshot) -> Result<Snapshot, CleaningCause> {
        let table = self.table();
        let columns = snapshot.require_columns(table.bronze_columns())?;
        let records = snapshot
            .row_views(&columns)
            .map(|row| CustomerRecord::from_row(&row))
            .collect::<Result<Vec<_>, _>>()?;

        let rows = latest_per_customer(records)
            .into_iter()
            .map(standardize)
            .collect();
        Ok(Snapshot::new(table.name(), table.silver_columns()).with_rows(rows))
    }
}
