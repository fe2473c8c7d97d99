//! Post-cleaning checkpoint.
//!
//! Every cleaned snapshot passes through the [`QualityGate`] before it is
//! loaded. The gate re-checks the invariants the rules are meant to
//! establish; any issue blocks the load. The same checks run against
//! already-loaded silver tables from the `check-silver` binary.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::catalog::TableId;
use crate::constants::NOT_AVAILABLE;
use crate::error::{CleaningCause, CleaningError};
use crate::snapshot::{RowView, Snapshot};

const GENDERS: [&str; 3] = ["Male", "Female", NOT_AVAILABLE];
const MARITAL_STATUSES: [&str; 3] = ["Married", "Single", NOT_AVAILABLE];

/// Individual quality issue found during assessment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityIssue {
    /// Row position within the snapshot, when the issue concerns one row
    pub row: Option<usize>,
    /// Column that triggered this issue
    pub column: String,
    pub description: String,
}

impl QualityIssue {
    fn at(row: usize, column: &str, description: impl Into<String>) -> Self {
        Self {
            row: Some(row),
            column: column.to_string(),
            description: description.into(),
        }
    }
}

/// Invariant checks for cleaned silver snapshots.
pub struct QualityGate {
    processing_date: NaiveDate,
}

impl QualityGate {
    pub fn new(processing_date: NaiveDate) -> Self {
        Self { processing_date }
    }

    /// Assess a cleaned snapshot, returning every issue found.
    pub fn assess(&self, table: TableId, snapshot: &Snapshot) -> Vec<QualityIssue> {
        let columns = match snapshot.require_columns(table.silver_columns()) {
            Ok(columns) => columns,
            Err(cause) => {
                return vec![QualityIssue {
                    row: None,
                    column: String::new(),
                    description: cause.to_string(),
                }]
            }
        };

        let mut issues = Vec::new();
        let mut seen_ids = HashSet::new();
        for row in snapshot.row_views(&columns) {
            let outcome = match table {
                TableId::CrmCustomerInfo => self.assess_customer(&row, &mut seen_ids),
                TableId::CrmPrdInfo => self.assess_product(&row),
                TableId::CrmSalesDetails => self.assess_sales(&row),
                TableId::ErpCustAz12 => self.assess_erp_customer(&row),
                TableId::ErpLocA101 => self.assess_location(&row),
                TableId::ErpPxCatG1v2 => Ok(Vec::new()),
            };
            match outcome {
                Ok(found) => issues.extend(found),
                Err(cause) => issues.push(QualityIssue {
                    row: Some(row.position),
                    column: String::new(),
                    description: cause.to_string(),
                }),
            }
        }
        issues
    }

    /// Assess and turn the first issue into a cleaning error.
    pub fn enforce(&self, table: TableId, snapshot: &Snapshot) -> Result<(), CleaningError> {
        let issues = self.assess(table, snapshot);
        match issues.first() {
            None => Ok(()),
            Some(first) => {
                let location = first
                    .row
                    .map(|r| format!("row {r}"))
                    .unwrap_or_else(|| "table".to_string());
                Err(CleaningError::new(
                    table.name(),
                    CleaningCause::Invariant(format!(
                        "{} issue(s); first at {location}, column '{}': {}",
                        issues.len(),
                        first.column,
                        first.description
                    )),
                ))
            }
        }
    }

    fn assess_customer(
        &self,
        row: &RowView<'_>,
        seen_ids: &mut HashSet<i64>,
    ) -> Result<Vec<QualityIssue>, CleaningCause> {
        let mut issues = Vec::new();
        match row.integer("cst_id")? {
            None => issues.push(QualityIssue::at(row.position, "cst_id", "customer id is null")),
            Some(id) if !seen_ids.insert(id) => issues.push(QualityIssue::at(
                row.position,
                "cst_id",
                format!("customer id {id} appears more than once"),
            )),
            Some(_) => {}
        }
        check_closed_set(row, "cst_gnder", &GENDERS, &mut issues)?;
        check_closed_set(row, "cst_material_status", &MARITAL_STATUSES, &mut issues)?;
        Ok(issues)
    }

    fn assess_product(&self, row: &RowView<'_>) -> Result<Vec<QualityIssue>, CleaningCause> {
        let mut issues = Vec::new();
        match row.decimal_or_null("prd_cost")? {
            None => issues.push(QualityIssue::at(row.position, "prd_cost", "cost is null")),
            Some(cost) if cost.is_sign_negative() && !cost.is_zero() => issues.push(
                QualityIssue::at(row.position, "prd_cost", format!("cost {cost} is negative")),
            ),
            Some(_) => {}
        }
        for column in ["cat_id", "prd_key"] {
            if row.text(column)?.is_none() {
                issues.push(QualityIssue::at(row.position, column, "derived key is null"));
            }
        }
        Ok(issues)
    }

    fn assess_sales(&self, row: &RowView<'_>) -> Result<Vec<QualityIssue>, CleaningCause> {
        let mut issues = Vec::new();
        let sales = row.decimal_or_null("sls_sales")?;
        let quantity = row.integer("sls_quantity")?;
        let price = row.decimal_or_null("sls_price")?;
        match (sales, quantity, price) {
            (Some(sales), Some(quantity), Some(price)) => {
                if price.is_sign_negative() && !price.is_zero() {
                    issues.push(QualityIssue::at(
                        row.position,
                        "sls_price",
                        format!("price {price} is negative"),
                    ));
                }
                if price.checked_mul(Decimal::from(quantity)) != Some(sales) {
                    issues.push(QualityIssue::at(
                        row.position,
                        "sls_sales",
                        format!("sales {sales} != quantity {quantity} * price {price}"),
                    ));
                }
            }
            _ => issues.push(QualityIssue::at(
                row.position,
                "sls_sales",
                "sales, quantity and price must all be present",
            )),
        }
        Ok(issues)
    }

    fn assess_erp_customer(&self, row: &RowView<'_>) -> Result<Vec<QualityIssue>, CleaningCause> {
        let mut issues = Vec::new();
        if let Some(bdate) = row.date("bdate")? {
            if bdate >= self.processing_date {
                issues.push(QualityIssue::at(
                    row.position,
                    "bdate",
                    format!("birthdate {bdate} is not in the past"),
                ));
            }
        }
        if row.text("gen")?.map_or(true, |g| g.trim().is_empty()) {
            issues.push(QualityIssue::at(row.position, "gen", "gender is blank"));
        }
        Ok(issues)
    }

    fn assess_location(&self, row: &RowView<'_>) -> Result<Vec<QualityIssue>, CleaningCause> {
        let mut issues = Vec::new();
        if let Some(cid) = row.text("cid")? {
            if cid.contains('-') {
                issues.push(QualityIssue::at(
                    row.position,
                    "cid",
                    format!("customer id {cid} still contains separators"),
                ));
            }
        }
        if row.text("cntry")?.map_or(true, |c| c.trim().is_empty()) {
            issues.push(QualityIssue::at(row.position, "cntry", "country is blank"));
        }
        Ok(issues)
    }
}

fn check_closed_set(
    row: &RowView<'_>,
    column: &str,
    allowed: &[&str],
    issues: &mut Vec<QualityIssue>,
) -> Result<(), CleaningCause> {
    let value = row.text(column)?;
    if !value.as_deref().is_some_and(|v| allowed.contains(&v)) {
        issues.push(QualityIssue::at(
            row.position,
            column,
            format!("{value:?} is not one of {allowed:?}"),
        ));
    }
    Ok(())
}
