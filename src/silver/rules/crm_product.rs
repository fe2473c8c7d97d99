use std::collections::HashMap;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;

use super::coerce::trimmed;
use super::CleaningRule;
use crate::catalog::TableId;
use crate::constants::{MONEY_SCALE, NOT_AVAILABLE};
use crate::error::CleaningCause;
use crate::snapshot::{RowView, Scalar, Snapshot};

/// Characters of the raw product key that encode the category.
pub const CATEGORY_PREFIX_LEN: usize = 5;
/// Characters stripped from the raw product key to get the product key proper:
/// the category prefix plus the `-` that follows it.
pub const KEY_PREFIX_LEN: usize = 6;

static PRODUCT_LINES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("M", "Mountain"),
        ("R", "Road"),
        ("S", "Other Sales"),
        ("T", "Touring"),
    ])
});

/// One CRM product row after type casting.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub position: usize,
    pub id: Option<i64>,
    pub raw_key: String,
    pub name: Option<String>,
    pub cost: Option<Decimal>,
    pub line: Option<String>,
    pub start_date: Option<NaiveDate>,
}

impl ProductRecord {
    fn from_row(row: &RowView<'_>) -> Result<Self, CleaningCause> {
        let raw_key = trimmed(row.text("prd_key")?).ok_or_else(|| CleaningCause::Precondition {
            row: row.position,
            message: "prd_key is null".to_string(),
        })?;
        Ok(Self {
            position: row.position,
            id: row.integer("prd_id")?,
            raw_key,
            name: row.text("prd_nm")?,
            cost: row.decimal_or_null("prd_cost")?,
            line: row.text("prd_line")?,
            start_date: row.date_or_null("prd_start_dt")?,
        })
    }
}

/// Product line code to category name, case-insensitive; unknown or null is `N/A`.
pub fn map_product_line(code: Option<&str>) -> &'static str {
    code.map(|c| c.trim().to_uppercase())
        .and_then(|c| PRODUCT_LINES.get(c.as_str()).copied())
        .unwrap_or(NOT_AVAILABLE)
}

/// Category id: the first characters of the raw key with `-` turned into `_`.
pub fn derive_category_id(raw_key: &str) -> String {
    raw_key
        .chars()
        .take(CATEGORY_PREFIX_LEN)
        .collect::<String>()
        .replace('-', "_")
}

/// Product key: the raw key without its category prefix.
pub fn derive_product_key(raw_key: &str) -> String {
    raw_key.chars().skip(KEY_PREFIX_LEN).collect()
}

/// End date of every record, indexed like `records`.
///
/// Records sharing a raw key are ordered by start date (missing dates last,
/// ties in input order); each one ends the day before the next one starts and
/// the last one stays open.
pub fn derive_end_dates(records: &[ProductRecord]) -> Vec<Option<NaiveDate>> {
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, record) in records.iter().enumerate() {
        groups.entry(record.raw_key.as_str()).or_default().push(idx);
    }

    let mut end_dates = vec![None; records.len()];
    for members in groups.values_mut() {
        members.sort_by_key(|&idx| {
            let start = records[idx].start_date;
            (start.is_none(), start)
        });
        for pair in members.windows(2) {
            end_dates[pair[0]] = records[pair[1]].start_date.and_then(|d| d.pred_opt());
        }
    }
    end_dates
}

/// Mean of every non-negative cost in the batch, zero when there is none.
pub fn batch_mean_cost(records: &[ProductRecord]) -> Result<Decimal, CleaningCause> {
    let mut total = Decimal::ZERO;
    let mut count: i64 = 0;
    for record in records {
        if let Some(cost) = record.cost.filter(|c| !c.is_sign_negative()) {
            total = total
                .checked_add(cost)
                .ok_or_else(|| CleaningCause::Precondition {
                    row: record.position,
                    message: "prd_cost total exceeds the decimal range".to_string(),
                })?;
            count += 1;
        }
    }
    if count == 0 {
        return Ok(Decimal::ZERO);
    }
    Ok((total / Decimal::from(count)).round_dp(MONEY_SCALE))
}

/// Replace missing and negative costs with the batch mean.
pub fn impute_cost(cost: Option<Decimal>, mean: Decimal) -> Decimal {
    match cost {
        Some(c) if !c.is_sign_negative() => c,
        _ => mean,
    }
}

/// Cleaning rule for `crm_prd_info`
pub struct ProductRule;

impl CleaningRule for ProductRule {
    fn table(&self) -> TableId {
        TableId::CrmPrdInfo
    }

    fn apply(&self, snapshot: &Snapshot) -> Result<Snapshot, CleaningCause> {
        let table = self.table();
        let columns = snapshot.require_columns(table.bronze_columns())?;
        let records = snapshot
            .row_views(&columns)
            .map(|row| ProductRecord::from_row(&row))
            .collect::<Result<Vec<_>, _>>()?;

        // The mean has to see the whole batch before any cost is replaced.
        let mean = batch_mean_cost(&records)?;
        let end_dates = derive_end_dates(&records);

        let rows = records
            .into_iter()
            .zip(end_dates)
            .map(|(record, end_date)| {
                vec![
                    Scalar::from(record.id),
                    Scalar::Text(derive_category_id(&record.raw_key)),
                    Scalar::Text(derive_product_key(&record.raw_key)),
                    Scalar::from(record.name),
                    Scalar::Decimal(impute_cost(record.cost, mean)),
                    Scalar::text(map_product_line(record.line.as_deref())),
                    Scalar::from(record.start_date),
                    Scalar::from(end_date),
                ]
            })
            .collect();
        Ok(Snapshot::new(table.name(), table.silver_columns()).with_rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn bronze_row(id: i64, key: &str, cost: Scalar, line: &str, start: &str) -> Vec<Scalar> {
        vec![
            Scalar::Integer(id),
            Scalar::text(key),
            Scalar::text("HL Road Frame"),
            cost,
            Scalar::text(line),
            Scalar::text(start),
            Scalar::Null,
        ]
    }

    fn bronze(rows: Vec<Vec<Scalar>>) -> Snapshot {
        Snapshot::new("crm_prd_info", TableId::CrmPrdInfo.bronze_columns()).with_rows(rows)
    }

    fn date(y: i32, m: u32, d: u32) -> Scalar {
        Scalar::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_product_line_mapping() {
        assert_eq!(map_product_line(Some("m")), "Mountain");
        assert_eq!(map_product_line(Some(" R ")), "Road");
        assert_eq!(map_product_line(Some("s")), "Other Sales");
        assert_eq!(map_product_line(Some("T")), "Touring");
        assert_eq!(map_product_line(None), "N/A");
        assert_eq!(map_product_line(Some("X")), "N/A");
    }

    #[test]
    fn test_key_derivation() {
        assert_eq!(derive_category_id("CO-RF-FR-R92B-58"), "CO_RF");
        assert_eq!(derive_product_key("CO-RF-FR-R92B-58"), "FR-R92B-58");
        assert_eq!(derive_category_id("AB"), "AB");
        assert_eq!(derive_product_key("AB"), "");
    }

    #[test]
    fn test_end_dates_follow_chronological_order_per_key() {
        let snap = bronze(vec![
            bronze_row(1, "CO-RF-FR-R92B-58", Scalar::Integer(10), "R", "2013-07-01"),
            bronze_row(2, "CO-RF-FR-R92B-58", Scalar::Integer(12), "R", "2011-07-01"),
            bronze_row(3, "AC-HE-HL-U509-R", Scalar::Integer(5), "S", "2011-07-01"),
            bronze_row(4, "CO-RF-FR-R92B-58", Scalar::Integer(14), "R", "2012-07-01"),
        ]);
        let cleaned = ProductRule.apply(&snap).unwrap();
        let ends: Vec<&Scalar> = cleaned.rows.iter().map(|r| &r[7]).collect();
        assert_eq!(ends[0], &Scalar::Null);
        assert_eq!(ends[1], &date(2012, 6, 30));
        assert_eq!(ends[2], &Scalar::Null);
        assert_eq!(ends[3], &date(2013, 6, 30));
    }

    #[test]
    fn test_invalid_costs_replaced_by_batch_mean() {
        let snap = bronze(vec![
            bronze_row(1, "CO-RF-A", Scalar::Integer(10), "M", "2011-07-01"),
            bronze_row(2, "CO-RF-B", Scalar::Integer(20), "M", "2011-07-01"),
            bronze_row(3, "CO-RF-C", Scalar::Integer(-5), "M", "2011-07-01"),
            bronze_row(4, "CO-RF-D", Scalar::Null, "M", "2011-07-01"),
            bronze_row(5, "CO-RF-E", Scalar::text("free"), "M", "2011-07-01"),
        ]);
        let cleaned = ProductRule.apply(&snap).unwrap();
        let costs: Vec<&Scalar> = cleaned.rows.iter().map(|r| &r[4]).collect();
        let mean = Scalar::Decimal(Decimal::from(15));
        assert_eq!(costs[0], &Scalar::Decimal(Decimal::from(10)));
        assert_eq!(costs[2], &mean);
        assert_eq!(costs[3], &mean);
        assert_eq!(costs[4], &mean);
    }

    #[test]
    fn test_mean_is_rounded_and_zero_without_valid_costs() {
        let records: Vec<ProductRecord> = [1, 1, 2]
            .iter()
            .enumerate()
            .map(|(i, c)| ProductRecord {
                position: i,
                id: Some(i as i64),
                raw_key: "CO-RF-X".to_string(),
                name: None,
                cost: Some(Decimal::from(*c)),
                line: None,
                start_date: None,
            })
            .collect();
        assert_eq!(
            batch_mean_cost(&records).unwrap(),
            Decimal::from_str("1.3333").unwrap()
        );
        assert_eq!(batch_mean_cost(&[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_unparseable_start_date_becomes_null() {
        let snap = bronze(vec![
            bronze_row(1, "CO-RF-A", Scalar::Integer(1), "M", "soon"),
            bronze_row(2, "CO-RF-A", Scalar::Integer(1), "M", "2011-07-01"),
        ]);
        let cleaned = ProductRule.apply(&snap).unwrap();
        assert_eq!(cleaned.rows[0][6], Scalar::Null);
        assert_eq!(cleaned.rows[0][7], Scalar::Null);
        // The dated record sorts first and runs until the day before the next start, which is unknown.
        assert_eq!(cleaned.rows[1][7], Scalar::Null);
    }

    #[test]
    fn test_null_key_is_rejected() {
        let mut row = bronze_row(1, "x", Scalar::Integer(1), "M", "2011-07-01");
        row[1] = Scalar::Null;
        assert!(matches!(
            ProductRule.apply(&bronze(vec![row])),
            Err(CleaningCause::Precondition { row: 0, .. })
        ));
    }
}
