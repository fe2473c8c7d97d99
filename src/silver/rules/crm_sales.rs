use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::coerce::{date_code, decode_date_code};
use super::CleaningRule;
use crate::catalog::TableId;
use crate::constants::MONEY_SCALE;
use crate::error::CleaningCause;
use crate::snapshot::{RowView, Scalar, Snapshot};

/// A bronze sales line with dates already decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub order_number: Option<String>,
    pub product_key: Option<String>,
    pub customer_id: Option<i64>,
    pub order_date: Option<NaiveDate>,
    pub ship_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub sales: Option<Decimal>,
    pub quantity: Option<i64>,
    pub price: Option<Decimal>,
}

/// A sales line satisfying `sales == quantity * price` with a non-negative price.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanSalesRecord {
    pub order_number: Option<String>,
    pub product_key: Option<String>,
    pub customer_id: Option<i64>,
    pub order_date: Option<NaiveDate>,
    pub ship_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub sales: Decimal,
    pub quantity: i64,
    pub price: Decimal,
}

impl SalesRecord {
    fn from_row(row: &RowView<'_>) -> Result<Self, CleaningCause> {
        let decode = |column: &str| -> Result<Option<NaiveDate>, CleaningCause> {
            Ok(date_code(row.get(column)?).and_then(decode_date_code))
        };
        Ok(Self {
            order_number: row.text("sls_ord_num")?,
            product_key: row.text("sls_prd_key")?,
            customer_id: row.integer("sls_cust_id")?,
            order_date: decode("sls_order_dt")?,
            ship_date: decode("sls_ship_dt")?,
            due_date: decode("sls_due_dt")?,
            sales: row.decimal_or_null("sls_sales")?,
            quantity: row.integer("sls_quantity")?,
            price: row.decimal_or_null("sls_price")?,
        })
    }
}

/// Apply the `sales = quantity * price` business rule to one line.
///
/// In order: a missing price is derived as `sales / quantity`; a negative
/// price is made positive and sales recomputed; finally sales is recomputed
/// whenever it still disagrees with `quantity * price`. The error string
/// names the broken precondition (missing quantity, or no price and no sales).
pub fn apply_sales_rule(record: SalesRecord) -> Result<CleanSalesRecord, String> {
    let quantity = record
        .quantity
        .ok_or_else(|| "sls_quantity is null".to_string())?;
    let units = Decimal::from(quantity);
    let multiply = |price: Decimal| {
        price
            .checked_mul(units)
            .ok_or_else(|| format!("sls_price {price} * sls_quantity {quantity} overflows"))
    };

    let mut sales = record.sales;
    let mut price = match record.price {
        Some(price) => price,
        None => {
            let total = sales.ok_or_else(|| "sls_price and sls_sales are both null".to_string())?;
            total
                .checked_div(units)
                .ok_or_else(|| format!("cannot derive sls_price from sls_sales {total} / sls_quantity {quantity}"))?
                .round_dp(MONEY_SCALE)
        }
    };

    if price.is_sign_negative() {
        price = price.abs();
        sales = Some(multiply(price)?);
    }

    let expected = multiply(price)?;
    let sales = match sales {
        Some(s) if s == expected => s,
        _ => expected,
    };

    Ok(CleanSalesRecord {
        order_number: record.order_number,
        product_key: record.product_key,
        customer_id: record.customer_id,
        order_date: record.order_date,
        ship_date: record.ship_date,
        due_date: record.due_date,
        sales,
        quantity,
        price,
    })
}

impl CleanSalesRecord {
    fn into_row(self) -> Vec<Scalar> {
        vec![
            Scalar::from(self.order_number),
            Scalar::from(self.product_key),
            Scalar::from(self.customer_id),
            Scalar::from(self.order_date),
            Scalar::from(self.ship_date),
            Scalar::from(self.due_date),
            Scalar::Decimal(self.sales),
            Scalar::Integer(self.quantity),
            Scalar::Decimal(self.price),
        ]
    }
}

/// Cleaning rule for `crm_sales_details`
pub struct SalesRule;

impl CleaningRule for SalesRule {
    fn table(&self) -> TableId {
        TableId::CrmSalesDetails
    }

    fn apply(&self, snapshot: &Snapshot) -> Result<Snapshot, CleaningCause> {
        let table = self.table();
        let columns = snapshot.require_columns(table.bronze_columns())?;
        let rows = snapshot
            .row_views(&columns)
            .map(|row| {
                let position = row.position;
                let record = SalesRecord::from_row(&row)?;
                apply_sales_rule(record)
                    .map(CleanSalesRecord::into_row)
                    .map_err(|message| CleaningCause::Precondition { row: position, message })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Snapshot::new(table.name(), table.silver_columns()).with_rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn record(sales: Option<i64>, quantity: i64, price: Option<i64>) -> SalesRecord {
        SalesRecord {
            order_number: Some("SO43697".to_string()),
            product_key: Some("BK-R93R-62".to_string()),
            customer_id: Some(21768),
            order_date: None,
            ship_date: None,
            due_date: None,
            sales: sales.map(Decimal::from),
            quantity: Some(quantity),
            price: price.map(Decimal::from),
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_missing_price_derived_from_sales() {
        let clean = apply_sales_rule(record(Some(50), 2, None)).unwrap();
        assert_eq!(clean.price, dec("25"));
        assert_eq!(clean.sales, dec("50"));
    }

    #[test]
    fn test_negative_price_made_positive() {
        let clean = apply_sales_rule(record(Some(-40), 2, Some(-20))).unwrap();
        assert_eq!(clean.price, dec("20"));
        assert_eq!(clean.sales, dec("40"));
    }

    #[test]
    fn test_inconsistent_sales_recomputed() {
        let clean = apply_sales_rule(record(Some(999), 3, Some(10))).unwrap();
        assert_eq!(clean.sales, dec("30"));

        let clean = apply_sales_rule(record(None, 3, Some(10))).unwrap();
        assert_eq!(clean.sales, dec("30"));
    }

    #[test]
    fn test_fractional_price_keeps_identity_exact() {
        let clean = apply_sales_rule(record(Some(10), 3, None)).unwrap();
        assert_eq!(clean.price, dec("3.3333"));
        assert_eq!(clean.sales, clean.price * Decimal::from(clean.quantity));
    }

    #[test]
    fn test_broken_preconditions_are_errors() {
        assert!(apply_sales_rule(record(None, 2, None)).is_err());
        assert!(apply_sales_rule(record(Some(10), 0, None)).is_err());
        let mut no_quantity = record(Some(10), 1, Some(10));
        no_quantity.quantity = None;
        assert!(apply_sales_rule(no_quantity).is_err());
    }

    #[test]
    fn test_rule_decodes_dates_and_holds_identity() {
        let columns = TableId::CrmSalesDetails.bronze_columns();
        let snap = Snapshot::new("crm_sales_details", columns).with_rows(vec![
            vec![
                Scalar::text("SO43697"),
                Scalar::text("BK-R93R-62"),
                Scalar::Integer(21768),
                Scalar::Integer(20101229),
                Scalar::Integer(0),
                Scalar::text("20110110"),
                Scalar::Integer(3578),
                Scalar::Integer(1),
                Scalar::Null,
            ],
            vec![
                Scalar::text("SO43698"),
                Scalar::text("BK-M82S-44"),
                Scalar::Integer(28389),
                Scalar::Integer(5489),
                Scalar::Integer(20500102),
                Scalar::Null,
                Scalar::Null,
                Scalar::Integer(2),
                Scalar::Integer(-3400),
            ],
        ]);
        let cleaned = SalesRule.apply(&snap).unwrap();

        let first = &cleaned.rows[0];
        assert_eq!(first[3], Scalar::Date(NaiveDate::from_ymd_opt(2010, 12, 29).unwrap()));
        assert_eq!(first[4], Scalar::Null);
        assert_eq!(first[5], Scalar::Date(NaiveDate::from_ymd_opt(2011, 1, 10).unwrap()));
        assert_eq!(first[8], Scalar::Decimal(dec("3578")));

        let second = &cleaned.rows[1];
        assert_eq!(second[3], Scalar::Null);
        assert_eq!(second[4], Scalar::Null);
        assert_eq!(second[6], Scalar::Decimal(dec("6800")));
        assert_eq!(second[8], Scalar::Decimal(dec("3400")));

        for row in &cleaned.rows {
            match (&row[6], &row[7], &row[8]) {
                (Scalar::Decimal(s), Scalar::Integer(q), Scalar::Decimal(p)) => {
                    assert_eq!(*s, *p * Decimal::from(*q));
                    assert!(!p.is_sign_negative());
                }
                other => panic!("unexpected shape: {other:?}"),
            }
        }
    }

    #[test]
    fn test_precondition_error_carries_row() {
        let columns = TableId::CrmSalesDetails.bronze_columns();
        let mut values = vec![Scalar::Null; columns.len()];
        values[7] = Scalar::Integer(1);
        let snap = Snapshot::new("crm_sales_details", columns).with_rows(vec![values]);
        assert!(matches!(
            SalesRule.apply(&snap),
            Err(CleaningCause::Precondition { row: 0, .. })
        ));
    }
}
