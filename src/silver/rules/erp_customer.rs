use chrono::NaiveDate;

use super::CleaningRule;
use crate::catalog::TableId;
use crate::constants::NOT_AVAILABLE;
use crate::error::CleaningCause;
use crate::snapshot::{Scalar, Snapshot};

/// Prefix some ERP customer ids carry in front of the CRM customer key.
pub const LEGACY_ID_PREFIX: &str = "NAS";

/// Strip the legacy prefix (and surrounding whitespace) from a customer id.
pub fn normalize_customer_id(cid: &str) -> String {
    match cid.strip_prefix(LEGACY_ID_PREFIX) {
        Some(rest) => rest.trim().to_string(),
        None => cid.to_string(),
    }
}

/// Birthdates on or after the processing date are impossible and become null.
pub fn plausible_birthdate(bdate: Option<NaiveDate>, processing_date: NaiveDate) -> Option<NaiveDate> {
    bdate.filter(|d| *d < processing_date)
}

/// `F`/`M` codes become `Female`/`Male`, blank becomes `N/A`, any other
/// value is kept as written (trimmed).
pub fn canonical_gender(gen: Option<&str>) -> String {
    let trimmed = gen.map(str::trim).unwrap_or_default();
    match trimmed.to_uppercase().as_str() {
        "F" => "Female".to_string(),
        "M" => "Male".to_string(),
        "" => NOT_AVAILABLE.to_string(),
        _ => trimmed.to_string(),
    }
}

/// Cleaning rule for `erp_cust_az12`
pub struct ErpCustomerRule {
    processing_date: NaiveDate,
}

impl ErpCustomerRule {
    pub fn new(processing_date: NaiveDate) -> Self {
        Self { processing_date }
    }
}

impl CleaningRule for ErpCustomerRule {
    fn table(&self) -> TableId {
        TableId::ErpCustAz12
    }

    fn apply(&self, snapshot: &Snapshot) -> Result<Snapshot, CleaningCause> {
        let table = self.table();
        let columns = snapshot.require_columns(table.bronze_columns())?;
        let rows = snapshot
            .row_views(&columns)
            .map(|row| {
                let cid = row.text("cid")?.map(|c| normalize_customer_id(&c));
                let bdate = plausible_birthdate(row.date("bdate")?, self.processing_date);
                let gen = canonical_gender(row.text("gen")?.as_deref());
                Ok(vec![Scalar::from(cid), Scalar::from(bdate), Scalar::Text(gen)])
            })
            .collect::<Result<Vec<_>, CleaningCause>>()?;
        Ok(Snapshot::new(table.name(), table.silver_columns()).with_rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn test_customer_id_prefix() {
        assert_eq!(normalize_customer_id("NASAW00011000"), "AW00011000");
        assert_eq!(normalize_customer_id("NAS AW00011000 "), "AW00011000");
        assert_eq!(normalize_customer_id("AW00011000"), "AW00011000");
        assert_eq!(normalize_customer_id(" AW1 "), " AW1 ");
    }

    #[test]
    fn test_birthdate_must_be_strictly_past() {
        let past = NaiveDate::from_ymd_opt(1971, 10, 6);
        assert_eq!(plausible_birthdate(past, today()), past);
        assert_eq!(plausible_birthdate(Some(today()), today()), None);
        assert_eq!(plausible_birthdate(NaiveDate::from_ymd_opt(2090, 1, 1), today()), None);
        assert_eq!(plausible_birthdate(None, today()), None);
    }

    #[test]
    fn test_gender_canonicalization() {
        assert_eq!(canonical_gender(Some(" f ")), "Female");
        assert_eq!(canonical_gender(Some("M")), "Male");
        assert_eq!(canonical_gender(Some("  ")), "N/A");
        assert_eq!(canonical_gender(None), "N/A");
        assert_eq!(canonical_gender(Some(" Female ")), "Female");
        assert_eq!(canonical_gender(Some("other")), "other");
    }

    #[test]
    fn test_rule_over_snapshot() {
        let snap = Snapshot::new("erp_cust_az12", TableId::ErpCustAz12.bronze_columns()).with_rows(vec![
            vec![Scalar::text("NASAW00011000"), Scalar::text("1971-10-06"), Scalar::text("M")],
            vec![Scalar::text("AW00011001"), Scalar::text("2099-01-01"), Scalar::Null],
        ]);
        let cleaned = ErpCustomerRule::new(today()).apply(&snap).unwrap();
        assert_eq!(
            cleaned.rows[0],
            vec![
                Scalar::text("AW00011000"),
                Scalar::Date(NaiveDate::from_ymd_opt(1971, 10, 6).unwrap()),
                Scalar::text("Male"),
            ]
        );
        assert_eq!(
            cleaned.rows[1],
            vec![Scalar::text("AW00011001"), Scalar::Null, Scalar::text("N/A")]
        );
    }
}
