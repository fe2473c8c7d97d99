use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::tempdir;

use dwh_etl::catalog::{Layer, TableId};
use dwh_etl::config::Config;
use dwh_etl::digest::digest_layer;
use dwh_etl::error::EtlError;
use dwh_etl::pipeline::{write_report, Pipeline, Stage};
use dwh_etl::silver::QualityGate;
use dwh_etl::snapshot::{Scalar, Snapshot};
use dwh_etl::store::{SqliteWarehouse, Warehouse};

fn processing_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

fn test_config(warehouse_dir: &Path) -> Config {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let mut config = Config::default();
    config.warehouse.dir = warehouse_dir.to_path_buf();
    config.datasets.dir = root.join("datasets");
    config.scripts.dir = root.join("scripts").join("sql");
    config.logging.to_file = false;
    config
}

/// Row of `snapshot` whose `column` holds `value`.
fn find<'a>(snapshot: &'a Snapshot, column: &str, value: &Scalar) -> &'a [Scalar] {
    let idx = snapshot.column_index(column).unwrap();
    snapshot
        .rows
        .iter()
        .find(|row| &row[idx] == value)
        .unwrap_or_else(|| panic!("no row with {column} = {value}"))
}

fn value<'a>(snapshot: &Snapshot, row: &'a [Scalar], column: &str) -> &'a Scalar {
    &row[snapshot.column_index(column).unwrap()]
}

fn dec(s: &str) -> Scalar {
    Scalar::Decimal(Decimal::from_str(s).unwrap())
}

#[test]
fn test_full_run_is_idempotent() -> Result<()> {
    let dir = tempdir()?;
    let config = test_config(&dir.path().join("warehouse"));
    let warehouse = SqliteWarehouse::open(&config.warehouse.dir)?;
    let pipeline = Pipeline::new(&warehouse, &config, processing_date());

    let report = pipeline.run()?;
    assert_eq!(report.setup.as_ref().map(|s| s.len()), Some(4));
    let silver = report.silver.as_ref().unwrap();
    let customers = silver
        .tables()
        .find(|t| t.table == TableId::CrmCustomerInfo)
        .unwrap();
    assert_eq!((customers.rows_in, customers.rows_out), (11, 8));

    let first = digest_layer(&warehouse, Layer::Silver)?;

    // Silver alone over unchanged bronze
    pipeline.silver()?;
    assert_eq!(digest_layer(&warehouse, Layer::Silver)?, first);

    // Everything again, from a fresh setup
    pipeline.run()?;
    assert_eq!(digest_layer(&warehouse, Layer::Silver)?.sha256, first.sha256);

    let report_path = dir.path().join("reports").join("run.json");
    write_report(&report_path, &report)?;
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report_path)?)?;
    assert_eq!(json["silver"]["groups"][0]["source"], "crm");
    Ok(())
}

#[test]
fn test_loaded_silver_satisfies_invariants() -> Result<()> {
    let dir = tempdir()?;
    let config = test_config(dir.path());
    let warehouse = SqliteWarehouse::open(&config.warehouse.dir)?;
    Pipeline::new(&warehouse, &config, processing_date()).run()?;

    let gate = QualityGate::new(processing_date());
    for table in TableId::all() {
        let snapshot = warehouse.read_table(Layer::Silver, table)?;
        assert!(!snapshot.is_empty(), "{table} is empty");
        let issues = gate.assess(table, &snapshot);
        assert!(issues.is_empty(), "{table}: {issues:?}");
    }
    Ok(())
}

#[test]
fn test_cleaned_values_after_round_trip() -> Result<()> {
    let dir = tempdir()?;
    let config = test_config(dir.path());
    let warehouse = SqliteWarehouse::open(&config.warehouse.dir)?;
    Pipeline::new(&warehouse, &config, processing_date()).run()?;

    // Latest of three records for the same customer wins
    let customers = warehouse.read_table(Layer::Silver, TableId::CrmCustomerInfo)?;
    let lance = find(&customers, "cst_id", &Scalar::Integer(29466));
    assert_eq!(value(&customers, lance, "cst_create_date"), &Scalar::text("2026-01-27"));
    assert_eq!(value(&customers, lance, "cst_gnder"), &Scalar::text("N/A"));
    let ruben = find(&customers, "cst_id", &Scalar::Integer(11002));
    assert_eq!(value(&customers, ruben, "cst_firstname"), &Scalar::text("Ruben"));

    // Product keys, end dates and imputed cost
    let products = warehouse.read_table(Layer::Silver, TableId::CrmPrdInfo)?;
    let helmet = find(&products, "prd_id", &Scalar::Integer(212));
    assert_eq!(value(&products, helmet, "cat_id"), &Scalar::text("AC_HE"));
    assert_eq!(value(&products, helmet, "prd_key"), &Scalar::text("HL-U509-R"));
    assert_eq!(value(&products, helmet, "prd_end_dt"), &Scalar::text("2012-06-30"));
    let last_helmet = find(&products, "prd_id", &Scalar::Integer(214));
    assert_eq!(value(&products, last_helmet, "prd_end_dt"), &Scalar::Null);
    let frame = find(&products, "prd_id", &Scalar::Integer(210));
    assert_eq!(value(&products, frame, "prd_cost"), &dec("552.5"));
    assert_eq!(value(&products, frame, "prd_line"), &Scalar::text("Road"));

    // Derived price keeps sales == quantity * price exact
    let sales = warehouse.read_table(Layer::Silver, TableId::CrmSalesDetails)?;
    let order = find(&sales, "sls_ord_num", &Scalar::text("SO43702"));
    assert_eq!(value(&sales, order, "sls_price"), &dec("33.3333"));
    assert_eq!(value(&sales, order, "sls_sales"), &dec("99.9999"));
    let negative = find(&sales, "sls_ord_num", &Scalar::text("SO43699"));
    assert_eq!(value(&sales, negative, "sls_order_dt"), &Scalar::Null);
    assert_eq!(value(&sales, negative, "sls_price"), &dec("3399.99"));

    let erp_customers = warehouse.read_table(Layer::Silver, TableId::ErpCustAz12)?;
    let future = find(&erp_customers, "cid", &Scalar::text("AW00011004"));
    assert_eq!(value(&erp_customers, future, "bdate"), &Scalar::Null);
    assert_eq!(value(&erp_customers, future, "gen"), &Scalar::text("N/A"));

    let locations = warehouse.read_table(Layer::Silver, TableId::ErpLocA101)?;
    let uk = find(&locations, "cid", &Scalar::text("AW00029449"));
    assert_eq!(value(&locations, uk, "cntry"), &Scalar::text("United Kingdom"));
    Ok(())
}

#[test]
fn test_missing_extracts_fail_the_bronze_stage() -> Result<()> {
    let dir = tempdir()?;
    let mut config = test_config(&dir.path().join("warehouse"));
    config.datasets.dir = dir.path().join("no-datasets");
    let warehouse = SqliteWarehouse::open(&config.warehouse.dir)?;

    match Pipeline::new(&warehouse, &config, processing_date()).run() {
        Err(EtlError::BulkLoad { table, .. }) => assert_eq!(table, "crm_customer_info"),
        other => panic!("expected a bulk load failure, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_silver_before_setup_is_extraction_error() -> Result<()> {
    let dir = tempdir()?;
    let config = test_config(dir.path());
    let warehouse = SqliteWarehouse::open(&config.warehouse.dir)?;

    let err = Pipeline::new(&warehouse, &config, processing_date())
        .silver()
        .unwrap_err();
    assert!(matches!(err, EtlError::Extraction(_)));
    Ok(())
}

#[test]
fn test_single_stage_report_leaves_other_stages_empty() -> Result<()> {
    let dir = tempdir()?;
    let config = test_config(dir.path());
    let warehouse = SqliteWarehouse::open(&config.warehouse.dir)?;
    let pipeline = Pipeline::new(&warehouse, &config, processing_date());

    let setup = pipeline.run_stages(&[Stage::Setup])?;
    assert_eq!(setup.setup.as_ref().map(|s| s.len()), Some(4));
    assert!(setup.bronze.is_none() && setup.silver.is_none());

    // Requested out of order, still run bronze before silver
    let loads = pipeline.run_stages(&[Stage::Silver, Stage::Bronze])?;
    assert!(loads.setup.is_none());
    assert!(loads.bronze.is_some());
    assert!(loads.silver.is_some());

    let report_path = dir.path().join("setup.json");
    write_report(&report_path, &setup)?;
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report_path)?)?;
    assert!(json["bronze"].is_null());
    assert!(json["setup"].is_array());
    Ok(())
}
