//! Bronze layer: truncate each raw table and bulk-load it from its CSV
//! extract, CRM group first, timing every table and group.

use std::path::{Path, PathBuf};
use std::time::Instant;

use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use tracing::{error, info, info_span};

use crate::catalog::{Layer, SourceSystem, TableId};
use crate::error::{EtlError, Result};
use crate::metrics::BronzeMetrics;
use crate::snapshot::{Scalar, Snapshot};
use crate::store::Warehouse;

#[derive(Debug, Clone, Serialize)]
pub struct TableLoad {
    pub table: TableId,
    pub file: PathBuf,
    pub rows: usize,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupLoad {
    pub source: SourceSystem,
    pub tables: Vec<TableLoad>,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BronzeReport {
    pub groups: Vec<GroupLoad>,
    pub duration_secs: f64,
}

/// Read a CSV extract into a snapshot with the table's bronze columns.
///
/// Columns are matched by position; the header row only has to have the
/// right width. Empty fields load as null.
pub fn read_extract(path: &Path, table: TableId) -> std::result::Result<Snapshot, String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::None)
        .from_path(path)
        .map_err(|e| format!("Failed to open extract: {}", e))?;

    let columns = table.bronze_columns();
    let headers = reader
        .headers()
        .map_err(|e| format!("Failed to read CSV headers: {}", e))?;
    if headers.len() != columns.len() {
        return Err(format!(
            "header has {} fields, table declares {} columns",
            headers.len(),
            columns.len()
        ));
    }

    let mut snapshot = Snapshot::new(table.name(), columns);
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("Failed to parse CSV row {}: {}", index + 1, e))?;
        let row = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Scalar::Null
                } else {
                    Scalar::text(field)
                }
            })
            .collect();
        snapshot.push_row(row);
    }
    Ok(snapshot)
}

pub struct BulkLoader<'a, W: Warehouse + ?Sized> {
    warehouse: &'a W,
    datasets_dir: PathBuf,
}

impl<'a, W: Warehouse + ?Sized> BulkLoader<'a, W> {
    pub fn new(warehouse: &'a W, datasets_dir: impl Into<PathBuf>) -> Self {
        Self {
            warehouse,
            datasets_dir: datasets_dir.into(),
        }
    }

    pub fn extract_path(&self, table: TableId) -> PathBuf {
        table
            .source()
            .dataset_dir(&self.datasets_dir)
            .join(table.file_name())
    }

    /// Reload the whole bronze layer; stops at the first failing table.
    pub fn load_all(&self) -> Result<BronzeReport> {
        let span = info_span!("bronze");
        let _enter = span.enter();
        info!("Loading bronze layer");

        let start = Instant::now();
        let groups = SourceSystem::all()
            .into_iter()
            .map(|source| self.load_group(source))
            .collect::<Result<Vec<_>>>()?;
        let duration_secs = start.elapsed().as_secs_f64();

        for group in &groups {
            info!("Total {} loading time: {:.2} seconds", group.source, group.duration_secs);
        }
        info!("Total bronze layer loading time: {:.2} seconds", duration_secs);
        BronzeMetrics::record_run(duration_secs);
        Ok(BronzeReport {
            groups,
            duration_secs,
        })
    }

    pub fn load_group(&self, source: SourceSystem) -> Result<GroupLoad> {
        info!("Loading {} tables", source);
        let start = Instant::now();
        let tables = source
            .tables()
            .into_iter()
            .map(|table| self.load_table(table))
            .collect::<Result<Vec<_>>>()?;
        Ok(GroupLoad {
            source,
            tables,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Truncate one bronze table and insert every row of its extract.
    pub fn load_table(&self, table: TableId) -> Result<TableLoad> {
        let file = self.extract_path(table);
        let fail = |message: String| {
            error!(table = %table, "{}", message);
            BronzeMetrics::record_table_error(table.name());
            EtlError::BulkLoad {
                table: table.name().to_string(),
                file: file.display().to_string(),
                message,
            }
        };

        info!("Truncating table: {}", table.qualified(Layer::Bronze));
        self.warehouse
            .truncate(Layer::Bronze, table)
            .map_err(|e| fail(e.to_string()))?;

        let start = Instant::now();
        info!("Inserting data into: {}", table.qualified(Layer::Bronze));
        let snapshot = read_extract(&file, table).map_err(fail)?;
        let rows = self
            .warehouse
            .append(Layer::Bronze, table, &snapshot)
            .map_err(|e| fail(e.to_string()))?;

        let duration_secs = start.elapsed().as_secs_f64();
        BronzeMetrics::record_table_loaded(table.name(), rows, duration_secs);
        info!(rows, "Load duration: {:.2} seconds", duration_secs);
        Ok(TableLoad {
            table,
            file,
            rows,
            duration_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryWarehouse;
    use std::fs;

    fn write_extracts(root: &Path) {
        let crm = root.join("source_crm");
        let erp = root.join("source_erp");
        fs::create_dir_all(&crm).unwrap();
        fs::create_dir_all(&erp).unwrap();
        fs::write(
            crm.join("cust_info.csv"),
            "cst_id,cst_key,cst_firstname,cst_lastname,cst_marital_status,cst_gndr,cst_create_date\n\
             11000,AW00011000, Jon,Yang ,M,M,2025-10-06\n\
             ,AW00011001,,,,,\n",
        )
        .unwrap();
        fs::write(
            crm.join("prd_info.csv"),
            "prd_id,prd_key,prd_nm,prd_cost,prd_line,prd_start_dt,prd_end_dt\n\
             210,CO-RF-FR-R92B-58,HL Road Frame - Black- 58,,R ,2003-07-01,\n",
        )
        .unwrap();
        fs::write(
            crm.join("sales_details.csv"),
            "sls_ord_num,sls_prd_key,sls_cust_id,sls_order_dt,sls_ship_dt,sls_due_dt,sls_sales,sls_quantity,sls_price\n\
             SO43697,BK-R93R-62,21768,20101229,20110105,20110110,3578,1,3578\n",
        )
        .unwrap();
        fs::write(erp.join("CUST_AZ12.csv"), "CID,BDATE,GEN\nNASAW00011000,1971-10-06,Male\n").unwrap();
        fs::write(erp.join("LOC_A101.csv"), "CID,CNTRY\nAW-00011000,Australia\n").unwrap();
        fs::write(
            erp.join("PX_CAT_G1V2.csv"),
            "ID,CAT,SUBCAT,MAINTENANCE\nAC_BR,Accessories,Bike Racks,Yes\n",
        )
        .unwrap();
    }

    #[test]
    fn test_load_all_reports_groups_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_extracts(dir.path());
        let warehouse = InMemoryWarehouse::with_catalog();

        let report = BulkLoader::new(&warehouse, dir.path()).load_all().unwrap();
        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.groups[0].source, SourceSystem::Crm);
        assert_eq!(report.groups[0].tables[0].rows, 2);

        let customers = warehouse.read_table(Layer::Bronze, TableId::CrmCustomerInfo).unwrap();
        assert_eq!(customers.rows[0][2], Scalar::text(" Jon"));
        assert_eq!(customers.rows[1][0], Scalar::Null);
    }

    #[test]
    fn test_reload_replaces_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_extracts(dir.path());
        let warehouse = InMemoryWarehouse::with_catalog();
        let loader = BulkLoader::new(&warehouse, dir.path());

        loader.load_table(TableId::ErpLocA101).unwrap();
        loader.load_table(TableId::ErpLocA101).unwrap();
        assert_eq!(warehouse.read_table(Layer::Bronze, TableId::ErpLocA101).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_extract_is_bulk_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = InMemoryWarehouse::with_catalog();
        let err = BulkLoader::new(&warehouse, dir.path())
            .load_table(TableId::ErpCustAz12)
            .unwrap_err();
        match err {
            EtlError::BulkLoad { table, file, .. } => {
                assert_eq!(table, "erp_cust_az12");
                assert!(file.ends_with("CUST_AZ12.csv"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_header_width_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LOC_A101.csv");
        fs::write(&path, "CID\nAW-1\n").unwrap();
        assert!(read_extract(&path, TableId::ErpLocA101).is_err());
    }

    #[test]
    fn test_ragged_row_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LOC_A101.csv");
        fs::write(&path, "CID,CNTRY\nAW-1,DE,extra\n").unwrap();
        assert!(read_extract(&path, TableId::ErpLocA101).is_err());
    }
}
