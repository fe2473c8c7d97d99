//! The fixed table catalog: which tables exist, which source system they come
//! from, where their extracts live, and their column layouts in each layer.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Source system a table is extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSystem {
    Crm,
    Erp,
}

impl SourceSystem {
    pub fn all() -> [SourceSystem; 2] {
        [SourceSystem::Crm, SourceSystem::Erp]
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceSystem::Crm => "CRM",
            SourceSystem::Erp => "ERP",
        }
    }

    /// Directory holding this system's CSV extracts under the datasets root.
    pub fn dataset_dir(&self, datasets_root: &Path) -> PathBuf {
        match self {
            SourceSystem::Crm => datasets_root.join("source_crm"),
            SourceSystem::Erp => datasets_root.join("source_erp"),
        }
    }

    pub fn tables(&self) -> Vec<TableId> {
        TableId::all()
            .into_iter()
            .filter(|t| t.source() == *self)
            .collect()
    }
}

impl fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Warehouse layer, addressed as a schema-qualified prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Bronze,
    Silver,
}

impl Layer {
    pub fn schema(&self) -> &'static str {
        match self {
            Layer::Bronze => BRONZE_SCHEMA,
            Layer::Silver => SILVER_SCHEMA,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableId {
    CrmCustomerInfo,
    CrmPrdInfo,
    CrmSalesDetails,
    ErpCustAz12,
    ErpLocA101,
    ErpPxCatG1v2,
}

impl TableId {
    /// Every table in declared processing order: CRM group first, then ERP.
    pub fn all() -> Vec<TableId> {
        vec![
            TableId::CrmCustomerInfo,
            TableId::CrmPrdInfo,
            TableId::CrmSalesDetails,
            TableId::ErpCustAz12,
            TableId::ErpLocA101,
            TableId::ErpPxCatG1v2,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            TableId::CrmCustomerInfo => CRM_CUSTOMER_INFO,
            TableId::CrmPrdInfo => CRM_PRD_INFO,
            TableId::CrmSalesDetails => CRM_SALES_DETAILS,
            TableId::ErpCustAz12 => ERP_CUST_AZ12,
            TableId::ErpLocA101 => ERP_LOC_A101,
            TableId::ErpPxCatG1v2 => ERP_PX_CAT_G1V2,
        }
    }

    pub fn source(&self) -> SourceSystem {
        match self {
            TableId::CrmCustomerInfo | TableId::CrmPrdInfo | TableId::CrmSalesDetails => {
                SourceSystem::Crm
            }
            TableId::ErpCustAz12 | TableId::ErpLocA101 | TableId::ErpPxCatG1v2 => {
                SourceSystem::Erp
            }
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            TableId::CrmCustomerInfo => CRM_CUSTOMER_INFO_FILE,
            TableId::CrmPrdInfo => CRM_PRD_INFO_FILE,
            TableId::CrmSalesDetails => CRM_SALES_DETAILS_FILE,
            TableId::ErpCustAz12 => ERP_CUST_AZ12_FILE,
            TableId::ErpLocA101 => ERP_LOC_A101_FILE,
            TableId::ErpPxCatG1v2 => ERP_PX_CAT_G1V2_FILE,
        }
    }

    pub fn qualified(&self, layer: Layer) -> String {
        format!("{}.{}", layer.schema(), self.name())
    }

    pub fn bronze_columns(&self) -> &'static [&'static str] {
        match self {
            TableId::CrmCustomerInfo => &[
                "cst_id",
                "cst_key",
                "cst_firstname",
                "cst_lastname",
                "cst_material_status",
                "cst_gnder",
                "cst_create_date",
            ],
            TableId::CrmPrdInfo => &[
                "prd_id",
                "prd_key",
                "prd_nm",
                "prd_cost",
                "prd_line",
                "prd_start_dt",
                "prd_end_dt",
            ],
            TableId::CrmSalesDetails => &[
                "sls_ord_num",
                "sls_prd_key",
                "sls_cust_id",
                "sls_order_dt",
                "sls_ship_dt",
                "sls_due_dt",
                "sls_sales",
                "sls_quantity",
                "sls_price",
            ],
            TableId::ErpCustAz12 => &["cid", "bdate", "gen"],
            TableId::ErpLocA101 => &["cid", "cntry"],
            TableId::ErpPxCatG1v2 => &["id", "cat", "subcat", "maintenance"],
        }
    }

    pub fn silver_columns(&self) -> &'static [&'static str] {
        match self {
            TableId::CrmPrdInfo => &[
                "prd_id",
                "cat_id",
                "prd_key",
                "prd_nm",
                "prd_cost",
                "prd_line",
                "prd_start_dt",
                "prd_end_dt",
            ],
            other => other.bronze_columns(),
        }
    }

    pub fn columns(&self, layer: Layer) -> &'static [&'static str] {
        match layer {
            Layer::Bronze => self.bronze_columns(),
            Layer::Silver => self.silver_columns(),
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TableId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableId::all()
            .into_iter()
            .find(|t| t.name() == s.trim())
            .ok_or_else(|| format!("unknown table '{s}'"))
    }
}
