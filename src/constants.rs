/// Table and schema name constants to ensure consistency across the codebase
/// These constants define the mapping between warehouse tables and their source files

// Schema names (attached database aliases)
pub const BRONZE_SCHEMA: &str = "bronze";
pub const SILVER_SCHEMA: &str = "silver";

// CRM tables
pub const CRM_CUSTOMER_INFO: &str = "crm_customer_info";
pub const CRM_PRD_INFO: &str = "crm_prd_info";
pub const CRM_SALES_DETAILS: &str = "crm_sales_details";

// ERP tables
pub const ERP_CUST_AZ12: &str = "erp_cust_az12";
pub const ERP_LOC_A101: &str = "erp_loc_a101";
pub const ERP_PX_CAT_G1V2: &str = "erp_px_cat_g1v2";

// Source extract files, relative to datasets/source_<system>/
pub const CRM_CUSTOMER_INFO_FILE: &str = "cust_info.csv";
pub const CRM_PRD_INFO_FILE: &str = "prd_info.csv";
pub const CRM_SALES_DETAILS_FILE: &str = "sales_details.csv";
pub const ERP_CUST_AZ12_FILE: &str = "CUST_AZ12.csv";
pub const ERP_LOC_A101_FILE: &str = "LOC_A101.csv";
pub const ERP_PX_CAT_G1V2_FILE: &str = "PX_CAT_G1V2.csv";

// Canonical values shared by several cleaning rules
pub const NOT_AVAILABLE: &str = "N/A";

// Decimal places kept for costs, prices and sales in the silver layer
pub const MONEY_SCALE: u32 = 4;
