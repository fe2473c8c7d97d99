use thiserror::Error;

use crate::store::StoreError;

/// Why a cleaning rule could not produce a valid snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CleaningCause {
    #[error("missing expected column '{0}'")]
    MissingColumn(String),

    #[error("column '{column}' value {value:?} cannot be read as {expected}")]
    TypeCoercion {
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error("row {row}: {message}")]
    Precondition { row: usize, message: String },

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("no cleaning rule registered")]
    NoRule,
}

#[derive(Error, Debug)]
#[error("Extraction from bronze.{table} failed: {source}")]
pub struct ExtractionError {
    pub table: String,
    #[source]
    pub source: StoreError,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Cleaning {table} failed: {cause}")]
pub struct CleaningError {
    pub table: String,
    #[source]
    pub cause: CleaningCause,
}

impl CleaningError {
    pub fn new(table: impl Into<String>, cause: CleaningCause) -> Self {
        Self {
            table: table.into(),
            cause,
        }
    }
}

#[derive(Error, Debug)]
#[error("Loading silver.{table} failed: {source}")]
pub struct LoadError {
    pub table: String,
    #[source]
    pub source: StoreError,
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Provisioning step '{step}' failed: {source}")]
    Provisioning {
        step: String,
        #[source]
        source: StoreError,
    },

    #[error("Bulk load of bronze.{table} from {file} failed: {message}")]
    BulkLoad {
        table: String,
        file: String,
        message: String,
    },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Cleaning(#[from] CleaningError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Warehouse error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, EtlError>;
