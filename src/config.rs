use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EtlError, Result};
use crate::store::RecoverableCondition;

pub const DEFAULT_CONFIG_PATH: &str = "dwh.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub warehouse: WarehouseConfig,
    pub datasets: DatasetsConfig,
    pub scripts: ScriptsConfig,
    pub logging: LoggingConfig,
    pub provisioning: ProvisioningConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Directory holding one database file per layer
    pub dir: PathBuf,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("warehouse"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetsConfig {
    /// Root containing `source_crm/` and `source_erp/`
    pub dir: PathBuf,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("datasets"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    pub dir: PathBuf,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("scripts/sql"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file: String,
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    pub to_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file: "etl.log".to_string(),
            level: "info".to_string(),
            to_file: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// Store conditions tolerated while running setup scripts
    pub ignorable: Vec<RecoverableCondition>,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            ignorable: vec![RecoverableCondition::DatabaseBusy],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus textfile written at the end of a run
    pub textfile: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `path`, or from `dwh.toml` when no path is given.
    ///
    /// An explicitly named file must exist; a missing default file yields the
    /// defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `DWH_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(dir) = non_empty("DWH_WAREHOUSE_DIR") {
            self.warehouse.dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("DWH_DATASETS_DIR") {
            self.datasets.dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("DWH_SCRIPTS_DIR") {
            self.scripts.dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("DWH_LOG_DIR") {
            self.logging.dir = PathBuf::from(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [warehouse]
            dir = "/tmp/wh"

            [provisioning]
            ignorable = ["database_busy", "database_locked"]
            "#,
        )
        .unwrap();
        assert_eq!(config.warehouse.dir, PathBuf::from("/tmp/wh"));
        assert_eq!(config.datasets.dir, PathBuf::from("datasets"));
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.provisioning.ignorable,
            vec![RecoverableCondition::DatabaseBusy, RecoverableCondition::DatabaseLocked]
        );
        assert!(config.metrics.textfile.is_none());
    }

    #[test]
    fn test_unknown_condition_rejected() {
        let parsed: std::result::Result<Config, _> =
            toml::from_str("[provisioning]\nignorable = [\"is being accessed by other users\"]");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DWH_WAREHOUSE_DIR", "/data/wh"),
            ("DWH_DATASETS_DIR", " "),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.warehouse.dir, PathBuf::from("/data/wh"));
        assert_eq!(config.datasets.dir, PathBuf::from("datasets"));
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let err = Config::load(Some(Path::new("/nonexistent/dwh.toml"))).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }
}
