//! Warehouse provisioning: drop and recreate every table by running the SQL
//! scripts under the scripts directory in a fixed order.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{EtlError, Result};
use crate::metrics::ProvisioningMetrics;
use crate::store::{RecoverableCondition, StoreError, Warehouse};

/// One provisioning script, relative to the scripts directory.
#[derive(Debug, Clone, Copy)]
pub struct ProvisioningStep {
    pub description: &'static str,
    pub script: &'static str,
}

pub const STEPS: [ProvisioningStep; 4] = [
    ProvisioningStep {
        description: "Setting up the database",
        script: "drop_and_create.sql",
    },
    ProvisioningStep {
        description: "Instantiating database schemas",
        script: "set_up_datawarehouse.sql",
    },
    ProvisioningStep {
        description: "Instantiating bronze layer tables",
        script: "bronze/ddl_bronze.sql",
    },
    ProvisioningStep {
        description: "Instantiating silver layer tables",
        script: "silver/ddl_silver.sql",
    },
];

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub description: String,
    pub script: PathBuf,
    pub duration_secs: f64,
    /// Set when the step failed with a tolerated condition
    pub ignored: Option<RecoverableCondition>,
}

pub struct Provisioner<'a, W: Warehouse + ?Sized> {
    warehouse: &'a W,
    scripts_dir: PathBuf,
    ignorable: Vec<RecoverableCondition>,
}

impl<'a, W: Warehouse + ?Sized> Provisioner<'a, W> {
    pub fn new(warehouse: &'a W, scripts_dir: impl Into<PathBuf>, ignorable: Vec<RecoverableCondition>) -> Self {
        Self {
            warehouse,
            scripts_dir: scripts_dir.into(),
            ignorable,
        }
    }

    /// Run every step in order, stopping at the first failure that is not allowlisted.
    pub fn run(&self) -> Result<Vec<StepReport>> {
        STEPS.iter().map(|step| self.run_step(step)).collect()
    }

    fn run_step(&self, step: &ProvisioningStep) -> Result<StepReport> {
        let path = self.scripts_dir.join(step.script);
        info!("Starting: {}", step.description);
        let start = Instant::now();

        let outcome = read_script(&path).and_then(|sql| self.warehouse.execute_script(&sql));
        let duration_secs = start.elapsed().as_secs_f64();
        ProvisioningMetrics::record_step(duration_secs);

        let ignored = match outcome {
            Ok(()) => None,
            Err(e) => match e.condition().filter(|c| self.ignorable.contains(c)) {
                Some(condition) => {
                    warn!(?condition, "Ignoring error during '{}': {}", step.description, e);
                    ProvisioningMetrics::record_ignored(&format!("{condition:?}"));
                    Some(condition)
                }
                None => {
                    error!("An error occurred while executing {}: {}", step.description, e);
                    return Err(EtlError::Provisioning {
                        step: step.description.to_string(),
                        source: e,
                    });
                }
            },
        };

        info!("SUCCESS: {} ({:.3}s)", step.description, duration_secs);
        Ok(StepReport {
            description: step.description.to_string(),
            script: path,
            duration_secs,
            ignored,
        })
    }
}

fn read_script(path: &Path) -> std::result::Result<String, StoreError> {
    Ok(fs::read_to_string(path)?)
}
