use std::fs;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::bronze::{BronzeReport, BulkLoader};
use crate::config::Config;
use crate::error::Result;
use crate::provision::{Provisioner, StepReport};
use crate::silver::{Orchestrator, RunReport};
use crate::store::Warehouse;

/// One stage of the warehouse load, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Setup,
    Bronze,
    Silver,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Setup, Stage::Bronze, Stage::Silver];
}

/// Result of an ETL run; a stage that was not requested stays `None`.
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub setup: Option<Vec<StepReport>>,
    pub bronze: Option<BronzeReport>,
    pub silver: Option<RunReport>,
    pub duration_secs: f64,
}

/// Runs the three stages against one warehouse with one configuration.
pub struct Pipeline<'a, W: Warehouse + ?Sized> {
    warehouse: &'a W,
    config: &'a Config,
    processing_date: NaiveDate,
}

impl<'a, W: Warehouse + ?Sized> Pipeline<'a, W> {
    pub fn new(warehouse: &'a W, config: &'a Config, processing_date: NaiveDate) -> Self {
        Self {
            warehouse,
            config,
            processing_date,
        }
    }

    pub fn setup(&self) -> Result<Vec<StepReport>> {
        Provisioner::new(
            self.warehouse,
            &self.config.scripts.dir,
            self.config.provisioning.ignorable.clone(),
        )
        .run()
    }

    pub fn bronze(&self) -> Result<BronzeReport> {
        BulkLoader::new(self.warehouse, &self.config.datasets.dir).load_all()
    }

    pub fn silver(&self) -> Result<RunReport> {
        Orchestrator::new(self.warehouse, self.processing_date).run()
    }

    /// Setup, bronze and silver in sequence; the first failure stops the run.
    pub fn run(&self) -> Result<PipelineReport> {
        self.run_stages(&Stage::ALL)
    }

    /// Run the requested stages in run order, whatever order they are given in.
    pub fn run_stages(&self, stages: &[Stage]) -> Result<PipelineReport> {
        let mut report = PipelineReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            setup: None,
            bronze: None,
            silver: None,
            duration_secs: 0.0,
        };
        let start = Instant::now();

        for stage in Stage::ALL.into_iter().filter(|s| stages.contains(s)) {
            match stage {
                Stage::Setup => report.setup = Some(self.setup()?),
                Stage::Bronze => report.bronze = Some(self.bronze()?),
                Stage::Silver => report.silver = Some(self.silver()?),
            }
        }

        report.duration_secs = start.elapsed().as_secs_f64();
        info!("Total ETL execution time: {:.2} seconds", report.duration_secs);
        info!("ETL process completed successfully");
        Ok(report)
    }
}

/// Write any serializable report as pretty JSON.
pub fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    info!("Report written to {}", path.display());
    Ok(())
}
