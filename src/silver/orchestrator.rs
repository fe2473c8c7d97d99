//! Silver run sequencing.
//!
//! One run extracts every bronze table, truncates every silver table, then
//! cleans, checks and loads each table in catalog order (CRM group first).
//! The first failure stops the run; nothing is retried or rolled back, so
//! tables loaded before the failure keep their new contents.

use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, info_span};
use uuid::Uuid;

use super::extract::Extractor;
use super::load::Loader;
use super::quality::QualityGate;
use super::rules::RuleSet;
use crate::catalog::{SourceSystem, TableId};
use crate::error::{EtlError, ExtractionError};
use crate::metrics::SilverMetrics;
use crate::store::{StoreError, Warehouse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "table", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Extracting,
    Truncating,
    Transforming(TableId),
    Loading(TableId),
    Done,
    Failed,
}

impl PipelineState {
    fn stage(&self) -> &'static str {
        match self {
            PipelineState::Extracting => "extract",
            PipelineState::Truncating => "truncate",
            PipelineState::Transforming(_) => "clean",
            PipelineState::Loading(_) => "load",
            PipelineState::Idle | PipelineState::Done | PipelineState::Failed => "none",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub table: TableId,
    pub rows_in: usize,
    pub rows_out: usize,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub source: SourceSystem,
    pub tables: Vec<TableReport>,
    pub duration_secs: f64,
}

/// Outcome of one completed silver run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub processing_date: NaiveDate,
    pub extraction_secs: f64,
    pub groups: Vec<GroupReport>,
    pub duration_secs: f64,
}

impl RunReport {
    pub fn tables(&self) -> impl Iterator<Item = &TableReport> {
        self.groups.iter().flat_map(|g| g.tables.iter())
    }
}

pub struct Orchestrator<'a, W: Warehouse + ?Sized> {
    warehouse: &'a W,
    rules: RuleSet,
    gate: QualityGate,
    processing_date: NaiveDate,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl<'a, W: Warehouse + ?Sized> Orchestrator<'a, W> {
    pub fn new(warehouse: &'a W, processing_date: NaiveDate) -> Self {
        Self::with_rules(warehouse, RuleSet::new(processing_date), processing_date)
    }

    pub fn with_rules(warehouse: &'a W, rules: RuleSet, processing_date: NaiveDate) -> Self {
        Self {
            warehouse,
            rules,
            gate: QualityGate::new(processing_date),
            processing_date,
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    fn transition(&mut self, next: PipelineState) {
        self.state = next;
        self.history.push(next);
    }

    pub fn run(&mut self) -> Result<RunReport, EtlError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("silver", run_id = %run_id);
        let _enter = span.enter();

        match self.execute(run_id) {
            Ok(report) => {
                self.transition(PipelineState::Done);
                SilverMetrics::record_run(report.duration_secs);
                info!("Silver layer loaded in {:.3}s", report.duration_secs);
                Ok(report)
            }
            Err(e) => {
                let stage = self.state.stage();
                SilverMetrics::record_failure(stage);
                error!(stage, "Silver run failed: {}", e);
                self.transition(PipelineState::Failed);
                Err(e)
            }
        }
    }

    fn execute(&mut self, run_id: Uuid) -> Result<RunReport, EtlError> {
        let started_at = Utc::now();
        let start = Instant::now();
        let tables = TableId::all();

        self.transition(PipelineState::Extracting);
        let extraction_start = Instant::now();
        let mut snapshots = Extractor::new(self.warehouse).extract(&tables)?;
        let extraction_secs = extraction_start.elapsed().as_secs_f64();

        self.transition(PipelineState::Truncating);
        let loader = Loader::new(self.warehouse);
        for &table in &tables {
            loader.truncate(table)?;
        }

        let mut groups = Vec::new();
        for source in SourceSystem::all() {
            let group_start = Instant::now();
            info!("Loading {} tables", source);
            let mut reports = Vec::new();

            for table in source.tables() {
                let table_start = Instant::now();
                let bronze = snapshots.remove(&table).ok_or_else(|| ExtractionError {
                    table: table.name().to_string(),
                    source: StoreError::UnknownTable(table.name().to_string()),
                })?;

                self.transition(PipelineState::Transforming(table));
                let cleaned = self.rules.clean(table, &bronze)?;
                self.gate.enforce(table, &cleaned)?;

                self.transition(PipelineState::Loading(table));
                let rows_out = loader.append(table, &cleaned)?;

                let duration_secs = table_start.elapsed().as_secs_f64();
                SilverMetrics::record_table_loaded(table.name(), bronze.len(), rows_out, duration_secs);
                info!(
                    table = %table,
                    rows_in = bronze.len(),
                    rows_out,
                    "Loaded silver table in {:.3}s",
                    duration_secs
                );
                reports.push(TableReport {
                    table,
                    rows_in: bronze.len(),
                    rows_out,
                    duration_secs,
                });
            }

            let duration_secs = group_start.elapsed().as_secs_f64();
            info!("Loaded {} tables in {:.3}s", source, duration_secs);
            groups.push(GroupReport {
                source,
                tables: reports,
                duration_secs,
            });
        }

        Ok(RunReport {
            run_id,
            started_at,
            processing_date: self.processing_date,
            extraction_secs,
            groups,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }
}
