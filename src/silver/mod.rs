//! Silver layer: bronze snapshots cleaned by per-table rules, checked, and
//! loaded into the silver schema.

pub mod extract;
pub mod load;
pub mod orchestrator;
pub mod quality;
pub mod rules;

pub use extract::Extractor;
pub use load::Loader;
pub use orchestrator::{Orchestrator, PipelineState, RunReport};
pub use quality::{QualityGate, QualityIssue};
pub use rules::{CleaningRule, RuleSet};
