//! Metrics for the warehouse pipeline
//!
//! Each pipeline phase defines its own metrics in a dedicated submodule. The
//! recorder is process-global; since runs are short-lived batch jobs, the
//! rendered Prometheus text is written to a textfile at the end of a run
//! instead of being scraped over HTTP.

pub mod bronze;
pub mod provisioning;
pub mod registry;
pub mod silver;

pub use bronze::BronzeMetrics;
pub use provisioning::ProvisioningMetrics;
pub use silver::SilverMetrics;

use std::fs;
use std::path::Path;
use std::sync::{Once, OnceLock};

use tracing::{info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder and register every phase's metrics.
///
/// Idempotent. Without a call to this, the `metrics` macros are no-ops.
pub fn init_metrics() {
    INIT.call_once(|| {
        match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                if HANDLE.set(handle).is_err() {
                    warn!("Prometheus handle was already set");
                }
                registry::register_all_metrics();
                info!("Prometheus recorder installed");
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
            }
        }
    });
}

/// Render current metrics in Prometheus text format, if a recorder is installed.
pub fn render() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

/// Write the rendered metrics to `path` (node-exporter textfile style).
///
/// Does nothing when no recorder was installed.
pub fn write_textfile(path: &Path) -> std::io::Result<bool> {
    let Some(text) = render() else {
        return Ok(false);
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    // Write then rename so a collector never reads a half-written file.
    let tmp = path.with_extension("prom.tmp");
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)?;
    info!("Metrics written to {}", path.display());
    Ok(true)
}

/// Trait for phase-specific metrics collections
pub trait PhaseMetrics {
    /// Pre-register all metrics for this phase so they render before first use
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

/// Documentation for a single metric
#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
    pub labels: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// Builds metric names following `dwh_{phase}_{metric_name}[_total]`.
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("dwh_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("dwh_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("dwh_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;
