//! Registration of every phase's metrics, with conflict detection.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::metrics::{MetricDoc, PhaseMetrics};

pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<super::ProvisioningMetrics>(&mut all_metrics);
    register_phase_metrics::<super::BronzeMetrics>(&mut all_metrics);
    register_phase_metrics::<super::SilverMetrics>(&mut all_metrics);

    info!("Registered {} metrics across all phases", all_metrics.len());
}

fn register_phase_metrics<T: PhaseMetrics>(all_metrics: &mut HashMap<&'static str, MetricDoc>) {
    T::register_metrics();
    let phase_name = T::phase_name();

    for doc in T::metrics_documentation() {
        if extract_phase_from_metric_name(doc.name) != phase_name {
            warn!("Metric '{}' does not carry its phase prefix '{}'", doc.name, phase_name);
        }
        if all_metrics.contains_key(doc.name) {
            warn!("Metric name conflict: '{}' registered twice (phase '{}')", doc.name, phase_name);
        } else {
            debug!("  - {} ({:?}): {}", doc.name, doc.metric_type, doc.help);
            all_metrics.insert(doc.name, doc);
        }
    }
}

/// Phase name from a metric name (e.g. "dwh_bronze_rows_loaded_total" -> "bronze")
fn extract_phase_from_metric_name(metric_name: &str) -> &str {
    if let Some(stripped) = metric_name.strip_prefix("dwh_") {
        if let Some(next_underscore) = stripped.find('_') {
            return &stripped[..next_underscore];
        }
    }
    "unknown"
}
