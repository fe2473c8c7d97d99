//! Provisioning phase metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct ProvisioningMetrics;

impl ProvisioningMetrics {
    pub fn record_step(duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "provisioning", "steps")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "provisioning", "step_duration_seconds"))
            .record(duration_secs);
    }

    /// Record a step failure that was tolerated by configuration
    pub fn record_ignored(condition: &str) {
        ::metrics::counter!(phase_metric!(counter, "provisioning", "ignored_errors"), "condition" => condition.to_string())
            .increment(1);
    }
}

impl PhaseMetrics for ProvisioningMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "provisioning", "steps"));
        let _ = counter!(phase_metric!(counter, "provisioning", "ignored_errors"));
        let _ = histogram!(phase_metric!(histogram, "provisioning", "step_duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "provisioning"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "provisioning", "steps"),
                metric_type: MetricType::Counter,
                help: "Provisioning scripts executed",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "provisioning", "ignored_errors"),
                metric_type: MetricType::Counter,
                help: "Provisioning failures tolerated by configuration",
                labels: vec!["condition"],
            },
            MetricDoc {
                name: phase_metric!(histogram, "provisioning", "step_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Duration of one provisioning script",
                labels: vec![],
            },
        ]
    }
}
