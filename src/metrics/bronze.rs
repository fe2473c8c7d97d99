//! Bronze load phase metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct BronzeMetrics;

impl BronzeMetrics {
    /// Record a table bulk-loaded from its extract
    pub fn record_table_loaded(table: &str, rows: usize, duration_secs: f64) {
        let table = table.to_string();
        ::metrics::counter!(phase_metric!(counter, "bronze", "rows_loaded"), "table" => table.clone())
            .increment(rows as u64);
        ::metrics::histogram!(phase_metric!(histogram, "bronze", "table_duration_seconds"), "table" => table)
            .record(duration_secs);
    }

    pub fn record_table_error(table: &str) {
        ::metrics::counter!(phase_metric!(counter, "bronze", "table_errors"), "table" => table.to_string())
            .increment(1);
    }

    pub fn record_run(duration_secs: f64) {
        ::metrics::histogram!(phase_metric!(histogram, "bronze", "run_duration_seconds"))
            .record(duration_secs);
    }
}

impl PhaseMetrics for BronzeMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "bronze", "rows_loaded"));
        let _ = counter!(phase_metric!(counter, "bronze", "table_errors"));
        let _ = histogram!(phase_metric!(histogram, "bronze", "table_duration_seconds"));
        let _ = histogram!(phase_metric!(histogram, "bronze", "run_duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "bronze"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "bronze", "rows_loaded"),
                metric_type: MetricType::Counter,
                help: "Rows bulk-loaded into bronze tables",
                labels: vec!["table"],
            },
            MetricDoc {
                name: phase_metric!(counter, "bronze", "table_errors"),
                metric_type: MetricType::Counter,
                help: "Bronze table loads that failed",
                labels: vec!["table"],
            },
            MetricDoc {
                name: phase_metric!(histogram, "bronze", "table_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time to truncate and reload one bronze table",
                labels: vec!["table"],
            },
            MetricDoc {
                name: phase_metric!(histogram, "bronze", "run_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time to reload the whole bronze layer",
                labels: vec![],
            },
        ]
    }
}
