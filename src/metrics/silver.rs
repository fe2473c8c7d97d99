//! Silver load phase metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct SilverMetrics;

impl SilverMetrics {
    pub fn record_extraction(duration_secs: f64) {
        ::metrics::histogram!(phase_metric!(histogram, "silver", "extraction_duration_seconds"))
            .record(duration_secs);
    }

    /// Record a table cleaned and loaded
    pub fn record_table_loaded(table: &str, rows_in: usize, rows_out: usize, duration_secs: f64) {
        let table = table.to_string();
        ::metrics::counter!(phase_metric!(counter, "silver", "rows_in"), "table" => table.clone())
            .increment(rows_in as u64);
        ::metrics::counter!(phase_metric!(counter, "silver", "rows_out"), "table" => table.clone())
            .increment(rows_out as u64);
        ::metrics::histogram!(phase_metric!(histogram, "silver", "table_duration_seconds"), "table" => table)
            .record(duration_secs);
    }

    /// Record a failed stage; `stage` is one of extract, truncate, clean, load
    /// (quality gate failures count as clean)
    pub fn record_failure(stage: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "silver", "failures"), "stage" => stage).increment(1);
    }

    pub fn record_run(duration_secs: f64) {
        ::metrics::histogram!(phase_metric!(histogram, "silver", "run_duration_seconds"))
            .record(duration_secs);
    }
}

impl PhaseMetrics for SilverMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "silver", "rows_in"));
        let _ = counter!(phase_metric!(counter, "silver", "rows_out"));
        let _ = counter!(phase_metric!(counter, "silver", "failures"));
        let _ = histogram!(phase_metric!(histogram, "silver", "extraction_duration_seconds"));
        let _ = histogram!(phase_metric!(histogram, "silver", "table_duration_seconds"));
        let _ = histogram!(phase_metric!(histogram, "silver", "run_duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "silver"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "silver", "rows_in"),
                metric_type: MetricType::Counter,
                help: "Bronze rows handed to cleaning rules",
                labels: vec!["table"],
            },
            MetricDoc {
                name: phase_metric!(counter, "silver", "rows_out"),
                metric_type: MetricType::Counter,
                help: "Cleaned rows appended to silver tables",
                labels: vec!["table"],
            },
            MetricDoc {
                name: phase_metric!(counter, "silver", "failures"),
                metric_type: MetricType::Counter,
                help: "Silver runs aborted, by stage",
                labels: vec!["stage"],
            },
            MetricDoc {
                name: phase_metric!(histogram, "silver", "extraction_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time to snapshot every bronze table",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "silver", "table_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time to clean, check and load one silver table",
                labels: vec!["table"],
            },
            MetricDoc {
                name: phase_metric!(histogram, "silver", "run_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time for a whole silver run",
                labels: vec![],
            },
        ]
    }
}
