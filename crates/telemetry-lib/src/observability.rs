//! Observability infrastructure for the telemetry pipeline
//!
//! Provides:
//! - Prometheus metrics (per-table collection latency, rows, failures,
//!   synthetic records generated)
//! - Structured logging of pipeline events with tracing

use crate::error::CollectionError;
use crate::models::TableName;
use crate::status::RunStatus;
use crate::synthetic::SyntheticSummary;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for collector latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<CollectorMetricsInner> = OnceLock::new();

struct CollectorMetricsInner {
    collection_latency_seconds: HistogramVec,
    rows_collected: IntCounterVec,
    source_failures: IntCounterVec,
    item_failures: IntCounterVec,
    synthetic_records: IntCounter,
}

impl CollectorMetricsInner {
    fn new() -> Self {
        Self {
            collection_latency_seconds: register_histogram_vec!(
                "cloud_telemetry_collection_latency_seconds",
                "Time spent collecting one bundle table",
                &["table"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register collection_latency_seconds"),

            rows_collected: register_int_counter_vec!(
                "cloud_telemetry_rows_collected_total",
                "Rows collected per bundle table",
                &["table"]
            )
            .expect("Failed to register rows_collected"),

            source_failures: register_int_counter_vec!(
                "cloud_telemetry_source_failures_total",
                "Collector runs that failed as a whole",
                &["table"]
            )
            .expect("Failed to register source_failures"),

            item_failures: register_int_counter_vec!(
                "cloud_telemetry_item_failures_total",
                "Items skipped or degraded inside a collector run",
                &["table"]
            )
            .expect("Failed to register item_failures"),

            synthetic_records: register_int_counter!(
                "cloud_telemetry_synthetic_records_total",
                "Synthetic records generated"
            )
            .expect("Failed to register synthetic_records"),
        }
    }
}

/// Pipeline metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct CollectorMetrics {
    _private: (),
}

impl Default for CollectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectorMetrics {
    /// Create a handle, registering the global metrics on first use
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(CollectorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &CollectorMetricsInner {
        GLOBAL_METRICS.get_or_init(CollectorMetricsInner::new)
    }

    pub fn observe_collection_latency(&self, table: TableName, duration_secs: f64) {
        self.inner()
            .collection_latency_seconds
            .with_label_values(&[table.as_str()])
            .observe(duration_secs);
    }

    pub fn add_rows_collected(&self, table: TableName, rows: usize) {
        self.inner()
            .rows_collected
            .with_label_values(&[table.as_str()])
            .inc_by(rows as u64);
    }

    pub fn inc_source_failures(&self, table: TableName) {
        self.inner()
            .source_failures
            .with_label_values(&[table.as_str()])
            .inc();
    }

    pub fn add_item_failures(&self, table: TableName, count: usize) {
        self.inner()
            .item_failures
            .with_label_values(&[table.as_str()])
            .inc_by(count as u64);
    }

    pub fn add_synthetic_records(&self, count: usize) {
        self.inner().synthetic_records.inc_by(count as u64);
    }

    /// Render every registered metric in the text exposition format
    pub fn encode_text(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Structured logger for pipeline events
///
/// Emits one event per significant step, tagged with the provider region.
#[derive(Clone)]
pub struct CollectionLogger {
    region: String,
}

impl CollectionLogger {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    pub fn log_run_started(&self, days_back: u32) {
        info!(
            event = "collection_started",
            region = %self.region,
            days_back = days_back,
            "Starting collection run"
        );
    }

    pub fn log_table_collected(&self, table: TableName, rows: usize, item_failures: usize, elapsed_ms: u128) {
        info!(
            event = "table_collected",
            region = %self.region,
            table = %table,
            rows = rows,
            item_failures = item_failures,
            elapsed_ms = elapsed_ms,
            "Collected table"
        );
    }

    pub fn log_source_unavailable(&self, table: TableName, error: &CollectionError) {
        warn!(
            event = "source_unavailable",
            region = %self.region,
            table = %table,
            error = %error,
            "Source unavailable, table left empty"
        );
    }

    pub fn log_item_failed(&self, error: &CollectionError) {
        warn!(
            event = "item_failed",
            region = %self.region,
            error = %error,
            "Item-scoped collection failure"
        );
    }

    pub fn log_not_implemented(&self, table: TableName) {
        info!(
            event = "source_not_implemented",
            region = %self.region,
            table = %table,
            "No collector for table, left empty"
        );
    }

    pub fn log_run_finished(&self, status: RunStatus) {
        match status {
            RunStatus::Complete => info!(
                event = "collection_finished",
                region = %self.region,
                status = %status,
                "Collection run finished"
            ),
            _ => warn!(
                event = "collection_finished",
                region = %self.region,
                status = %status,
                "Collection run finished with unavailable sources"
            ),
        }
    }

    pub fn log_table_written(&self, table: &str, path: &Path, rows: usize) {
        info!(
            event = "table_written",
            region = %self.region,
            table = %table,
            path = %path.display(),
            rows = rows,
            "Wrote table"
        );
    }

    pub fn log_synthetic_summary(&self, summary: &SyntheticSummary) {
        info!(
            event = "synthetic_generated",
            records = summary.records,
            resources = summary.resources,
            days = summary.days,
            total_cost = summary.total_cost,
            idle = summary.idle,
            underutilized = summary.underutilized,
            optimized = summary.optimized,
            overutilized = summary.overutilized,
            regions = summary.regions,
            environments = summary.environments,
            "Generated synthetic records"
        );
    }
}
