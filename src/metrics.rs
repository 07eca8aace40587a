// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for pdnsync.
//!
//! All metric names carry the `pdnsync_` prefix.
//!
//! # Metrics Categories
//!
//! - **Task Metrics** - Per-address updates and zone syncs, their outcome and duration
//! - **Record Metrics** - rrset operations sent to PowerDNS
//! - **Error Metrics** - Task failures by reason code
//! - **Scheduler Metrics** - Jobs waiting for their scheduled time
//!
//! # Example
//!
//! ```rust,no_run
//! use pdnsync::metrics::record_task_finished;
//!
//! record_task_finished("sync_zone", "completed", std::time::Duration::from_secs(1));
//! ```

use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all pdnsync metrics
const METRICS_NAMESPACE: &str = "pdnsync";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Task Metrics
// ============================================================================

/// Total number of finished tasks by kind and final status
///
/// Labels:
/// - `task`: `update_address` or `sync_zone`
/// - `status`: `completed` or `errored`
pub static TASKS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_tasks_total"),
        "Total number of finished tasks by kind and status",
    );
    let counter = CounterVec::new(opts, &["task", "status"]).expect("metric definition is valid");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registers once");
    counter
});

/// Duration of tasks in seconds
///
/// Labels:
/// - `task`: `update_address` or `sync_zone`
pub static TASK_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_task_duration_seconds"),
        "Duration of tasks in seconds by kind",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram =
        HistogramVec::new(opts, &["task"]).expect("metric definition is valid");
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("metric registers once");
    histogram
});

// ============================================================================
// Record Metrics
// ============================================================================

/// Total number of rrset operations sent to PowerDNS
///
/// Labels:
/// - `action`: `CREATE` or `DELETE`
/// - `record_type`: `A`, `AAAA` or `PTR`
pub static RECORD_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_record_operations_total"),
        "Total number of rrset operations by action and record type",
    );
    let counter =
        CounterVec::new(opts, &["action", "record_type"]).expect("metric definition is valid");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registers once");
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of task errors by kind and reason code
///
/// Labels:
/// - `task`: `update_address` or `sync_zone`
/// - `reason`: stable reason code (e.g. `NoZoneFound`, `PowerDnsUnreachable`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of task errors by kind and reason",
    );
    let counter = CounterVec::new(opts, &["task", "reason"]).expect("metric definition is valid");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registers once");
    counter
});

// ============================================================================
// Scheduler Metrics
// ============================================================================

/// Number of jobs waiting for their scheduled time
pub static SCHEDULED_JOBS: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_scheduled_jobs"),
        "Number of jobs waiting for their scheduled time",
    )
    .expect("metric definition is valid");
    METRICS_REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("metric registers once");
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a finished task
///
/// # Arguments
/// * `task` - Task kind label
/// * `status` - Final job status label
/// * `duration` - Time from start to termination
pub fn record_task_finished(task: &str, status: &str, duration: Duration) {
    TASKS_TOTAL.with_label_values(&[task, status]).inc();
    TASK_DURATION_SECONDS
        .with_label_values(&[task])
        .observe(duration.as_secs_f64());
}

/// Record an rrset operation sent to one server
pub fn record_operation(action: &str, record_type: &str) {
    RECORD_OPERATIONS_TOTAL
        .with_label_values(&[action, record_type])
        .inc();
}

/// Record a task error
///
/// # Arguments
/// * `task` - Task kind label
/// * `reason` - Reason code, see `SyncError::status_reason`
pub fn record_error(task: &str, reason: &str) {
    ERRORS_TOTAL.with_label_values(&[task, reason]).inc();
}

/// A job started waiting for its scheduled time
pub fn record_job_scheduled() {
    SCHEDULED_JOBS.inc();
}

/// A scheduled job became due or was cancelled
pub fn record_job_unscheduled() {
    SCHEDULED_JOBS.dec();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
