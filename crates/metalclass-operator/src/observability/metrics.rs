//! Prometheus Metrics
//!
//! Metrics tracked:
//! - `metalclass_reconcile_total` - counter of reconciles by outcome
//! - `metalclass_reconcile_duration_seconds` - histogram of reconcile times
//! - `metalclass_status_patches_total` - counter of status writes issued
//! - `metalclass_fanout_requests_total` - counter of class reconciles requested by machine changes
//! - `metalclass_fanout_failures_total` - counter of machine changes dropped because classes could not be listed
//! - `metalclass_class_machines` - gauge of matching machines per class and state

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Without a recorder every `record_*` call below is a no-op.
pub fn init_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    register_metric_descriptions();

    tracing::info!(%addr, "Prometheus metrics endpoint listening");
    Ok(())
}

fn register_metric_descriptions() {
    describe_counter!(
        "metalclass_reconcile_total",
        "Total number of class reconciles by outcome"
    );
    describe_histogram!(
        "metalclass_reconcile_duration_seconds",
        "Duration of class reconciles in seconds"
    );
    describe_counter!(
        "metalclass_status_patches_total",
        "Total number of class status writes issued"
    );
    describe_counter!(
        "metalclass_fanout_requests_total",
        "Total number of class reconciles requested by machine changes"
    );
    describe_counter!(
        "metalclass_fanout_failures_total",
        "Machine changes that requested no reconciles because listing classes failed"
    );
    describe_gauge!(
        "metalclass_class_machines",
        "Number of machines matching a class by state"
    );
}

/// Record a finished reconcile.
pub fn record_reconcile(outcome: &'static str, duration: Duration) {
    counter!("metalclass_reconcile_total", "outcome" => outcome).increment(1);
    histogram!("metalclass_reconcile_duration_seconds").record(duration.as_secs_f64());
}

/// Record a status write against the store.
pub fn record_status_patch() {
    counter!("metalclass_status_patches_total").increment(1);
}

/// Record the reconciles requested for one machine change.
pub fn record_fanout(requests: usize) {
    counter!("metalclass_fanout_requests_total").increment(requests as u64);
}

/// Record a machine change that could not be fanned out.
pub fn record_fanout_failure() {
    counter!("metalclass_fanout_failures_total").increment(1);
}

/// Publish the current size of a class's lists.
pub fn set_class_machines(class: &str, available: usize, in_use: usize) {
    gauge!("metalclass_class_machines", "class" => class.to_string(), "state" => "available")
        .set(available as f64);
    gauge!("metalclass_class_machines", "class" => class.to_string(), "state" => "in_use")
        .set(in_use as f64);
}

/// Zero a deleted class's gauges so the exporter stops reporting stale counts.
pub fn clear_class_machines(class: &str) {
    set_class_machines(class, 0, 0);
}
