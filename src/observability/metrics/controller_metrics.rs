//! # Controller Metrics
//!
//! Metrics for reconciliation passes, requeues, status persistence and the
//! per-instance readiness gauges.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGaugeVec};
use std::sync::LazyLock;

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "dspa_controller_reconciliations_total",
        "Total number of reconciliation passes",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dspa_controller_reconciliation_errors_total",
            "Total number of reconciliation errors by error class",
        ),
        &["class"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "dspa_controller_reconciliation_duration_seconds",
            "Duration of a reconciliation pass in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dspa_controller_requeues_total",
            "Total number of reconciliation requeues",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static STATUS_UPDATES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dspa_controller_status_updates_total",
            "Total number of status writes by overall Ready value",
        ),
        &["ready"],
    )
    .expect("Failed to create STATUS_UPDATES_TOTAL metric - this should never happen")
});

fn readiness_gauge(name: &str, help: &str) -> IntGaugeVec {
    IntGaugeVec::new(prometheus::Opts::new(name, help), &["dspa_name", "dspa_namespace"])
        .expect("Failed to create readiness gauge - this should never happen")
}

static APISERVER_READY: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    readiness_gauge(
        "data_science_pipelines_application_apiserver_ready",
        "Whether the API server of an instance is ready (1) or not (0)",
    )
});

static PERSISTENCEAGENT_READY: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    readiness_gauge(
        "data_science_pipelines_application_persistenceagent_ready",
        "Whether the persistence agent of an instance is ready (1) or not (0)",
    )
});

static SCHEDULEDWORKFLOW_READY: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    readiness_gauge(
        "data_science_pipelines_application_scheduledworkflow_ready",
        "Whether the scheduled workflow controller of an instance is ready (1) or not (0)",
    )
});

static INSTANCE_READY: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    readiness_gauge(
        "data_science_pipelines_application_ready",
        "Whether an instance is ready (1) or not (0)",
    )
});

/// Readiness of one instance as exported by the readiness gauges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceReadiness {
    pub api_server: bool,
    pub persistence_agent: bool,
    pub scheduled_workflow: bool,
    pub ready: bool,
}

/// Register controller metrics with the registry
pub(crate) fn register_controller_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STATUS_UPDATES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(APISERVER_READY.clone()))?;
    REGISTRY.register(Box::new(PERSISTENCEAGENT_READY.clone()))?;
    REGISTRY.register(Box::new(SCHEDULEDWORKFLOW_READY.clone()))?;
    REGISTRY.register(Box::new(INSTANCE_READY.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors(class: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[class]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_status_updates(ready: &str) {
    STATUS_UPDATES_TOTAL.with_label_values(&[ready]).inc();
}

pub fn set_instance_readiness(name: &str, namespace: &str, readiness: InstanceReadiness) {
    let labels = [name, namespace];
    let value = |ready: bool| i64::from(ready);
    APISERVER_READY
        .with_label_values(&labels)
        .set(value(readiness.api_server));
    PERSISTENCEAGENT_READY
        .with_label_values(&labels)
        .set(value(readiness.persistence_agent));
    SCHEDULEDWORKFLOW_READY
        .with_label_values(&labels)
        .set(value(readiness.scheduled_workflow));
    INSTANCE_READY
        .with_label_values(&labels)
        .set(value(readiness.ready));
}

/// Drop the readiness series of a deleted instance
pub fn remove_instance_readiness(name: &str, namespace: &str) {
    let labels = [name, namespace];
    for gauge in [
        &*APISERVER_READY,
        &*PERSISTENCEAGENT_READY,
        &*SCHEDULEDWORKFLOW_READY,
        &*INSTANCE_READY,
    ] {
        // Missing series are fine, the instance may never have reported
        let _ = gauge.remove_label_values(&labels);
    }
}
