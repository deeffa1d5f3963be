//! # Component Metrics
//!
//! Metrics for component materialization, liveness probes and credential generation.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{Histogram, IntCounterVec};
use std::sync::LazyLock;

static COMPONENT_APPLIES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dspa_controller_component_applies_total",
            "Total number of resource applies by component and outcome",
        ),
        &["component", "outcome"],
    )
    .expect("Failed to create COMPONENT_APPLIES_TOTAL metric - this should never happen")
});

static COMPONENT_DELETES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dspa_controller_component_deletes_total",
            "Total number of resource deletes by component",
        ),
        &["component"],
    )
    .expect("Failed to create COMPONENT_DELETES_TOTAL metric - this should never happen")
});

static PROBES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dspa_controller_probes_total",
            "Total number of liveness probes by backend and result",
        ),
        &["backend", "result"],
    )
    .expect("Failed to create PROBES_TOTAL metric - this should never happen")
});

static PROBE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "dspa_controller_probe_duration_seconds",
            "Duration of liveness probes in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 5.0, 15.0]),
    )
    .expect("Failed to create PROBE_DURATION metric - this should never happen")
});

static CREDENTIALS_GENERATED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "dspa_controller_credentials_generated_total",
            "Total number of generated managed-backend credentials",
        ),
        &["backend"],
    )
    .expect("Failed to create CREDENTIALS_GENERATED_TOTAL metric - this should never happen")
});

/// Register component metrics with the registry
pub(crate) fn register_component_metrics() -> Result<()> {
    REGISTRY.register(Box::new(COMPONENT_APPLIES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(COMPONENT_DELETES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROBES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROBE_DURATION.clone()))?;
    REGISTRY.register(Box::new(CREDENTIALS_GENERATED_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_component_applies(component: &str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    COMPONENT_APPLIES_TOTAL
        .with_label_values(&[component, outcome])
        .inc();
}

pub fn increment_component_deletes(component: &str) {
    COMPONENT_DELETES_TOTAL.with_label_values(&[component]).inc();
}

pub fn record_probe(backend: &str, reachable: bool, duration: f64) {
    let result = if reachable { "reachable" } else { "unreachable" };
    PROBES_TOTAL.with_label_values(&[backend, result]).inc();
    PROBE_DURATION.observe(duration);
}

pub fn increment_credentials_generated(backend: &str) {
    CREDENTIALS_GENERATED_TOTAL
        .with_label_values(&[backend])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_component_applies() {
        let before = COMPONENT_APPLIES_TOTAL
            .with_label_values(&["apiserver", "success"])
            .get();
        increment_component_applies("apiserver", true);
        let after = COMPONENT_APPLIES_TOTAL
            .with_label_values(&["apiserver", "success"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_record_probe() {
        let before = PROBES_TOTAL
            .with_label_values(&["database", "unreachable"])
            .get();
        record_probe("database", false, 0.2);
        let after = PROBES_TOTAL
            .with_label_values(&["database", "unreachable"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_credentials_generated() {
        let before = CREDENTIALS_GENERATED_TOTAL
            .with_label_values(&["object-store"])
            .get();
        increment_credentials_generated("object-store");
        assert_eq!(
            CREDENTIALS_GENERATED_TOTAL
                .with_label_values(&["object-store"])
                .get(),
            before + 1u64
        );
    }
}
