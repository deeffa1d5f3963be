//! # Observability
//!
//! Prometheus metrics and OpenTelemetry tracing.

pub mod metrics;
pub mod otel;
