//! # Metrics Module
//!
//! Prometheus metrics for monitoring the controller, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup and registration
//! - `controller_metrics` - Reconciliation passes, errors, requeues and status writes
//! - `component_metrics` - Component applies, liveness probes and generated credentials

pub mod component_metrics;
pub mod controller_metrics;
pub mod registry;

pub use component_metrics::*;
pub use controller_metrics::*;
pub use registry::*;
