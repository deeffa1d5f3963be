//! # Controller
//!
//! Reconciliation machinery for `DataSciencePipelinesApplication` resources.

pub mod apply;
pub mod backoff;
pub mod components;
pub mod errors;
pub mod params;
pub mod probes;
pub mod reconciler;
pub mod server;
pub mod status;
