//! Pipelines Application Controller Library
//!
//! Core functionality for the controller that reconciles `DataSciencePipelinesApplication`
//! resources. Tests are included in the module files and under `tests/`.

// Re-export modules so they can be tested
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod runtime;

// Re-export CRD types for convenience
pub use crd::*;
