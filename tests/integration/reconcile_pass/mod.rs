//! Reconciliation pass scenarios:
//! - Idempotency and transition-time stability across passes
//! - Backend selection and credential handling
//! - Version gating and configuration errors
//! - Readiness aggregation from Deployment state
//! - Webhook dependency on the operator Deployment
//! - Teardown of cluster-scoped objects

pub mod fakes;

mod backends;
mod cleanup;
mod idempotency;
mod readiness;
mod rendering;
mod version_gating;
mod webhook;
