//! # Reconciler
//!
//! Drives `DataSciencePipelinesApplication` resources to their desired state.
//!
//! ## Flow
//!
//! 1. The finalizer is added on first sight and drives teardown on deletion
//! 2. [`run_pass`] derives parameters and invokes the component reconcilers in order:
//!    common, database, object storage, MLMD, API server, persistence agent,
//!    scheduled workflow, workflow controller, UI, webhook
//! 3. The aggregated status is persisted when it changed
//! 4. Ready resources requeue at the resync interval, others at the requeue interval;
//!    failed passes go through the error policy

mod cleanup;
mod pass;
mod reconcile;
pub mod status;
mod types;

pub use cleanup::cleanup;
pub use pass::{run_pass, PassDeps, PassOutcome};
pub use reconcile::reconcile;
pub use types::{BackoffState, BackoffStates, Reconciler, ReconcilerError};
