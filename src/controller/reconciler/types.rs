//! Reconciler context and error types.

use crate::config::SharedControllerConfig;
use crate::controller::apply::{ApplyError, ManifestApplier};
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::components::{self, ComponentError, ComponentReconciler};
use crate::controller::errors::ErrorClass;
use crate::controller::params::{ClusterReader, ParamsError};
use crate::controller::probes::Probes;
use kube_runtime::finalizer;
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Per-resource backoff state, owned by the error policy
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(base_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(base_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.backoff.reset();
        self.error_count = 0;
    }
}

/// Backoff state of every resource currently failing, keyed by `namespace/name`
#[derive(Debug, Default)]
pub struct BackoffStates {
    states: Mutex<HashMap<String, BackoffState>>,
}

impl BackoffStates {
    /// Record one more error and return the next interval with the error count
    ///
    /// `None` when the map is poisoned.
    pub fn next(&self, resource_key: &str, base_secs: u64, max_secs: u64) -> Option<(u64, u32)> {
        let mut states = self.states.lock().ok()?;
        let state = states
            .entry(resource_key.to_string())
            .or_insert_with(|| BackoffState::new(base_secs, max_secs));
        state.increment_error();
        Some((state.backoff.next_backoff_seconds(), state.error_count))
    }

    /// Forget the error streak of a resource after a clean pass
    pub fn reset(&self, resource_key: &str) {
        if let Ok(mut states) = self.states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }

    /// Drop a deleted resource
    pub fn remove(&self, resource_key: &str) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(resource_key);
        }
    }

    pub fn contains(&self, resource_key: &str) -> bool {
        self.states
            .lock()
            .is_ok_and(|states| states.contains_key(resource_key))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcilerError {
    #[error(transparent)]
    Params(#[from] ParamsError),
    #[error(transparent)]
    Component(#[from] ComponentError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error("failed to persist status: {0}")]
    Status(#[source] kube::Error),
    #[error("finalizer failed: {0}")]
    Finalizer(#[source] Box<finalizer::Error<ReconcilerError>>),
}

impl ReconcilerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ReconcilerError::Params(e) => e.class(),
            ReconcilerError::Component(e) => e.class(),
            ReconcilerError::Apply(e) => e.class(),
            ReconcilerError::Status(_) => ErrorClass::Transient,
            ReconcilerError::Finalizer(e) => match e.as_ref() {
                finalizer::Error::ApplyFailed(inner) | finalizer::Error::CleanupFailed(inner) => {
                    inner.class()
                }
                _ => ErrorClass::Transient,
            },
        }
    }

    /// Optimistic-concurrency conflict on a cluster write
    pub fn is_conflict(&self) -> bool {
        let kube_conflict = |e: &kube::Error| matches!(e, kube::Error::Api(r) if r.code == 409);
        match self {
            ReconcilerError::Params(ParamsError::Lookup(e)) => e.is_conflict(),
            ReconcilerError::Component(ComponentError::Apply(e)) | ReconcilerError::Apply(e) => {
                e.is_conflict()
            }
            ReconcilerError::Component(ComponentError::Lookup(e)) => e.is_conflict(),
            ReconcilerError::Status(e) => kube_conflict(e),
            ReconcilerError::Finalizer(e) => match e.as_ref() {
                finalizer::Error::ApplyFailed(inner) | finalizer::Error::CleanupFailed(inner) => {
                    inner.is_conflict()
                }
                finalizer::Error::AddFinalizer(e) | finalizer::Error::RemoveFinalizer(e) => {
                    kube_conflict(e)
                }
                _ => false,
            },
            _ => false,
        }
    }
}

/// Shared state for every reconciliation
pub struct Reconciler {
    pub client: Client,
    pub reader: Arc<dyn ClusterReader>,
    pub applier: Arc<dyn ManifestApplier>,
    pub probes: Probes,
    pub config: SharedControllerConfig,
    pub components: Vec<Box<dyn ComponentReconciler>>,
    pub backoff_states: BackoffStates,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("components", &self.components.len())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        client: Client,
        reader: Arc<dyn ClusterReader>,
        applier: Arc<dyn ManifestApplier>,
        probes: Probes,
        config: SharedControllerConfig,
    ) -> Self {
        Self {
            client,
            reader,
            applier,
            probes,
            config,
            components: components::registry(),
            backoff_states: BackoffStates::default(),
        }
    }

    pub fn reset_backoff(&self, resource_key: &str) {
        self.backoff_states.reset(resource_key);
    }

    pub fn forget_backoff(&self, resource_key: &str) {
        self.backoff_states.remove(resource_key);
    }
}
