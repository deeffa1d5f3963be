//! # Component Reconcilers
//!
//! One reconciler per managed workload, invoked in a fixed order by the orchestrator.
//!
//! Each reconciler decides whether its component is deployed, applies its templates
//! and reports one readiness condition (the shared `common` step reports none). A
//! component that is switched off reports `NotApplicable` and its existing objects
//! are left alone.
//!
//! Adding a component means adding a type here and an entry in [`registry`]; the
//! orchestrator's control flow does not change.

mod apiserver;
mod common;
mod database;
mod mlmd;
mod persistence_agent;
pub mod readiness;
mod scheduled_workflow;
mod storage;
mod ui;
mod webhook;
mod workflow_controller;

pub use apiserver::ApiServerReconciler;
pub use common::CommonReconciler;
pub use database::DatabaseReconciler;
pub use mlmd::MlmdReconciler;
pub use persistence_agent::PersistenceAgentReconciler;
pub use scheduled_workflow::ScheduledWorkflowReconciler;
pub use storage::ObjectStorageReconciler;
pub use ui::UiReconciler;
pub use webhook::WebhookReconciler;
pub use workflow_controller::WorkflowControllerReconciler;

use crate::config::ControllerConfig;
use crate::controller::apply::{ApplyError, ManifestApplier, TemplateRef};
use crate::controller::errors::ErrorClass;
use crate::controller::params::{ClusterReader, LookupError, ResolvedParameters};
use crate::controller::probes::Probes;
use crate::controller::status::ComponentCondition;
use crate::observability;
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

/// Errors that abort the remaining steps of a pass
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("{kind} \"{name}\" not found in namespace \"{namespace}\"")]
    MissingDependency {
        kind: &'static str,
        name: String,
        namespace: String,
    },
}

impl ComponentError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ComponentError::Apply(e) => e.class(),
            ComponentError::Lookup(_) => ErrorClass::Transient,
            ComponentError::MissingDependency { .. } => ErrorClass::MissingDependency,
        }
    }
}

/// Everything a component reconciler may read or call during one pass
#[derive(Clone, Copy)]
pub struct PassContext<'a> {
    pub params: &'a ResolvedParameters,
    /// Owner reference to the application instance, when owner references are enabled
    pub owner: Option<&'a OwnerReference>,
    pub reader: &'a dyn ClusterReader,
    pub applier: &'a dyn ManifestApplier,
    pub probes: &'a Probes,
    pub config: &'a ControllerConfig,
}

impl std::fmt::Debug for PassContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassContext")
            .field("name", &self.params.name)
            .field("namespace", &self.params.namespace)
            .finish_non_exhaustive()
    }
}

impl PassContext<'_> {
    /// Apply a template owned by the application instance
    pub async fn apply(&self, template: TemplateRef) -> Result<(), ApplyError> {
        let result = self.applier.apply(self.owner, self.params, template).await;
        observability::metrics::increment_component_applies(template.as_str(), result.is_ok());
        result
    }

    /// Remove a template's objects, used when an optional part is switched off
    pub async fn delete(&self, template: TemplateRef) -> Result<(), ApplyError> {
        self.applier.delete(self.params, template).await?;
        observability::metrics::increment_component_deletes(template.as_str());
        Ok(())
    }
}

/// One step of a reconciliation pass
#[async_trait]
pub trait ComponentReconciler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Materialize the component and report its condition
    ///
    /// Must converge to the same cluster state when called repeatedly with the same
    /// parameters.
    async fn reconcile(
        &self,
        ctx: &PassContext<'_>,
    ) -> Result<Option<ComponentCondition>, ComponentError>;
}

/// All component reconcilers in execution order
pub fn registry() -> Vec<Box<dyn ComponentReconciler>> {
    vec![
        Box::new(CommonReconciler),
        Box::new(DatabaseReconciler),
        Box::new(ObjectStorageReconciler),
        Box::new(MlmdReconciler),
        Box::new(ApiServerReconciler),
        Box::new(PersistenceAgentReconciler),
        Box::new(ScheduledWorkflowReconciler),
        Box::new(WorkflowControllerReconciler),
        Box::new(UiReconciler),
        Box::new(WebhookReconciler),
    ]
}
