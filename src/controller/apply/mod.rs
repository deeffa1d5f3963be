//! # Manifest Apply
//!
//! Renders the resource set behind a [`TemplateRef`] from resolved parameters and
//! applies or deletes it against the cluster API.
//!
//! Rendering is pure and lives in [`templates`]. Writing goes through the
//! [`ManifestApplier`] trait so the reconcilers can be driven against an in-memory
//! recorder in tests. [`KubeApplier`] uses server-side apply with a fixed field
//! manager, which makes repeated applies of the same rendering converge on the same
//! object state.

mod kube_applier;
mod render;
pub mod templates;

pub use kube_applier::KubeApplier;
pub use render::object_key;

use crate::controller::errors::ErrorClass;
use crate::controller::params::ResolvedParameters;
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::DynamicObject;
use std::fmt;

/// Identifies one renderable resource set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateRef {
    CaBundle,
    DatabaseSecret,
    MariaDb,
    ObjectStorageSecret,
    Minio,
    MinioRoute,
    MlmdEnvoy,
    MlmdEnvoyRoute,
    MlmdGrpc,
    MlmdWriter,
    ApiServer,
    ApiServerRoute,
    PersistenceAgent,
    ScheduledWorkflow,
    WorkflowController,
    Ui,
    /// Webhook workload in the operator namespace
    WebhookNamespaced,
    /// Webhook RBAC and admission configurations, applied without an owner
    WebhookClusterScoped,
}

impl TemplateRef {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateRef::CaBundle => "ca-bundle",
            TemplateRef::DatabaseSecret => "database-secret",
            TemplateRef::MariaDb => "mariadb",
            TemplateRef::ObjectStorageSecret => "object-storage-secret",
            TemplateRef::Minio => "minio",
            TemplateRef::MinioRoute => "minio-route",
            TemplateRef::MlmdEnvoy => "mlmd-envoy",
            TemplateRef::MlmdEnvoyRoute => "mlmd-envoy-route",
            TemplateRef::MlmdGrpc => "mlmd-grpc",
            TemplateRef::MlmdWriter => "mlmd-writer",
            TemplateRef::ApiServer => "apiserver",
            TemplateRef::ApiServerRoute => "apiserver-route",
            TemplateRef::PersistenceAgent => "persistence-agent",
            TemplateRef::ScheduledWorkflow => "scheduled-workflow",
            TemplateRef::WorkflowController => "workflow-controller",
            TemplateRef::Ui => "ui",
            TemplateRef::WebhookNamespaced => "webhook",
            TemplateRef::WebhookClusterScoped => "webhook-cluster",
        }
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while rendering or writing manifests
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("failed to render {template}: {reason}")]
    Render {
        template: TemplateRef,
        reason: String,
    },
    #[error("rendered object has no {0}")]
    Incomplete(&'static str),
    #[error("failed to write {kind} {name}: {source}")]
    Kube {
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },
}

impl ApplyError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApplyError::Kube { source: kube::Error::Api(e), .. } if e.code == 409)
    }

    pub fn class(&self) -> ErrorClass {
        if self.is_conflict() {
            ErrorClass::Transient
        } else {
            ErrorClass::Apply
        }
    }
}

/// Writes rendered objects to the cluster
///
/// Implementors only provide the two raw operations; [`apply`](Self::apply) and
/// [`delete`](Self::delete) render a template first.
#[async_trait]
pub trait ManifestApplier: Send + Sync {
    /// Create or update every object, in order
    async fn apply_rendered(&self, objects: &[DynamicObject]) -> Result<(), ApplyError>;

    /// Delete every object, ignoring objects that are already gone
    async fn delete_rendered(&self, objects: &[DynamicObject]) -> Result<(), ApplyError>;

    async fn apply(
        &self,
        owner: Option<&OwnerReference>,
        params: &ResolvedParameters,
        template: TemplateRef,
    ) -> Result<(), ApplyError> {
        let objects = templates::render(template, params, owner)?;
        self.apply_rendered(&objects).await
    }

    async fn delete(
        &self,
        params: &ResolvedParameters,
        template: TemplateRef,
    ) -> Result<(), ApplyError> {
        let objects = templates::render(template, params, None)?;
        self.delete_rendered(&objects).await
    }
}
