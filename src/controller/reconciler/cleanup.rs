//! Teardown on resource deletion.
//!
//! Objects in the instance's namespace carry an owner reference and are garbage
//! collected. The webhook is shared by every instance that stores pipelines as
//! Kubernetes objects, so it is only removed when the last such instance goes: first
//! the admission configurations and RBAC, then the workload in the operator namespace.

use super::ReconcilerError;
use crate::config::ControllerConfig;
use crate::constants::PIPELINE_STORE_KUBERNETES;
use crate::controller::apply::{templates, ManifestApplier};
use crate::controller::params::{ClusterReader, ParamsError};
use crate::crd::DataSciencePipelinesApplication;
use kube::ResourceExt;
use tracing::info;

/// Same rule as defaulting: any other spelling is rejected there and never deploys
/// the webhook.
fn uses_kubernetes_store(dspa: &DataSciencePipelinesApplication) -> bool {
    dspa.spec
        .api_server
        .as_ref()
        .and_then(|a| a.pipeline_store.as_deref())
        == Some(PIPELINE_STORE_KUBERNETES)
}

/// Remove resources that garbage collection cannot reach
///
/// Returns whether the shared webhook objects were deleted.
pub async fn cleanup(
    dspa: &DataSciencePipelinesApplication,
    reader: &dyn ClusterReader,
    applier: &dyn ManifestApplier,
    config: &ControllerConfig,
) -> Result<bool, ReconcilerError> {
    let name = dspa.name_any();
    let namespace = dspa.namespace().unwrap_or_default();

    let others_need_webhook = reader
        .list_applications()
        .await
        .map_err(ParamsError::from)?
        .iter()
        .filter(|other| {
            !(other.name_any() == name && other.namespace().as_ref() == Some(&namespace))
        })
        .any(uses_kubernetes_store);

    if others_need_webhook {
        info!("Keeping webhook, other instances still use the kubernetes pipeline store");
        return Ok(false);
    }

    let operator_namespace = config.operator_namespace.as_str();
    info!(
        "Removing webhook from {} after deletion of {}/{}",
        operator_namespace, namespace, name
    );
    let cluster_scoped = templates::webhook_cluster_objects(operator_namespace)?;
    applier.delete_rendered(&cluster_scoped).await?;
    let namespaced =
        templates::webhook_namespaced_objects(operator_namespace, &config.images.webhook, None)?;
    applier.delete_rendered(&namespaced).await?;
    Ok(true)
}
