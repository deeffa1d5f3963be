//! # Status Persistence
//!
//! Writes the aggregated status back onto the resource and derives component
//! endpoints.

use crate::constants::*;
use crate::controller::params::{ClusterReader, ResolvedParameters};
use crate::controller::status::PassConditions;
use crate::crd::{
    ComponentDetailStatus, ComponentStatus, DataSciencePipelinesApplication,
    DataSciencePipelinesApplicationStatus,
};
use crate::observability::metrics::{self, InstanceReadiness};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use tracing::{debug, warn};

/// Endpoints for components that are ready; `None` otherwise
pub async fn component_urls(
    params: &ResolvedParameters,
    conditions: &PassConditions,
    reader: &dyn ClusterReader,
) -> ComponentStatus {
    let mut components = ComponentStatus::default();

    if let Some(api) = &params.api_server {
        if conditions.is_ready(API_SERVER_READY) {
            let route_name = format!("{DSP_SERVICE_PREFIX}-{}", params.name);
            components.api_server = Some(ComponentDetailStatus {
                url: Some(format!(
                    "https://{}:{API_SERVER_HTTPS_PORT}",
                    params.api_server_service_dns()
                )),
                external_url: if api.enable_route {
                    route_url(reader, &params.namespace, &route_name).await
                } else {
                    None
                },
            });
        }
    }

    if let Some(mlmd) = &params.mlmd {
        if conditions.is_ready(MLMD_PROXY_READY) {
            let service = format!("{MLMD_PROXY_SERVICE_PREFIX}-{}", params.name);
            components.mlmd_proxy = Some(ComponentDetailStatus {
                url: Some(format!(
                    "https://{service}.{}.svc.cluster.local:{MLMD_ENVOY_HTTPS_PORT}",
                    params.namespace
                )),
                external_url: if mlmd.deploy_envoy_route {
                    route_url(reader, &params.namespace, &service).await
                } else {
                    None
                },
            });
        }
    }

    components
}

/// A missing or unreadable Route leaves the external URL unset
async fn route_url(reader: &dyn ClusterReader, namespace: &str, name: &str) -> Option<String> {
    match reader.get_route_host(namespace, name).await {
        Ok(host) => host.map(|h| format!("https://{h}")),
        Err(e) => {
            warn!("Unable to read Route {}/{}: {}", namespace, name, e);
            None
        }
    }
}

pub fn instance_readiness(status: &DataSciencePipelinesApplicationStatus) -> InstanceReadiness {
    let is_true = |condition_type: &str| {
        status
            .condition(condition_type)
            .is_some_and(|c| c.status == "True")
    };
    InstanceReadiness {
        api_server: is_true(API_SERVER_READY),
        persistence_agent: is_true(PERSISTENCE_AGENT_READY),
        scheduled_workflow: is_true(SCHEDULED_WORKFLOW_READY),
        ready: is_true(CR_READY),
    }
}

/// Persist the status, skipping the write when nothing changed
///
/// The readiness gauges are refreshed either way. Returns whether a write happened.
pub async fn persist_status(
    client: &Client,
    dspa: &DataSciencePipelinesApplication,
    status: &DataSciencePipelinesApplicationStatus,
) -> Result<bool, kube::Error> {
    let namespace = dspa.namespace().unwrap_or_default();
    metrics::set_instance_readiness(&dspa.name_any(), &namespace, instance_readiness(status));

    if dspa.status.as_ref() == Some(status) {
        debug!("Status of {} unchanged, skipping update", dspa.name_any());
        return Ok(false);
    }

    let api: Api<DataSciencePipelinesApplication> = Api::namespaced(client.clone(), &namespace);
    // Explicit nulls so a merge patch clears endpoints that went away
    let patch = serde_json::json!({
        "status": {
            "conditions": status.conditions,
            "components": {
                "apiServer": status.components.api_server,
                "mlmdProxy": status.components.mlmd_proxy,
            },
        }
    });
    api.patch_status(&dspa.name_any(), &PatchParams::default(), &Patch::Merge(patch))
        .await?;
    Ok(true)
}
