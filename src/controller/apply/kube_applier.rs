//! Server-side apply against the Kubernetes API.

use super::{object_key, ApplyError, ManifestApplier};
use crate::constants::FIELD_MANAGER;
use async_trait::async_trait;
use kube::api::{
    Api, ApiResource, DeleteParams, DynamicObject, GroupVersionKind, Patch, PatchParams,
};
use kube::Client;
use tracing::{debug, info};

/// [`ManifestApplier`] that writes through server-side apply
#[derive(Clone)]
pub struct KubeApplier {
    client: Client,
}

impl std::fmt::Debug for KubeApplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeApplier").finish_non_exhaustive()
    }
}

impl KubeApplier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolve the API endpoint for a rendered object from its type metadata
    fn api_for(&self, object: &DynamicObject) -> Result<(Api<DynamicObject>, String), ApplyError> {
        let types = object
            .types
            .as_ref()
            .ok_or(ApplyError::Incomplete("apiVersion/kind"))?;
        let name = object
            .metadata
            .name
            .clone()
            .ok_or(ApplyError::Incomplete("metadata.name"))?;

        let (group, version) = match types.api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", types.api_version.as_str()),
        };
        let resource = ApiResource::from_gvk(&GroupVersionKind::gvk(group, version, &types.kind));

        let api = match object.metadata.namespace.as_deref() {
            Some(namespace) => Api::namespaced_with(self.client.clone(), namespace, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        };
        Ok((api, name))
    }
}

fn kube_error(object: &DynamicObject, name: &str, source: kube::Error) -> ApplyError {
    ApplyError::Kube {
        kind: object
            .types
            .as_ref()
            .map(|t| t.kind.clone())
            .unwrap_or_default(),
        name: name.to_string(),
        source,
    }
}

#[async_trait]
impl ManifestApplier for KubeApplier {
    async fn apply_rendered(&self, objects: &[DynamicObject]) -> Result<(), ApplyError> {
        let params = PatchParams::apply(FIELD_MANAGER).force();
        for object in objects {
            let (api, name) = self.api_for(object)?;
            api.patch(&name, &params, &Patch::Apply(object))
                .await
                .map_err(|e| kube_error(object, &name, e))?;
            debug!("Applied {}", object_key(object));
        }
        Ok(())
    }

    async fn delete_rendered(&self, objects: &[DynamicObject]) -> Result<(), ApplyError> {
        for object in objects {
            let (api, name) = self.api_for(object)?;
            match api.delete(&name, &DeleteParams::default()).await {
                Ok(_) => info!("Deleted {}", object_key(object)),
                Err(kube::Error::Api(e)) if e.code == 404 => {
                    debug!("{} already absent", object_key(object));
                }
                Err(e) => return Err(kube_error(object, &name, e)),
            }
        }
        Ok(())
    }
}
