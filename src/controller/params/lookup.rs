//! # Cluster Lookups
//!
//! Read-only access to the cluster objects parameter derivation and the reconcilers
//! depend on. The [`ClusterReader`] trait is the seam the tests replace with an
//! in-memory fake.

use crate::crd::DataSciencePipelinesApplication;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams};
use kube::Client;

/// Errors raised while reading cluster state
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("lookup failed: {0}")]
    Other(String),
}

impl LookupError {
    /// Optimistic-concurrency conflicts are retried quickly
    pub fn is_conflict(&self) -> bool {
        matches!(self, LookupError::Kube(kube::Error::Api(e)) if e.code == 409)
    }
}

/// Read-only view of the cluster
///
/// Every getter returns `Ok(None)` when the object does not exist so callers can
/// decide whether absence is an error, a generation trigger or simply skipped.
#[async_trait]
pub trait ClusterReader: Send + Sync {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, LookupError>;

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, LookupError>;

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Deployment>, LookupError>;

    /// Host of an OpenShift Route, `None` when the Route (or the Route API) is absent
    async fn get_route_host(&self, namespace: &str, name: &str)
        -> Result<Option<String>, LookupError>;

    /// All application instances across namespaces
    async fn list_applications(&self) -> Result<Vec<DataSciencePipelinesApplication>, LookupError>;
}

/// Decoded value of a Secret key, preferring `data` over `stringData`
pub fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .and_then(|bytes| String::from_utf8(bytes.0.clone()).ok())
        .or_else(|| {
            secret
                .string_data
                .as_ref()
                .and_then(|data| data.get(key))
                .cloned()
        })
}

/// Value of a ConfigMap key
pub fn config_map_value(config_map: &ConfigMap, key: &str) -> Option<String> {
    config_map
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .cloned()
}

pub(crate) fn route_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk("route.openshift.io", "v1", "Route"))
}

/// [`ClusterReader`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterReader {
    client: Client,
}

impl KubeClusterReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterReader for KubeClusterReader {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, LookupError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, LookupError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Deployment>, LookupError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_route_host(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<String>, LookupError> {
        let resource = route_resource();
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &resource);
        let route = match api.get_opt(name).await {
            Ok(route) => route,
            // Clusters without the Route API answer 404 for the whole resource type
            Err(kube::Error::Api(e)) if e.code == 404 => None,
            Err(e) => return Err(e.into()),
        };
        Ok(route.and_then(|r| {
            r.data
                .get("spec")
                .and_then(|spec| spec.get("host"))
                .and_then(|host| host.as_str())
                .map(str::to_string)
        }))
    }

    async fn list_applications(&self) -> Result<Vec<DataSciencePipelinesApplication>, LookupError> {
        let api: Api<DataSciencePipelinesApplication> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    #[test]
    fn test_secret_value_prefers_data() {
        let secret = Secret {
            data: Some(BTreeMap::from([(
                "password".to_string(),
                ByteString(b"from-data".to_vec()),
            )])),
            string_data: Some(BTreeMap::from([(
                "password".to_string(),
                "from-string-data".to_string(),
            )])),
            ..Default::default()
        };
        assert_eq!(secret_value(&secret, "password").as_deref(), Some("from-data"));
        assert_eq!(secret_value(&secret, "missing"), None);
    }

    #[test]
    fn test_config_map_value() {
        let config_map = ConfigMap {
            data: Some(BTreeMap::from([("ca.crt".to_string(), "PEM".to_string())])),
            ..Default::default()
        };
        assert_eq!(config_map_value(&config_map, "ca.crt").as_deref(), Some("PEM"));
    }
}
