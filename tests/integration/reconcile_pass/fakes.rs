//! In-memory cluster shared by the reconciliation pass tests.
//!
//! [`FakeCluster`] is both the [`ClusterReader`] and the [`ManifestApplier`]: objects
//! applied during a pass become visible to later reads, so generated credentials and
//! rendered ConfigMaps round-trip the way they do against a real API server.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentCondition, DeploymentStatus};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::ByteString;
use kube::api::{DynamicObject, ObjectMeta};
use pipelines_application_controller::config::{ComponentImages, ControllerConfig};
use pipelines_application_controller::controller::apply::{object_key, ApplyError, ManifestApplier};
use pipelines_application_controller::controller::components::registry;
use pipelines_application_controller::controller::params::{ClusterReader, LookupError};
use pipelines_application_controller::controller::probes::Probes;
use pipelines_application_controller::controller::reconciler::{run_pass, PassDeps, PassOutcome};
use pipelines_application_controller::crd::{
    DataSciencePipelinesApplication, DataSciencePipelinesApplicationSpec, Minio, Mlmd,
    ObjectStorage,
};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

pub const NAMESPACE: &str = "team-a";
pub const NAME: &str = "sample";
pub const OPERATOR_NAMESPACE: &str = "dsp-operator";

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

#[derive(Debug, Default)]
struct State {
    secrets: BTreeMap<Key, Secret>,
    config_maps: BTreeMap<Key, ConfigMap>,
    deployments: BTreeMap<Key, Deployment>,
    available: BTreeSet<Key>,
    route_hosts: BTreeMap<Key, String>,
    applications: Vec<DataSciencePipelinesApplication>,
    applied: BTreeMap<String, DynamicObject>,
    deleted: Vec<String>,
    apply_calls: usize,
}

#[derive(Debug, Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, namespace: &str, name: &str, data: &[(&str, &str)]) -> Self {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            data: Some(
                data.iter()
                    .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                    .collect(),
            ),
            ..Default::default()
        };
        self.state.lock().unwrap().secrets.insert(key(namespace, name), secret);
        self
    }

    pub fn with_config_map(self, namespace: &str, name: &str, data: &[(&str, &str)]) -> Self {
        let config_map = ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            data: Some(
                data.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        };
        self.state
            .lock()
            .unwrap()
            .config_maps
            .insert(key(namespace, name), config_map);
        self
    }

    /// Seed a Deployment that exists outside of what the pass applies
    pub fn with_deployment(self, namespace: &str, name: &str, uid: Option<&str>) -> Self {
        let deployment = Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                uid: uid.map(str::to_string),
                ..Default::default()
            },
            ..Default::default()
        };
        self.state
            .lock()
            .unwrap()
            .deployments
            .insert(key(namespace, name), deployment);
        self
    }

    pub fn with_route_host(self, namespace: &str, name: &str, host: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .route_hosts
            .insert(key(namespace, name), host.to_string());
        self
    }

    pub fn with_application(self, dspa: DataSciencePipelinesApplication) -> Self {
        self.state.lock().unwrap().applications.push(dspa);
        self
    }

    /// Report the named Deployment as `Available=True` from now on
    pub fn mark_available(&self, namespace: &str, name: &str) {
        self.state.lock().unwrap().available.insert(key(namespace, name));
    }

    /// Mark every applied Deployment and every seeded one as available
    pub fn mark_all_available(&self) {
        let mut state = self.state.lock().unwrap();
        let applied: Vec<Key> = state
            .applied
            .values()
            .filter(|o| kind_of(o) == "Deployment")
            .map(|o| {
                key(
                    o.metadata.namespace.as_deref().unwrap_or_default(),
                    o.metadata.name.as_deref().unwrap_or_default(),
                )
            })
            .collect();
        let seeded: Vec<Key> = state.deployments.keys().cloned().collect();
        state.available.extend(applied);
        state.available.extend(seeded);
    }

    /// Applied objects keyed by `Kind/namespace/name`
    pub fn applied(&self) -> BTreeMap<String, DynamicObject> {
        self.state.lock().unwrap().applied.clone()
    }

    pub fn applied_keys(&self) -> Vec<String> {
        self.state.lock().unwrap().applied.keys().cloned().collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn apply_calls(&self) -> usize {
        self.state.lock().unwrap().apply_calls
    }

    fn applied_as<K: DeserializeOwned>(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> Option<K> {
        let state = self.state.lock().unwrap();
        let object = state.applied.get(&format!("{kind}/{namespace}/{name}"))?;
        serde_json::to_value(object)
            .ok()
            .and_then(|v| serde_json::from_value(v).ok())
    }
}

fn kind_of(object: &DynamicObject) -> &str {
    object.types.as_ref().map(|t| t.kind.as_str()).unwrap_or_default()
}

fn available_status() -> DeploymentStatus {
    DeploymentStatus {
        conditions: Some(vec![DeploymentCondition {
            type_: "Available".to_string(),
            status: "True".to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

#[async_trait]
impl ClusterReader for FakeCluster {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, LookupError> {
        if let Some(secret) = self.state.lock().unwrap().secrets.get(&key(namespace, name)) {
            return Ok(Some(secret.clone()));
        }
        Ok(self.applied_as("Secret", namespace, name))
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, LookupError> {
        let stored = self
            .state
            .lock()
            .unwrap()
            .config_maps
            .get(&key(namespace, name))
            .cloned();
        if let Some(config_map) = stored {
            return Ok(Some(config_map));
        }
        Ok(self.applied_as("ConfigMap", namespace, name))
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Deployment>, LookupError> {
        let seeded = self
            .state
            .lock()
            .unwrap()
            .deployments
            .get(&key(namespace, name))
            .cloned();
        let deployment = seeded.or_else(|| self.applied_as("Deployment", namespace, name));
        let available = self
            .state
            .lock()
            .unwrap()
            .available
            .contains(&key(namespace, name));
        Ok(deployment.map(|mut d| {
            if available {
                d.status = Some(available_status());
            }
            d
        }))
    }

    async fn get_route_host(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<String>, LookupError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .route_hosts
            .get(&key(namespace, name))
            .cloned())
    }

    async fn list_applications(&self) -> Result<Vec<DataSciencePipelinesApplication>, LookupError> {
        Ok(self.state.lock().unwrap().applications.clone())
    }
}

#[async_trait]
impl ManifestApplier for FakeCluster {
    async fn apply_rendered(&self, objects: &[DynamicObject]) -> Result<(), ApplyError> {
        let mut state = self.state.lock().unwrap();
        state.apply_calls += 1;
        for object in objects {
            state.applied.insert(object_key(object), object.clone());
        }
        Ok(())
    }

    async fn delete_rendered(&self, objects: &[DynamicObject]) -> Result<(), ApplyError> {
        let mut state = self.state.lock().unwrap();
        for object in objects {
            let key = object_key(object);
            if state.applied.remove(&key).is_some() {
                state.deleted.push(key);
            }
        }
        Ok(())
    }
}

/// Controller configuration with a system trust file that does not exist
pub fn config() -> ControllerConfig {
    ControllerConfig {
        operator_namespace: OPERATOR_NAMESPACE.to_string(),
        system_ssl_cert_file: "/nonexistent/ca-bundle.crt".to_string(),
        images: ComponentImages {
            minio: Some("quay.io/minio/minio:test".to_string()),
            webhook: "quay.io/opendatahub/ds-pipelines-webhook:test".to_string(),
            ..ComponentImages::default()
        },
        ..ControllerConfig::default()
    }
}

/// Smallest spec that deploys under v2, without pod-to-pod TLS
pub fn minimal_spec() -> DataSciencePipelinesApplicationSpec {
    DataSciencePipelinesApplicationSpec {
        pod_to_pod_tls: Some(false),
        mlmd: Some(Mlmd {
            deploy: Some(true),
            ..Default::default()
        }),
        object_storage: Some(ObjectStorage {
            minio: Some(Minio::default()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn application(spec: DataSciencePipelinesApplicationSpec) -> DataSciencePipelinesApplication {
    named_application(NAMESPACE, NAME, spec)
}

pub fn named_application(
    namespace: &str,
    name: &str,
    spec: DataSciencePipelinesApplicationSpec,
) -> DataSciencePipelinesApplication {
    let mut dspa = DataSciencePipelinesApplication::new(name, spec);
    dspa.metadata.namespace = Some(namespace.to_string());
    dspa.metadata.uid = Some(format!("uid-{namespace}-{name}"));
    dspa.metadata.generation = Some(1);
    dspa
}

/// Run one pass with succeeding probes and record the status on the resource
pub async fn pass(
    cluster: &FakeCluster,
    dspa: &mut DataSciencePipelinesApplication,
) -> PassOutcome {
    pass_with(cluster, dspa, &Probes::fixed(Ok(()), Ok(())), &config()).await
}

pub async fn pass_with(
    cluster: &FakeCluster,
    dspa: &mut DataSciencePipelinesApplication,
    probes: &Probes,
    config: &ControllerConfig,
) -> PassOutcome {
    let components = registry();
    let outcome = run_pass(
        dspa,
        PassDeps {
            reader: cluster,
            applier: cluster,
            probes,
            config,
            components: &components,
        },
    )
    .await;
    dspa.status = Some(outcome.status.clone());
    outcome
}

/// Status of one condition type in the outcome
pub fn condition<'a>(
    outcome: &'a PassOutcome,
    condition_type: &str,
) -> &'a pipelines_application_controller::crd::Condition {
    outcome
        .status
        .condition(condition_type)
        .unwrap_or_else(|| panic!("condition {condition_type} missing"))
}
