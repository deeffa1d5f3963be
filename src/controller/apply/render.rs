//! Typed object builders shared by the templates.

use super::{ApplyError, TemplateRef};
use crate::constants::*;
use crate::controller::params::ResolvedResources;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, ContainerPort, EnvVar, EnvVarSource, PersistentVolumeClaim,
    PersistentVolumeClaimSpec, PodSpec, PodTemplateSpec, ResourceRequirements, Secret,
    SecretKeySelector, Service, ServiceAccount, ServicePort, ServiceSpec, Volume, VolumeMount,
    VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::ByteString;
use kube::api::DynamicObject;
use serde::Serialize;
use std::collections::BTreeMap;

/// `Kind/namespace/name`, or `Kind/name` for cluster-scoped objects
pub fn object_key(object: &DynamicObject) -> String {
    let kind = object
        .types
        .as_ref()
        .map(|t| t.kind.as_str())
        .unwrap_or_default();
    let name = object.metadata.name.as_deref().unwrap_or_default();
    match object.metadata.namespace.as_deref() {
        Some(namespace) => format!("{kind}/{namespace}/{name}"),
        None => format!("{kind}/{name}"),
    }
}

pub(super) fn to_dynamic<K: Serialize>(
    object: &K,
    template: TemplateRef,
) -> Result<DynamicObject, ApplyError> {
    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .map_err(|e| ApplyError::Render {
            template,
            reason: e.to_string(),
        })
}

pub(super) fn json_to_dynamic(
    value: serde_json::Value,
    template: TemplateRef,
) -> Result<DynamicObject, ApplyError> {
    serde_json::from_value(value).map_err(|e| ApplyError::Render {
        template,
        reason: e.to_string(),
    })
}

pub(super) fn labels(app: &str, instance: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_APP.to_string(), app.to_string()),
        (LABEL_COMPONENT.to_string(), COMPONENT_LABEL_VALUE.to_string()),
        (LABEL_INSTANCE.to_string(), instance.to_string()),
    ])
}

fn with_managed_by(mut labels: BTreeMap<String, String>) -> BTreeMap<String, String> {
    labels.insert(LABEL_MANAGED_BY.to_string(), FIELD_MANAGER.to_string());
    labels
}

pub(super) fn metadata(
    name: &str,
    namespace: Option<&str>,
    labels: &BTreeMap<String, String>,
    owner: Option<&OwnerReference>,
) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        labels: Some(with_managed_by(labels.clone())),
        owner_references: owner.map(|o| vec![o.clone()]),
        ..Default::default()
    }
}

pub(super) fn resources(resolved: &ResolvedResources) -> ResourceRequirements {
    ResourceRequirements {
        requests: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity(resolved.requests_cpu.clone())),
            ("memory".to_string(), Quantity(resolved.requests_memory.clone())),
        ])),
        limits: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity(resolved.limits_cpu.clone())),
            ("memory".to_string(), Quantity(resolved.limits_memory.clone())),
        ])),
        ..Default::default()
    }
}

pub(super) fn env(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        ..Default::default()
    }
}

pub(super) fn env_from_secret(name: &str, secret: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.to_string(),
                key: key.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub(super) fn container(name: &str, image: &str, resolved: &ResolvedResources) -> Container {
    Container {
        name: name.to_string(),
        image: Some(image.to_string()),
        resources: Some(resources(resolved)),
        ..Default::default()
    }
}

pub(super) fn container_port(name: &str, port: i32) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_string()),
        container_port: port,
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

pub(super) fn volume_mount(name: &str, mount_path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: mount_path.to_string(),
        ..Default::default()
    }
}

/// Single-replica workload
#[derive(Debug, Default)]
pub(super) struct Workload<'a> {
    pub name: &'a str,
    pub namespace: &'a str,
    pub labels: BTreeMap<String, String>,
    pub owner: Option<&'a OwnerReference>,
    pub service_account: Option<&'a str>,
    pub containers: Vec<Container>,
    pub volumes: Vec<Volume>,
    pub pod_annotations: BTreeMap<String, String>,
}

impl Workload<'_> {
    pub fn into_deployment(self) -> Deployment {
        let pod_labels = self.labels.clone();
        Deployment {
            metadata: metadata(self.name, Some(self.namespace), &self.labels, self.owner),
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_labels: Some(self.labels),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(pod_labels),
                        annotations: (!self.pod_annotations.is_empty())
                            .then_some(self.pod_annotations),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        service_account_name: self.service_account.map(str::to_string),
                        containers: self.containers,
                        volumes: (!self.volumes.is_empty()).then_some(self.volumes),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

pub(super) fn service(
    name: &str,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    owner: Option<&OwnerReference>,
    ports: &[(&str, i32)],
) -> Service {
    Service {
        metadata: metadata(name, Some(namespace), labels, owner),
        spec: Some(ServiceSpec {
            selector: Some(labels.clone()),
            ports: Some(
                ports
                    .iter()
                    .map(|(port_name, port)| ServicePort {
                        name: Some((*port_name).to_string()),
                        port: *port,
                        protocol: Some("TCP".to_string()),
                        target_port: Some(IntOrString::Int(*port)),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub(super) fn service_account(
    name: &str,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    owner: Option<&OwnerReference>,
) -> ServiceAccount {
    ServiceAccount {
        metadata: metadata(name, Some(namespace), labels, owner),
        ..Default::default()
    }
}

pub(super) fn config_map(
    name: &str,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    owner: Option<&OwnerReference>,
    data: BTreeMap<String, String>,
) -> ConfigMap {
    ConfigMap {
        metadata: metadata(name, Some(namespace), labels, owner),
        data: Some(data),
        ..Default::default()
    }
}

pub(super) fn secret(
    name: &str,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    owner: Option<&OwnerReference>,
    data: &[(&str, &str)],
) -> Secret {
    Secret {
        metadata: metadata(name, Some(namespace), labels, owner),
        data: Some(
            data.iter()
                .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

pub(super) fn persistent_volume_claim(
    name: &str,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    owner: Option<&OwnerReference>,
    size: &str,
    storage_class: Option<&str>,
) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: metadata(name, Some(namespace), labels, owner),
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            storage_class_name: storage_class.map(str::to_string),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(size.to_string()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// OpenShift Route with edge or re-encrypt TLS termination
pub(super) fn route(
    name: &str,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    owner: Option<&OwnerReference>,
    service_name: &str,
    target_port: &str,
    termination: &str,
    template: TemplateRef,
) -> Result<DynamicObject, ApplyError> {
    let metadata = metadata(name, Some(namespace), labels, owner);
    json_to_dynamic(
        serde_json::json!({
            "apiVersion": "route.openshift.io/v1",
            "kind": "Route",
            "metadata": metadata,
            "spec": {
                "to": {"kind": "Service", "name": service_name, "weight": 100},
                "port": {"targetPort": target_port},
                "tls": {
                    "termination": termination,
                    "insecureEdgeTerminationPolicy": "Redirect"
                }
            }
        }),
        template,
    )
}
