//! # Custom Resource Definitions
//!
//! CRD types for the Pipelines Application Controller.
//!
//! Every sub-structure of the spec is optional. Absence is resolved to concrete
//! defaults in exactly one place, [`crate::controller::params::defaults`], so the
//! types here stay a faithful mirror of what the user wrote.

mod status;

pub use status::*;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// DataSciencePipelinesApplication Custom Resource Definition
///
/// Describes one desired pipelines deployment: API server, metadata store,
/// database, object storage, scheduler, workflow engine, UI and webhook.
///
/// # Example
///
/// ```yaml
/// apiVersion: datasciencepipelinesapplications.opendatahub.io/v1
/// kind: DataSciencePipelinesApplication
/// metadata:
///   name: sample
///   namespace: data-science-project
/// spec:
///   dspVersion: v2
///   podToPodTLS: false
///   mlmd:
///     deploy: true
///   objectStorage:
///     minio:
///       image: quay.io/minio/minio:RELEASE.2024-01-01T00-00-00Z
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "DataSciencePipelinesApplication",
    group = "datasciencepipelinesapplications.opendatahub.io",
    version = "v1",
    namespaced,
    status = "DataSciencePipelinesApplicationStatus",
    shortname = "dspa",
    printcolumn = r#"{"name":"Version", "type":"string", "jsonPath":".spec.dspVersion"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Reason", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].reason"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DataSciencePipelinesApplicationSpec {
    /// Pipelines API major version: "v1" (legacy metadata topology) or "v2" (default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsp_version: Option<String>,
    /// Enable TLS between component pods. Defaults to true.
    #[serde(default, rename = "podToPodTLS", skip_serializing_if = "Option::is_none")]
    pub pod_to_pod_tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_server: Option<ApiServer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence_agent: Option<PersistenceAgent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_workflow: Option<ScheduledWorkflow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_controller: Option<WorkflowController>,
    #[serde(default, rename = "mlpipelineUI", skip_serializing_if = "Option::is_none")]
    pub mlpipeline_ui: Option<MlPipelineUi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mlmd: Option<Mlmd>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<Database>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_storage: Option<ObjectStorage>,
}

/// API server configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiServer {
    /// Deploy the API server. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argo_launcher_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argo_driver_image: Option<String>,
    /// Expose the API server through an authenticated route
    #[serde(default, rename = "enableOauth", skip_serializing_if = "Option::is_none")]
    pub enable_route: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_sample_pipeline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    /// User supplied CA bundle to trust for external TLS connections
    #[serde(default, rename = "cABundle", skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<CaBundle>,
    #[serde(default, rename = "customServerConfigMap", skip_serializing_if = "Option::is_none")]
    pub custom_server_config: Option<ScriptConfigMap>,
    /// Name of a ConfigMap whose full data replaces the generated launcher config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_kfp_launcher_config_map: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle_file_mount_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle_file_name: Option<String>,
    #[serde(
        default,
        rename = "artifactSignedURLExpirySeconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub artifact_signed_url_expiry_seconds: Option<i32>,
    /// "database" (default) or "kubernetes"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_store: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaBundle {
    pub config_map_name: String,
    pub config_map_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptConfigMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceAgent {
    /// Deploy the persistence agent. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_workers: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledWorkflow {
    /// Deploy the scheduled workflow controller. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_schedule_timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowController {
    /// Deploy the namespaced workflow controller. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argo_exec_image: Option<String>,
    /// Name of a ConfigMap replacing the generated workflow controller config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MlPipelineUi {
    /// Deploy the UI. Defaults to false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, rename = "configMap", skip_serializing_if = "Option::is_none")]
    pub config_map_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// Metadata store configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Mlmd {
    /// Deploy the metadata store. Defaults to false; required under v2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envoy: Option<Envoy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc: Option<Grpc>,
    /// Writer sub-component, only used by the legacy v1 topology
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer: Option<Writer>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Envoy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    /// Expose the metadata proxy through a route. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_route: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Grpc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Writer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// Database configuration
///
/// `externalDB` takes precedence over `mariaDB` when both are present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    #[serde(default, rename = "mariaDB", skip_serializing_if = "Option::is_none")]
    pub maria_db: Option<MariaDb>,
    #[serde(default, rename = "externalDB", skip_serializing_if = "Option::is_none")]
    pub external_db: Option<ExternalDb>,
    /// JSON object of driver parameters, e.g. `{"tls":"skip-verify"}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_extra_params: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_health_check: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MariaDb {
    /// Deploy the managed database. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, rename = "pipelineDBName", skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret: Option<SecretKeyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvc_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDb {
    pub host: String,
    pub port: String,
    pub username: String,
    #[serde(rename = "pipelineDBName")]
    pub db_name: String,
    pub password_secret: SecretKeyValue,
}

/// Object storage configuration
///
/// `externalStorage` takes precedence over `minio` when both are present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStorage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minio: Option<Minio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_storage: Option<ExternalStorage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_health_check: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_external_route: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Minio {
    /// Deploy the managed object store. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, rename = "s3CredentialsSecret", skip_serializing_if = "Option::is_none")]
    pub s3_credentials_secret: Option<S3CredentialSecret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvc_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalStorage {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    pub scheme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    pub bucket: String,
    #[serde(rename = "s3CredentialsSecret")]
    pub s3_credentials_secret: S3CredentialSecret,
    /// Defaults to `scheme == "https"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct S3CredentialSecret {
    pub secret_name: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyValue {
    pub name: String,
    pub key: String,
}

/// Compute resources for one container
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<Resources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<Resources>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_deserializes_wire_names() {
        let json = serde_json::json!({
            "dspVersion": "v2",
            "podToPodTLS": false,
            "apiServer": {
                "enableOauth": true,
                "cABundle": {"configMapName": "user-ca", "configMapKey": "ca.crt"},
                "artifactSignedURLExpirySeconds": 30
            },
            "mlpipelineUI": {"deploy": true, "configMap": "ui-config"},
            "database": {
                "externalDB": {
                    "host": "db.example.com",
                    "port": "3306",
                    "username": "pipelines",
                    "pipelineDBName": "pipelines",
                    "passwordSecret": {"name": "db-secret", "key": "password"}
                }
            },
            "objectStorage": {
                "minio": {"image": "minio:latest", "s3CredentialsSecret": {
                    "secretName": "s3", "accessKey": "ak", "secretKey": "sk"
                }}
            }
        });

        let spec: DataSciencePipelinesApplicationSpec = serde_json::from_value(json).unwrap();
        assert_eq!(spec.dsp_version.as_deref(), Some("v2"));
        assert_eq!(spec.pod_to_pod_tls, Some(false));

        let api_server = spec.api_server.unwrap();
        assert_eq!(api_server.enable_route, Some(true));
        assert_eq!(api_server.ca_bundle.unwrap().config_map_name, "user-ca");
        assert_eq!(api_server.artifact_signed_url_expiry_seconds, Some(30));

        let ui = spec.mlpipeline_ui.unwrap();
        assert_eq!(ui.config_map_name.as_deref(), Some("ui-config"));

        let external = spec.database.unwrap().external_db.unwrap();
        assert_eq!(external.db_name, "pipelines");
        assert_eq!(external.password_secret.name, "db-secret");

        let minio = spec.object_storage.unwrap().minio.unwrap();
        assert_eq!(minio.s3_credentials_secret.unwrap().secret_name, "s3");
    }

    #[test]
    fn test_empty_spec_deserializes() {
        let spec: DataSciencePipelinesApplicationSpec =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(spec, DataSciencePipelinesApplicationSpec::default());
    }
}
