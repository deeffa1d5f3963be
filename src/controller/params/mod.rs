//! # Parameter Derivation
//!
//! Turns a partially specified `DataSciencePipelinesApplication` plus live cluster
//! state into one fully populated [`ResolvedParameters`] value.
//!
//! ## Flow
//!
//! 1. [`defaults::apply_defaults`] resolves every optional field without touching the
//!    cluster (deploy flags, images, resources, version gating, backend selection)
//! 2. [`trust::resolve_trust`] merges the CA bundle sources
//! 3. [`secrets`] reads stored credentials or generates managed ones
//! 4. [`derive`] assembles connection material and derived names
//!
//! The result is built once per reconciliation pass and only ever borrowed afterwards.

pub mod defaults;
mod derive;
pub mod lookup;
pub mod secrets;
pub mod trust;

pub use defaults::{apply_defaults, DefaultedSpec};
pub use derive::derive;
pub use lookup::{ClusterReader, KubeClusterReader, LookupError};
pub use secrets::Credential;
pub use trust::{CaMount, TrustBlock, TrustBundle, TrustSource};

use crate::controller::errors::ErrorClass;
use crate::crd::{S3CredentialSecret, SecretKeyValue};
use std::collections::BTreeMap;

/// Errors raised while deriving parameters
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("{kind} \"{name}\" not found in namespace \"{namespace}\"")]
    NotFound {
        kind: &'static str,
        name: String,
        namespace: String,
    },
    #[error("{kind} \"{name}\" is malformed: {reason}")]
    Malformed {
        kind: &'static str,
        name: String,
        reason: String,
    },
    #[error("MLMD is required in DSP v2: spec.mlmd.deploy must be set to true")]
    MlmdIsRequiredInV2,
    #[error("unsupported dspVersion \"{0}\", expected \"v1\" or \"v2\"")]
    UnsupportedVersion(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("cluster lookup failed: {0}")]
    Lookup(#[from] LookupError),
}

impl ParamsError {
    pub fn not_found(kind: &'static str, name: &str, namespace: &str) -> Self {
        ParamsError::NotFound {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    pub fn malformed(kind: &'static str, name: &str, reason: impl Into<String>) -> Self {
        ParamsError::Malformed {
            kind,
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ParamsError::NotFound { .. } => ErrorClass::MissingDependency,
            ParamsError::Malformed { .. }
            | ParamsError::MlmdIsRequiredInV2
            | ParamsError::UnsupportedVersion(_)
            | ParamsError::InvalidConfiguration(_) => ErrorClass::Configuration,
            ParamsError::Lookup(_) => ErrorClass::Transient,
        }
    }
}

/// Supported pipelines API major versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DspVersion {
    V1,
    V2,
}

impl DspVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            DspVersion::V1 => crate::constants::DSP_VERSION_V1,
            DspVersion::V2 => crate::constants::DSP_VERSION_V2,
        }
    }
}

/// Where the API server stores pipeline definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStore {
    Database,
    Kubernetes,
}

/// Container resource requests and limits with every field populated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResources {
    pub requests_cpu: String,
    pub requests_memory: String,
    pub limits_cpu: String,
    pub limits_memory: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptConfigRef {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiServerParams {
    pub name: String,
    pub image: String,
    pub argo_launcher_image: String,
    pub argo_driver_image: String,
    pub oauth_proxy_image: String,
    pub resources: ResolvedResources,
    pub enable_route: bool,
    pub enable_sample_pipeline: bool,
    pub custom_server_config: ScriptConfigRef,
    pub custom_kfp_launcher_config_map: Option<String>,
    pub artifact_signed_url_expiry_seconds: i32,
    pub pipeline_store: PipelineStore,
    pub cache_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceAgentParams {
    pub name: String,
    pub image: String,
    pub num_workers: i32,
    pub resources: ResolvedResources,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledWorkflowParams {
    pub name: String,
    pub image: String,
    pub cron_schedule_timezone: String,
    pub resources: ResolvedResources,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowControllerParams {
    pub name: String,
    pub image: String,
    pub argo_exec_image: String,
    pub custom_config: Option<String>,
    pub resources: ResolvedResources,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiParams {
    pub name: String,
    pub image: String,
    pub config_map_name: Option<String>,
    pub resources: ResolvedResources,
}

/// Metadata store layout, selected by the DSP version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MlmdTopology {
    /// v1: envoy proxy, gRPC server and a dedicated writer
    Legacy,
    /// v2: envoy proxy and gRPC server
    Unified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MlmdSubComponent {
    pub name: String,
    pub image: String,
    pub resources: ResolvedResources,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MlmdParams {
    pub topology: MlmdTopology,
    pub envoy: MlmdSubComponent,
    pub deploy_envoy_route: bool,
    pub grpc: MlmdSubComponent,
    pub grpc_port: String,
    pub writer: Option<MlmdSubComponent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MariaDbParams {
    pub name: String,
    pub image: String,
    pub username: String,
    pub db_name: String,
    pub password_secret: SecretKeyValue,
    pub pvc_size: String,
    pub storage_class_name: Option<String>,
    pub resources: ResolvedResources,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinioParams {
    pub name: String,
    pub image: String,
    pub bucket: String,
    pub credentials_secret: S3CredentialSecret,
    pub pvc_size: String,
    pub storage_class_name: Option<String>,
    pub resources: ResolvedResources,
}

/// Resolved database connection
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConnection {
    pub host: String,
    pub port: String,
    pub username: String,
    pub db_name: String,
    pub password: Credential,
    pub credentials_secret: SecretKeyValue,
    /// Driver parameters, rendered as a JSON object
    pub extra_params: BTreeMap<String, String>,
    /// True when the password was freshly generated this pass
    pub password_generated: bool,
}

impl DatabaseConnection {
    /// TLS mode requested through the extra params (`"true"`, `"false"`, `"skip-verify"`, ...)
    pub fn tls_mode(&self) -> &str {
        self.extra_params
            .get("tls")
            .map(String::as_str)
            .unwrap_or("false")
    }

    pub fn extra_params_json(&self) -> String {
        serde_json::to_string(&self.extra_params).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Resolved object storage connection
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectStorageConnection {
    pub host: String,
    pub port: Option<String>,
    pub scheme: String,
    pub region: String,
    pub base_path: Option<String>,
    pub bucket: String,
    pub secure: bool,
    /// `scheme://host[:port]`
    pub endpoint: String,
    pub access_key: Credential,
    pub secret_key: Credential,
    pub credentials_secret: S3CredentialSecret,
    pub external_route_host: Option<String>,
    pub credentials_generated: bool,
}

/// Which database backend is active
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseBackend {
    Managed(MariaDbParams),
    External,
}

/// Which object storage backend is active
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectStorageBackend {
    Managed(MinioParams),
    External,
}

/// Fully resolved parameters for one reconciliation pass
///
/// `None` for a component means it is not deployed and reports `NotApplicable`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParameters {
    pub name: String,
    pub namespace: String,
    pub dsp_version: DspVersion,
    pub pod_to_pod_tls: bool,
    pub include_owner_reference: bool,
    pub operator_namespace: String,
    /// Operator-level image of the shared webhook
    pub webhook_image: String,

    pub api_server: Option<ApiServerParams>,
    pub persistence_agent: Option<PersistenceAgentParams>,
    pub scheduled_workflow: Option<ScheduledWorkflowParams>,
    pub workflow_controller: Option<WorkflowControllerParams>,
    pub ui: Option<UiParams>,
    pub mlmd: Option<MlmdParams>,

    pub database_backend: DatabaseBackend,
    pub database: DatabaseConnection,
    pub database_health_check: bool,

    pub object_storage_backend: ObjectStorageBackend,
    pub object_storage: ObjectStorageConnection,
    pub object_storage_health_check: bool,
    /// Expose the managed object store through a Route
    pub object_storage_route: bool,

    pub trust: TrustBundle,
    pub ca_mount: CaMount,
    /// JSON of the referenced launcher ConfigMap's data, keys sorted
    pub custom_kfp_launcher_config: Option<String>,
}

impl ResolvedParameters {
    /// The webhook is only needed when pipelines are stored as Kubernetes objects
    pub fn webhook_required(&self) -> bool {
        self.api_server
            .as_ref()
            .map(|a| a.pipeline_store == PipelineStore::Kubernetes)
            .unwrap_or(false)
    }

    pub fn api_server_service_dns(&self) -> String {
        format!(
            "{}-{}.{}.svc.cluster.local",
            crate::constants::DSP_SERVICE_PREFIX,
            self.name,
            self.namespace
        )
    }
}
