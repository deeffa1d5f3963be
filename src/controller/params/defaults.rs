//! # Defaulting
//!
//! The single place where absent spec fields become concrete values. Nothing here
//! touches the cluster, so every precedence rule is testable in isolation.
//!
//! | Component | Deploy default |
//! |-----------|----------------|
//! | apiServer, persistenceAgent, scheduledWorkflow, workflowController | true |
//! | database.mariaDB, objectStorage.minio | true |
//! | mlmd, mlpipelineUI | false |
//!
//! An absent sub-structure always resolves exactly like `deploy: true` (or the
//! component's default) with no overrides.

use super::{
    ApiServerParams, DspVersion, MariaDbParams, MinioParams, MlmdParams, MlmdSubComponent,
    MlmdTopology, ParamsError, PersistenceAgentParams, PipelineStore, ResolvedResources,
    ScheduledWorkflowParams, ScriptConfigRef, UiParams, WorkflowControllerParams,
};
use crate::config::ComponentImages;
use crate::constants::*;
use crate::crd::{
    DataSciencePipelinesApplicationSpec, ExternalDb, ExternalStorage, ResourceRequirements,
    S3CredentialSecret, SecretKeyValue,
};
use regex::Regex;
use std::sync::LazyLock;

/// Kubernetes resource quantity syntax
static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+|[KMGTPE]i|[numkMGTPE])?$")
        .expect("quantity regex is valid")
});

const API_SERVER_RESOURCES: (&str, &str, &str, &str) = ("250m", "500Mi", "500m", "1Gi");
const PERSISTENCE_AGENT_RESOURCES: (&str, &str, &str, &str) = ("120m", "500Mi", "250m", "1Gi");
const SCHEDULED_WORKFLOW_RESOURCES: (&str, &str, &str, &str) = ("120m", "100Mi", "250m", "250Mi");
const WORKFLOW_CONTROLLER_RESOURCES: (&str, &str, &str, &str) = ("120m", "500Mi", "250m", "1Gi");
const MARIADB_RESOURCES: (&str, &str, &str, &str) = ("300m", "800Mi", "1", "1Gi");
const MINIO_RESOURCES: (&str, &str, &str, &str) = ("200m", "100Mi", "250m", "1Gi");
const UI_RESOURCES: (&str, &str, &str, &str) = ("100m", "256Mi", "100m", "256Mi");
const MLMD_ENVOY_RESOURCES: (&str, &str, &str, &str) = ("100m", "256Mi", "100m", "256Mi");
const MLMD_GRPC_RESOURCES: (&str, &str, &str, &str) = ("100m", "256Mi", "100m", "256Mi");
const MLMD_WRITER_RESOURCES: (&str, &str, &str, &str) = ("100m", "256Mi", "100m", "256Mi");

const DEFAULT_PERSISTENCE_AGENT_WORKERS: i32 = 2;
const DEFAULT_CRON_SCHEDULE_TIMEZONE: &str = "UTC";

const PERSISTENCE_AGENT_PREFIX: &str = "ds-pipeline-persistenceagent";
const SCHEDULED_WORKFLOW_PREFIX: &str = "ds-pipeline-scheduledworkflow";
const WORKFLOW_CONTROLLER_PREFIX: &str = "ds-pipeline-workflow-controller";
const UI_PREFIX: &str = "ds-pipeline-ui";
const MLMD_ENVOY_PREFIX: &str = "ds-pipeline-metadata-envoy";
const MLMD_GRPC_PREFIX: &str = "ds-pipeline-metadata-grpc";
const MLMD_WRITER_PREFIX: &str = "ds-pipeline-metadata-writer";

/// Database backend selection after defaulting
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseSelection {
    External(ExternalDb),
    Managed(MariaDbParams),
}

/// Object storage backend selection after defaulting
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectStorageSelection {
    External(ExternalStorage),
    Managed(MinioParams),
}

/// Spec with every optional field resolved, before any cluster lookup
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultedSpec {
    pub dsp_version: DspVersion,
    pub pod_to_pod_tls: bool,
    pub api_server: Option<ApiServerParams>,
    pub persistence_agent: Option<PersistenceAgentParams>,
    pub scheduled_workflow: Option<ScheduledWorkflowParams>,
    pub workflow_controller: Option<WorkflowControllerParams>,
    pub ui: Option<UiParams>,
    pub mlmd: Option<MlmdParams>,
    pub database: DatabaseSelection,
    pub custom_extra_params: Option<String>,
    pub database_health_check: bool,
    pub object_storage: ObjectStorageSelection,
    pub object_storage_health_check: bool,
    pub enable_external_route: bool,
}

fn prefixed(prefix: &str, name: &str) -> String {
    format!("{prefix}-{name}")
}

fn image_or(image: Option<&String>, default: &str) -> String {
    image
        .filter(|i| !i.is_empty())
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

fn validate_quantity(field: &str, value: &str) -> Result<String, ParamsError> {
    if QUANTITY.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(ParamsError::InvalidConfiguration(format!(
            "{field} \"{value}\" is not a valid resource quantity"
        )))
    }
}

/// Merge user resource overrides field by field over the component defaults
pub fn resolve_resources(
    component: &str,
    user: Option<&ResourceRequirements>,
    defaults: (&str, &str, &str, &str),
) -> Result<ResolvedResources, ParamsError> {
    let (requests_cpu, requests_memory, limits_cpu, limits_memory) = defaults;
    let requests = user.and_then(|r| r.requests.as_ref());
    let limits = user.and_then(|r| r.limits.as_ref());

    let pick = |field: &str, value: Option<&String>, default: &str| match value {
        Some(v) if !v.is_empty() => validate_quantity(&format!("{component}.{field}"), v),
        _ => Ok(default.to_string()),
    };

    Ok(ResolvedResources {
        requests_cpu: pick("requests.cpu", requests.and_then(|r| r.cpu.as_ref()), requests_cpu)?,
        requests_memory: pick(
            "requests.memory",
            requests.and_then(|r| r.memory.as_ref()),
            requests_memory,
        )?,
        limits_cpu: pick("limits.cpu", limits.and_then(|r| r.cpu.as_ref()), limits_cpu)?,
        limits_memory: pick(
            "limits.memory",
            limits.and_then(|r| r.memory.as_ref()),
            limits_memory,
        )?,
    })
}

fn resolve_version(spec: &DataSciencePipelinesApplicationSpec) -> Result<DspVersion, ParamsError> {
    match spec.dsp_version.as_deref().unwrap_or(DSP_VERSION_V2) {
        DSP_VERSION_V1 => Ok(DspVersion::V1),
        DSP_VERSION_V2 => Ok(DspVersion::V2),
        other => Err(ParamsError::UnsupportedVersion(other.to_string())),
    }
}

fn resolve_api_server(
    spec: &DataSciencePipelinesApplicationSpec,
    name: &str,
    images: &ComponentImages,
) -> Result<Option<ApiServerParams>, ParamsError> {
    let api_server = spec.api_server.clone().unwrap_or_default();
    if !api_server.deploy.unwrap_or(true) {
        return Ok(None);
    }

    let pipeline_store = match api_server.pipeline_store.as_deref() {
        None | Some("") | Some(PIPELINE_STORE_DATABASE) => PipelineStore::Database,
        Some(PIPELINE_STORE_KUBERNETES) => PipelineStore::Kubernetes,
        Some(other) => {
            return Err(ParamsError::InvalidConfiguration(format!(
                "apiServer.pipelineStore \"{other}\" must be \"{PIPELINE_STORE_DATABASE}\" or \"{PIPELINE_STORE_KUBERNETES}\""
            )))
        }
    };

    let custom_server_config = match &api_server.custom_server_config {
        Some(cfg) => ScriptConfigRef {
            name: cfg
                .name
                .clone()
                .unwrap_or_else(|| format!("{CUSTOM_SERVER_CONFIGMAP_PREFIX}{name}")),
            key: cfg
                .key
                .clone()
                .unwrap_or_else(|| CUSTOM_SERVER_CONFIGMAP_KEY.to_string()),
        },
        None => ScriptConfigRef {
            name: format!("{CUSTOM_SERVER_CONFIGMAP_PREFIX}{name}"),
            key: CUSTOM_SERVER_CONFIGMAP_KEY.to_string(),
        },
    };

    Ok(Some(ApiServerParams {
        name: prefixed(DSP_SERVICE_PREFIX, name),
        image: image_or(api_server.image.as_ref(), &images.api_server),
        argo_launcher_image: image_or(
            api_server.argo_launcher_image.as_ref(),
            &images.argo_launcher,
        ),
        argo_driver_image: image_or(api_server.argo_driver_image.as_ref(), &images.argo_driver),
        oauth_proxy_image: images.oauth_proxy.clone(),
        resources: resolve_resources(
            "apiServer",
            api_server.resources.as_ref(),
            API_SERVER_RESOURCES,
        )?,
        enable_route: api_server.enable_route.unwrap_or(true),
        enable_sample_pipeline: api_server.enable_sample_pipeline.unwrap_or(false),
        custom_server_config,
        custom_kfp_launcher_config_map: api_server
            .custom_kfp_launcher_config_map
            .filter(|n| !n.is_empty()),
        artifact_signed_url_expiry_seconds: api_server
            .artifact_signed_url_expiry_seconds
            .unwrap_or(DEFAULT_SIGNED_URL_EXPIRY_SECONDS),
        pipeline_store,
        cache_enabled: api_server.cache_enabled.unwrap_or(true),
    }))
}

fn resolve_mlmd(
    spec: &DataSciencePipelinesApplicationSpec,
    version: DspVersion,
    name: &str,
    images: &ComponentImages,
) -> Result<Option<MlmdParams>, ParamsError> {
    let deploy = spec
        .mlmd
        .as_ref()
        .and_then(|m| m.deploy)
        .unwrap_or(false);

    if !deploy {
        return match version {
            DspVersion::V2 => Err(ParamsError::MlmdIsRequiredInV2),
            DspVersion::V1 => Ok(None),
        };
    }

    let mlmd = spec.mlmd.clone().unwrap_or_default();
    let envoy = mlmd.envoy.unwrap_or_default();
    let grpc = mlmd.grpc.unwrap_or_default();
    let topology = match version {
        DspVersion::V1 => MlmdTopology::Legacy,
        DspVersion::V2 => MlmdTopology::Unified,
    };

    let writer = match topology {
        MlmdTopology::Legacy => {
            let writer = mlmd.writer.unwrap_or_default();
            Some(MlmdSubComponent {
                name: prefixed(MLMD_WRITER_PREFIX, name),
                image: image_or(writer.image.as_ref(), &images.mlmd_writer),
                resources: resolve_resources(
                    "mlmd.writer",
                    writer.resources.as_ref(),
                    MLMD_WRITER_RESOURCES,
                )?,
            })
        }
        MlmdTopology::Unified => None,
    };

    Ok(Some(MlmdParams {
        topology,
        envoy: MlmdSubComponent {
            name: prefixed(MLMD_ENVOY_PREFIX, name),
            image: image_or(envoy.image.as_ref(), &images.mlmd_envoy),
            resources: resolve_resources(
                "mlmd.envoy",
                envoy.resources.as_ref(),
                MLMD_ENVOY_RESOURCES,
            )?,
        },
        deploy_envoy_route: envoy.deploy_route.unwrap_or(true),
        grpc: MlmdSubComponent {
            name: prefixed(MLMD_GRPC_PREFIX, name),
            image: image_or(grpc.image.as_ref(), &images.mlmd_grpc),
            resources: resolve_resources(
                "mlmd.grpc",
                grpc.resources.as_ref(),
                MLMD_GRPC_RESOURCES,
            )?,
        },
        grpc_port: grpc
            .port
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| MLMD_GRPC_PORT.to_string()),
        writer,
    }))
}

fn resolve_database(
    spec: &DataSciencePipelinesApplicationSpec,
    name: &str,
    images: &ComponentImages,
) -> Result<DatabaseSelection, ParamsError> {
    let database = spec.database.clone().unwrap_or_default();

    if let Some(external) = database.external_db {
        return Ok(DatabaseSelection::External(external));
    }

    let mariadb = database.maria_db.unwrap_or_default();
    if !mariadb.deploy.unwrap_or(true) {
        return Err(ParamsError::InvalidConfiguration(
            "either database.mariaDB must be deployed or database.externalDB must be specified"
                .to_string(),
        ));
    }

    Ok(DatabaseSelection::Managed(MariaDbParams {
        name: prefixed(MARIADB_HOST_PREFIX, name),
        image: image_or(mariadb.image.as_ref(), &images.mariadb),
        username: mariadb
            .username
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| MARIADB_USER.to_string()),
        db_name: mariadb
            .db_name
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| MARIADB_DB_NAME.to_string()),
        password_secret: mariadb.password_secret.unwrap_or_else(|| SecretKeyValue {
            name: format!("{DEFAULT_DB_SECRET_PREFIX}{name}"),
            key: DEFAULT_DB_SECRET_KEY.to_string(),
        }),
        pvc_size: match mariadb.pvc_size.filter(|s| !s.is_empty()) {
            Some(size) => validate_quantity("database.mariaDB.pvcSize", &size)?,
            None => MARIADB_PVC_SIZE.to_string(),
        },
        storage_class_name: mariadb.storage_class_name.filter(|s| !s.is_empty()),
        resources: resolve_resources(
            "database.mariaDB",
            mariadb.resources.as_ref(),
            MARIADB_RESOURCES,
        )?,
    }))
}

fn resolve_object_storage(
    spec: &DataSciencePipelinesApplicationSpec,
    name: &str,
    images: &ComponentImages,
) -> Result<ObjectStorageSelection, ParamsError> {
    let object_storage = spec.object_storage.clone().ok_or_else(|| {
        ParamsError::InvalidConfiguration(
            "either objectStorage.minio or objectStorage.externalStorage must be specified"
                .to_string(),
        )
    })?;

    if let Some(external) = object_storage.external_storage {
        return Ok(ObjectStorageSelection::External(external));
    }

    let minio = object_storage.minio.ok_or_else(|| {
        ParamsError::InvalidConfiguration(
            "either objectStorage.minio or objectStorage.externalStorage must be specified"
                .to_string(),
        )
    })?;
    if !minio.deploy.unwrap_or(true) {
        return Err(ParamsError::InvalidConfiguration(
            "either objectStorage.minio must be deployed or objectStorage.externalStorage must be specified"
                .to_string(),
        ));
    }

    let image = minio
        .image
        .filter(|i| !i.is_empty())
        .or_else(|| images.minio.clone())
        .ok_or_else(|| {
            ParamsError::InvalidConfiguration(
                "objectStorage.minio is specified but no image is provided".to_string(),
            )
        })?;

    Ok(ObjectStorageSelection::Managed(MinioParams {
        name: prefixed(MINIO_HOST_PREFIX, name),
        image,
        bucket: minio
            .bucket
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| MINIO_DEFAULT_BUCKET.to_string()),
        credentials_secret: minio
            .s3_credentials_secret
            .unwrap_or_else(|| S3CredentialSecret {
                secret_name: format!("{DEFAULT_OBJECT_STORAGE_SECRET_PREFIX}{name}"),
                access_key: DEFAULT_OBJECT_STORAGE_ACCESS_KEY.to_string(),
                secret_key: DEFAULT_OBJECT_STORAGE_SECRET_KEY.to_string(),
            }),
        pvc_size: match minio.pvc_size.filter(|s| !s.is_empty()) {
            Some(size) => validate_quantity("objectStorage.minio.pvcSize", &size)?,
            None => MINIO_PVC_SIZE.to_string(),
        },
        storage_class_name: minio.storage_class_name.filter(|s| !s.is_empty()),
        resources: resolve_resources(
            "objectStorage.minio",
            minio.resources.as_ref(),
            MINIO_RESOURCES,
        )?,
    }))
}

/// Resolve every optional field of the spec
///
/// # Errors
///
/// Configuration errors only: unsupported version, MLMD missing under v2, no usable
/// database or object storage backend, invalid pipeline store or resource quantity.
pub fn apply_defaults(
    spec: &DataSciencePipelinesApplicationSpec,
    name: &str,
    images: &ComponentImages,
) -> Result<DefaultedSpec, ParamsError> {
    let dsp_version = resolve_version(spec)?;
    let mlmd = resolve_mlmd(spec, dsp_version, name, images)?;
    let api_server = resolve_api_server(spec, name, images)?;

    let persistence_agent = {
        let pa = spec.persistence_agent.clone().unwrap_or_default();
        if pa.deploy.unwrap_or(true) {
            Some(PersistenceAgentParams {
                name: prefixed(PERSISTENCE_AGENT_PREFIX, name),
                image: image_or(pa.image.as_ref(), &images.persistence_agent),
                num_workers: pa
                    .num_workers
                    .filter(|n| *n > 0)
                    .unwrap_or(DEFAULT_PERSISTENCE_AGENT_WORKERS),
                resources: resolve_resources(
                    "persistenceAgent",
                    pa.resources.as_ref(),
                    PERSISTENCE_AGENT_RESOURCES,
                )?,
            })
        } else {
            None
        }
    };

    let scheduled_workflow = {
        let swf = spec.scheduled_workflow.clone().unwrap_or_default();
        if swf.deploy.unwrap_or(true) {
            Some(ScheduledWorkflowParams {
                name: prefixed(SCHEDULED_WORKFLOW_PREFIX, name),
                image: image_or(swf.image.as_ref(), &images.scheduled_workflow),
                cron_schedule_timezone: swf
                    .cron_schedule_timezone
                    .filter(|tz| !tz.is_empty())
                    .unwrap_or_else(|| DEFAULT_CRON_SCHEDULE_TIMEZONE.to_string()),
                resources: resolve_resources(
                    "scheduledWorkflow",
                    swf.resources.as_ref(),
                    SCHEDULED_WORKFLOW_RESOURCES,
                )?,
            })
        } else {
            None
        }
    };

    let workflow_controller = {
        let wc = spec.workflow_controller.clone().unwrap_or_default();
        if wc.deploy.unwrap_or(true) {
            Some(WorkflowControllerParams {
                name: prefixed(WORKFLOW_CONTROLLER_PREFIX, name),
                image: image_or(wc.image.as_ref(), &images.workflow_controller),
                argo_exec_image: image_or(wc.argo_exec_image.as_ref(), &images.argo_exec),
                custom_config: wc.custom_config.filter(|c| !c.is_empty()),
                resources: resolve_resources(
                    "workflowController",
                    wc.resources.as_ref(),
                    WORKFLOW_CONTROLLER_RESOURCES,
                )?,
            })
        } else {
            None
        }
    };

    let ui = {
        let ui = spec.mlpipeline_ui.clone().unwrap_or_default();
        if ui.deploy.unwrap_or(false) {
            Some(UiParams {
                name: prefixed(UI_PREFIX, name),
                image: image_or(ui.image.as_ref(), &images.ui),
                config_map_name: ui.config_map_name.filter(|c| !c.is_empty()),
                resources: resolve_resources("mlpipelineUI", ui.resources.as_ref(), UI_RESOURCES)?,
            })
        } else {
            None
        }
    };

    let database = resolve_database(spec, name, images)?;
    let object_storage = resolve_object_storage(spec, name, images)?;

    let database_section = spec.database.as_ref();
    let object_storage_section = spec.object_storage.as_ref();

    Ok(DefaultedSpec {
        dsp_version,
        pod_to_pod_tls: spec.pod_to_pod_tls.unwrap_or(true),
        api_server,
        persistence_agent,
        scheduled_workflow,
        workflow_controller,
        ui,
        mlmd,
        database,
        custom_extra_params: database_section.and_then(|d| d.custom_extra_params.clone()),
        database_health_check: !database_section
            .and_then(|d| d.disable_health_check)
            .unwrap_or(false),
        object_storage,
        object_storage_health_check: !object_storage_section
            .and_then(|o| o.disable_health_check)
            .unwrap_or(false),
        enable_external_route: object_storage_section
            .and_then(|o| o.enable_external_route)
            .unwrap_or(false),
    })
}
