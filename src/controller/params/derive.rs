//! Parameter derivation: defaulted spec plus cluster lookups.

use super::defaults::{apply_defaults, DatabaseSelection, ObjectStorageSelection};
use super::lookup::ClusterReader;
use super::secrets::{retrieve_credential, retrieve_or_generate_credentials};
use super::trust::{resolve_trust, CaMount, TrustRequest};
use super::{
    DatabaseBackend, DatabaseConnection, DefaultedSpec, ObjectStorageBackend,
    ObjectStorageConnection, ParamsError, ResolvedParameters,
};
use crate::config::ControllerConfig;
use crate::constants::*;
use crate::crd::DataSciencePipelinesApplication;
use crate::observability;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Derive the complete parameter set for one reconciliation pass
///
/// # Errors
///
/// - Configuration errors from defaulting and from malformed referenced objects
/// - `NotFound` for any referenced Secret or ConfigMap that does not exist
/// - `Lookup` when the cluster API cannot be read
pub async fn derive(
    dspa: &DataSciencePipelinesApplication,
    reader: &dyn ClusterReader,
    config: &ControllerConfig,
) -> Result<ResolvedParameters, ParamsError> {
    let name = dspa.name_any();
    let namespace = dspa.namespace().ok_or_else(|| {
        ParamsError::InvalidConfiguration(format!("resource {name} has no namespace"))
    })?;

    let defaulted = apply_defaults(&dspa.spec, &name, &config.images)?;

    let custom_kfp_launcher_config = match defaulted
        .api_server
        .as_ref()
        .and_then(|a| a.custom_kfp_launcher_config_map.as_deref())
    {
        Some(config_map_name) => {
            Some(load_launcher_config(reader, &namespace, config_map_name).await?)
        }
        None => None,
    };

    let api_server_spec = dspa.spec.api_server.as_ref();
    let trust = resolve_trust(
        reader,
        &namespace,
        TrustRequest {
            user_bundle: api_server_spec.and_then(|a| a.ca_bundle.as_ref()),
            pod_to_pod_tls: defaulted.pod_to_pod_tls,
            system_trust_file: Path::new(&config.system_ssl_cert_file),
        },
    )
    .await?;
    let ca_mount = CaMount::new(
        &name,
        api_server_spec.and_then(|a| a.ca_bundle_file_mount_path.as_deref()),
        api_server_spec.and_then(|a| a.ca_bundle_file_name.as_deref()),
        &trust,
    );

    let (database_backend, database) =
        derive_database(&defaulted, reader, &name, &namespace).await?;
    let (object_storage_backend, object_storage) =
        derive_object_storage(&defaulted, reader, &name, &namespace).await?;

    let DefaultedSpec {
        dsp_version,
        pod_to_pod_tls,
        api_server,
        persistence_agent,
        scheduled_workflow,
        workflow_controller,
        ui,
        mlmd,
        database_health_check,
        object_storage_health_check,
        enable_external_route,
        ..
    } = defaulted;

    Ok(ResolvedParameters {
        name,
        namespace,
        dsp_version,
        pod_to_pod_tls,
        include_owner_reference: config.include_owner_reference,
        operator_namespace: config.operator_namespace.clone(),
        webhook_image: config.images.webhook.clone(),
        api_server,
        persistence_agent,
        scheduled_workflow,
        workflow_controller,
        ui,
        mlmd,
        database_backend,
        database,
        database_health_check: database_health_check && config.database_health_check_enabled,
        object_storage_backend,
        object_storage,
        object_storage_health_check: object_storage_health_check
            && config.object_store_health_check_enabled,
        object_storage_route: enable_external_route,
        trust,
        ca_mount,
        custom_kfp_launcher_config,
    })
}

async fn load_launcher_config(
    reader: &dyn ClusterReader,
    namespace: &str,
    config_map_name: &str,
) -> Result<String, ParamsError> {
    let config_map = reader
        .get_config_map(namespace, config_map_name)
        .await?
        .ok_or_else(|| ParamsError::not_found("ConfigMap", config_map_name, namespace))?;
    // BTreeMap serializes with sorted keys
    let data = config_map.data.unwrap_or_default();
    serde_json::to_string(&data)
        .map_err(|e| ParamsError::malformed("ConfigMap", config_map_name, e.to_string()))
}

fn parse_extra_params(raw: &str) -> Result<BTreeMap<String, String>, ParamsError> {
    serde_json::from_str::<BTreeMap<String, String>>(raw).map_err(|e| {
        ParamsError::malformed(
            "field",
            "spec.database.customExtraParams",
            format!("must be a JSON object of string values: {e}"),
        )
    })
}

async fn derive_database(
    defaulted: &DefaultedSpec,
    reader: &dyn ClusterReader,
    name: &str,
    namespace: &str,
) -> Result<(DatabaseBackend, DatabaseConnection), ParamsError> {
    let (backend, mut connection) = match &defaulted.database {
        DatabaseSelection::External(external) => {
            let password = retrieve_credential(
                reader,
                namespace,
                &external.password_secret.name,
                &external.password_secret.key,
            )
            .await?;
            (
                DatabaseBackend::External,
                DatabaseConnection {
                    host: external.host.clone(),
                    port: external.port.clone(),
                    username: external.username.clone(),
                    db_name: external.db_name.clone(),
                    password,
                    credentials_secret: external.password_secret.clone(),
                    extra_params: BTreeMap::from([("tls".to_string(), "true".to_string())]),
                    password_generated: false,
                },
            )
        }
        DatabaseSelection::Managed(mariadb) => {
            let (mut values, generated) = retrieve_or_generate_credentials(
                reader,
                namespace,
                &mariadb.password_secret.name,
                &[(mariadb.password_secret.key.as_str(), GENERATED_DB_PASSWORD_LENGTH)],
            )
            .await?;
            if generated {
                observability::metrics::increment_credentials_generated("database");
            }
            let password = values.remove(0);
            let tls = if defaulted.pod_to_pod_tls { "true" } else { "false" };
            (
                DatabaseBackend::Managed(mariadb.clone()),
                DatabaseConnection {
                    host: format!("{MARIADB_HOST_PREFIX}-{name}.{namespace}.svc.cluster.local"),
                    port: MARIADB_PORT.to_string(),
                    username: mariadb.username.clone(),
                    db_name: mariadb.db_name.clone(),
                    password,
                    credentials_secret: mariadb.password_secret.clone(),
                    extra_params: BTreeMap::from([("tls".to_string(), tls.to_string())]),
                    password_generated: generated,
                },
            )
        }
    };

    if let Some(raw) = &defaulted.custom_extra_params {
        connection.extra_params = parse_extra_params(raw)?;
    }

    Ok((backend, connection))
}

async fn derive_object_storage(
    defaulted: &DefaultedSpec,
    reader: &dyn ClusterReader,
    name: &str,
    namespace: &str,
) -> Result<(ObjectStorageBackend, ObjectStorageConnection), ParamsError> {
    let (backend, mut connection) = match &defaulted.object_storage {
        ObjectStorageSelection::External(external) => {
            let secret = &external.s3_credentials_secret;
            let access_key =
                retrieve_credential(reader, namespace, &secret.secret_name, &secret.access_key)
                    .await?;
            let secret_key =
                retrieve_credential(reader, namespace, &secret.secret_name, &secret.secret_key)
                    .await?;
            (
                ObjectStorageBackend::External,
                ObjectStorageConnection {
                    host: external.host.clone(),
                    port: external.port.clone().filter(|p| !p.is_empty()),
                    scheme: external.scheme.clone(),
                    region: external
                        .region
                        .clone()
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| EXTERNAL_STORAGE_DEFAULT_REGION.to_string()),
                    base_path: external.base_path.clone().filter(|p| !p.is_empty()),
                    bucket: external.bucket.clone(),
                    secure: external.secure.unwrap_or(external.scheme == "https"),
                    endpoint: String::new(),
                    access_key,
                    secret_key,
                    credentials_secret: secret.clone(),
                    external_route_host: None,
                    credentials_generated: false,
                },
            )
        }
        ObjectStorageSelection::Managed(minio) => {
            let secret = &minio.credentials_secret;
            let (mut values, generated) = retrieve_or_generate_credentials(
                reader,
                namespace,
                &secret.secret_name,
                &[
                    (secret.access_key.as_str(), GENERATED_ACCESS_KEY_LENGTH),
                    (secret.secret_key.as_str(), GENERATED_SECRET_KEY_LENGTH),
                ],
            )
            .await?;
            if generated {
                observability::metrics::increment_credentials_generated("object-store");
            }
            let secret_key = values.remove(1);
            let access_key = values.remove(0);
            (
                ObjectStorageBackend::Managed(minio.clone()),
                ObjectStorageConnection {
                    host: format!("{MINIO_HOST_PREFIX}-{name}.{namespace}.svc.cluster.local"),
                    port: Some(MINIO_PORT.to_string()),
                    scheme: MINIO_SCHEME.to_string(),
                    region: MINIO_REGION.to_string(),
                    base_path: None,
                    bucket: minio.bucket.clone(),
                    secure: false,
                    endpoint: String::new(),
                    access_key,
                    secret_key,
                    credentials_secret: secret.clone(),
                    external_route_host: None,
                    credentials_generated: generated,
                },
            )
        }
    };

    if defaulted.enable_external_route {
        let route_name = format!("{MINIO_HOST_PREFIX}-{name}");
        match reader.get_route_host(namespace, &route_name).await? {
            Some(host) => {
                info!("Using external route {} for object storage", host);
                connection.host = host.clone();
                connection.scheme = "https".to_string();
                connection.secure = true;
                connection.port = None;
                connection.external_route_host = Some(host);
            }
            None => warn!(
                "External route {} not found in namespace {}, using in-cluster endpoint",
                route_name, namespace
            ),
        }
    }

    connection.endpoint = match &connection.port {
        Some(port) => format!("{}://{}:{}", connection.scheme, connection.host, port),
        None => format!("{}://{}", connection.scheme, connection.host),
    };

    Ok((backend, connection))
}
