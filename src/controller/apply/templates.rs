//! # Templates
//!
//! One builder per [`TemplateRef`]. Every builder is a pure function of the resolved
//! parameters, so rendering the same parameters twice yields identical objects.

use super::render::{
    config_map, container, container_port, env, env_from_secret, labels, metadata,
    persistent_volume_claim, route, secret, service, service_account, to_dynamic, volume_mount,
    Workload,
};
use super::{ApplyError, TemplateRef};
use crate::constants::*;
use crate::controller::params::{
    DatabaseBackend, MlmdParams, ObjectStorageBackend, PipelineStore, ResolvedParameters,
    ResolvedResources,
};
use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhook, MutatingWebhookConfiguration, RuleWithOperations, ServiceReference,
    ValidatingWebhook, ValidatingWebhookConfiguration, WebhookClientConfig,
};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, EnvVar, PersistentVolumeClaimVolumeSource, Volume,
};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::DynamicObject;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Render the objects behind `template`
///
/// # Errors
///
/// `Render` when the parameters do not carry the component the template needs.
pub fn render(
    template: TemplateRef,
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    match template {
        TemplateRef::CaBundle => ca_bundle(params, owner),
        TemplateRef::DatabaseSecret => database_secret(params, owner),
        TemplateRef::MariaDb => mariadb(params, owner),
        TemplateRef::ObjectStorageSecret => object_storage_secret(params, owner),
        TemplateRef::Minio => minio(params, owner),
        TemplateRef::MinioRoute => minio_route(params, owner),
        TemplateRef::MlmdEnvoy => mlmd_envoy(params, owner),
        TemplateRef::MlmdEnvoyRoute => mlmd_envoy_route(params, owner),
        TemplateRef::MlmdGrpc => mlmd_grpc(params, owner),
        TemplateRef::MlmdWriter => mlmd_writer(params, owner),
        TemplateRef::ApiServer => api_server(params, owner),
        TemplateRef::ApiServerRoute => api_server_route(params, owner),
        TemplateRef::PersistenceAgent => persistence_agent(params, owner),
        TemplateRef::ScheduledWorkflow => scheduled_workflow(params, owner),
        TemplateRef::WorkflowController => workflow_controller(params, owner),
        TemplateRef::Ui => ui(params, owner),
        TemplateRef::WebhookNamespaced => {
            webhook_namespaced_objects(&params.operator_namespace, &params.webhook_image, owner)
        }
        TemplateRef::WebhookClusterScoped => webhook_cluster_objects(&params.operator_namespace),
    }
}

fn missing(template: TemplateRef, what: &str) -> ApplyError {
    ApplyError::Render {
        template,
        reason: format!("{what} is not deployed"),
    }
}

fn mlmd_params(
    params: &ResolvedParameters,
    template: TemplateRef,
) -> Result<&MlmdParams, ApplyError> {
    params.mlmd.as_ref().ok_or_else(|| missing(template, "MLMD"))
}

fn mlmd_proxy_service_name(params: &ResolvedParameters) -> String {
    format!("{MLMD_PROXY_SERVICE_PREFIX}-{}", params.name)
}

fn api_server_service_name(params: &ResolvedParameters) -> String {
    format!("{DSP_SERVICE_PREFIX}-{}", params.name)
}

fn ca_bundle(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let Some(name) = &params.ca_mount.config_map_name else {
        return Ok(Vec::new());
    };
    let cm = config_map(
        name,
        &params.namespace,
        &labels(name, &params.name),
        owner,
        BTreeMap::from([(params.ca_mount.file_name.clone(), params.trust.combined())]),
    );
    Ok(vec![to_dynamic(&cm, TemplateRef::CaBundle)?])
}

fn database_secret(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::DatabaseSecret;
    let DatabaseBackend::Managed(mariadb) = &params.database_backend else {
        return Err(missing(template, "managed database"));
    };
    let db = &params.database;
    let secret = secret(
        &db.credentials_secret.name,
        &params.namespace,
        &labels(&mariadb.name, &params.name),
        owner,
        &[(db.credentials_secret.key.as_str(), db.password.expose())],
    );
    Ok(vec![to_dynamic(&secret, template)?])
}

fn mariadb(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::MariaDb;
    let DatabaseBackend::Managed(mariadb) = &params.database_backend else {
        return Err(missing(template, "managed database"));
    };
    let ns = params.namespace.as_str();
    let labels = labels(&mariadb.name, &params.name);
    let port: i32 = MARIADB_PORT.parse().unwrap_or(3306);

    let pvc = persistent_volume_claim(
        &mariadb.name,
        ns,
        &labels,
        owner,
        &mariadb.pvc_size,
        mariadb.storage_class_name.as_deref(),
    );
    let svc = service(&mariadb.name, ns, &labels, owner, &[("mysql", port)]);

    let mut main = container("mariadb", &mariadb.image, &mariadb.resources);
    main.ports = Some(vec![container_port("mysql", port)]);
    main.env = Some(vec![
        env("MYSQL_USER", &mariadb.username),
        env_from_secret(
            "MYSQL_PASSWORD",
            &mariadb.password_secret.name,
            &mariadb.password_secret.key,
        ),
        env("MYSQL_DATABASE", &mariadb.db_name),
        env("MYSQL_ALLOW_EMPTY_PASSWORD", "true"),
    ]);
    main.volume_mounts = Some(vec![volume_mount("mariadb-persistent-storage", "/var/lib/mysql")]);

    let deployment = Workload {
        name: &mariadb.name,
        namespace: ns,
        labels: labels.clone(),
        owner,
        containers: vec![main],
        volumes: vec![pvc_volume("mariadb-persistent-storage", &mariadb.name)],
        ..Default::default()
    }
    .into_deployment();

    Ok(vec![
        to_dynamic(&pvc, template)?,
        to_dynamic(&svc, template)?,
        to_dynamic(&deployment, template)?,
    ])
}

fn object_storage_secret(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::ObjectStorageSecret;
    let ObjectStorageBackend::Managed(minio) = &params.object_storage_backend else {
        return Err(missing(template, "managed object storage"));
    };
    let os = &params.object_storage;
    let secret = secret(
        &os.credentials_secret.secret_name,
        &params.namespace,
        &labels(&minio.name, &params.name),
        owner,
        &[
            (os.credentials_secret.access_key.as_str(), os.access_key.expose()),
            (os.credentials_secret.secret_key.as_str(), os.secret_key.expose()),
        ],
    );
    Ok(vec![to_dynamic(&secret, template)?])
}

fn minio(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::Minio;
    let ObjectStorageBackend::Managed(minio) = &params.object_storage_backend else {
        return Err(missing(template, "managed object storage"));
    };
    let ns = params.namespace.as_str();
    let labels = labels(&minio.name, &params.name);
    let port: i32 = MINIO_PORT.parse().unwrap_or(9000);
    let creds = &minio.credentials_secret;

    let pvc = persistent_volume_claim(
        &minio.name,
        ns,
        &labels,
        owner,
        &minio.pvc_size,
        minio.storage_class_name.as_deref(),
    );
    let svc = service(&minio.name, ns, &labels, owner, &[("http", port)]);

    let mut main = container("minio", &minio.image, &minio.resources);
    main.args = Some(vec!["server".to_string(), "/data".to_string()]);
    main.ports = Some(vec![container_port("http", port)]);
    main.env = Some(vec![
        env_from_secret("MINIO_ACCESS_KEY", &creds.secret_name, &creds.access_key),
        env_from_secret("MINIO_SECRET_KEY", &creds.secret_name, &creds.secret_key),
    ]);
    main.volume_mounts = Some(vec![volume_mount("data", "/data")]);

    let deployment = Workload {
        name: &minio.name,
        namespace: ns,
        labels: labels.clone(),
        owner,
        containers: vec![main],
        volumes: vec![pvc_volume("data", &minio.name)],
        ..Default::default()
    }
    .into_deployment();

    Ok(vec![
        to_dynamic(&pvc, template)?,
        to_dynamic(&svc, template)?,
        to_dynamic(&deployment, template)?,
    ])
}

fn minio_route(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::MinioRoute;
    let ObjectStorageBackend::Managed(minio) = &params.object_storage_backend else {
        return Err(missing(template, "managed object storage"));
    };
    Ok(vec![route(
        &minio.name,
        &params.namespace,
        &labels(&minio.name, &params.name),
        owner,
        &minio.name,
        "http",
        "edge",
        template,
    )?])
}

fn mlmd_envoy(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::MlmdEnvoy;
    let mlmd = mlmd_params(params, template)?;
    let ns = params.namespace.as_str();
    let labels = labels(&mlmd.envoy.name, &params.name);
    let service_name = mlmd_proxy_service_name(params);

    let mut main = container("container", &mlmd.envoy.image, &mlmd.envoy.resources);
    main.ports = Some(vec![container_port("md-envoy", MLMD_ENVOY_HTTPS_PORT)]);
    main.env = Some(vec![
        env("METADATA_GRPC_SERVICE_SERVICE_HOST", &mlmd.grpc.name),
        env("METADATA_GRPC_SERVICE_SERVICE_PORT", &mlmd.grpc_port),
    ]);

    let svc = service(
        &service_name,
        ns,
        &labels,
        owner,
        &[("md-envoy", MLMD_ENVOY_HTTPS_PORT)],
    );
    let deployment = Workload {
        name: &mlmd.envoy.name,
        namespace: ns,
        labels: labels.clone(),
        owner,
        containers: vec![main],
        ..Default::default()
    }
    .into_deployment();

    Ok(vec![to_dynamic(&svc, template)?, to_dynamic(&deployment, template)?])
}

fn mlmd_envoy_route(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::MlmdEnvoyRoute;
    let mlmd = mlmd_params(params, template)?;
    let service_name = mlmd_proxy_service_name(params);
    Ok(vec![route(
        &service_name,
        &params.namespace,
        &labels(&mlmd.envoy.name, &params.name),
        owner,
        &service_name,
        "md-envoy",
        "reencrypt",
        template,
    )?])
}

fn database_env(params: &ResolvedParameters) -> Vec<EnvVar> {
    let db = &params.database;
    vec![
        env("DBCONFIG_USER", &db.username),
        env_from_secret(
            "DBCONFIG_PASSWORD",
            &db.credentials_secret.name,
            &db.credentials_secret.key,
        ),
        env("DBCONFIG_DBNAME", &db.db_name),
        env("DBCONFIG_HOST", &db.host),
        env("DBCONFIG_PORT", &db.port),
        env("DBCONFIG_EXTRAPARAMS", db.extra_params_json()),
    ]
}

fn mlmd_grpc(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::MlmdGrpc;
    let mlmd = mlmd_params(params, template)?;
    let ns = params.namespace.as_str();
    let labels = labels(&mlmd.grpc.name, &params.name);
    let port: i32 = mlmd.grpc_port.parse().map_err(|_| ApplyError::Render {
        template,
        reason: format!("invalid MLMD gRPC port \"{}\"", mlmd.grpc_port),
    })?;

    let mut main = container("container", &mlmd.grpc.image, &mlmd.grpc.resources);
    main.args = Some(vec![
        format!("--grpc_port={port}"),
        "--mysql_config_database=$(DBCONFIG_DBNAME)".to_string(),
        "--mysql_config_host=$(DBCONFIG_HOST)".to_string(),
        "--mysql_config_port=$(DBCONFIG_PORT)".to_string(),
        "--mysql_config_user=$(DBCONFIG_USER)".to_string(),
        "--mysql_config_password=$(DBCONFIG_PASSWORD)".to_string(),
        "--enable_database_upgrade=true".to_string(),
    ]);
    main.ports = Some(vec![container_port("grpc-api", port)]);
    main.env = Some(database_env(params));

    let sa = service_account(&mlmd.grpc.name, ns, &labels, owner);
    let svc = service(&mlmd.grpc.name, ns, &labels, owner, &[("grpc-api", port)]);
    let deployment = Workload {
        name: &mlmd.grpc.name,
        namespace: ns,
        labels: labels.clone(),
        owner,
        service_account: Some(&mlmd.grpc.name),
        containers: vec![main],
        ..Default::default()
    }
    .into_deployment();

    Ok(vec![
        to_dynamic(&sa, template)?,
        to_dynamic(&svc, template)?,
        to_dynamic(&deployment, template)?,
    ])
}

fn mlmd_writer(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::MlmdWriter;
    let mlmd = mlmd_params(params, template)?;
    let writer = mlmd
        .writer
        .as_ref()
        .ok_or_else(|| missing(template, "MLMD writer"))?;
    let ns = params.namespace.as_str();
    let labels = labels(&writer.name, &params.name);

    let mut main = container("main", &writer.image, &writer.resources);
    main.env = Some(vec![
        env("NAMESPACE_TO_WATCH", ns),
        env("PIPELINE_RUNTIME", "tekton"),
        env("ARCHIVE_LOGS", "false"),
        env("METADATA_GRPC_SERVICE_SERVICE_HOST", &mlmd.grpc.name),
        env("METADATA_GRPC_SERVICE_SERVICE_PORT", &mlmd.grpc_port),
    ]);

    let sa = service_account(&writer.name, ns, &labels, owner);
    let deployment = Workload {
        name: &writer.name,
        namespace: ns,
        labels: labels.clone(),
        owner,
        service_account: Some(&writer.name),
        containers: vec![main],
        ..Default::default()
    }
    .into_deployment();

    Ok(vec![to_dynamic(&sa, template)?, to_dynamic(&deployment, template)?])
}

/// JSON consumed by the API server when loading the sample pipeline
fn sample_config(params: &ResolvedParameters) -> String {
    serde_json::json!([{
        "name": "[Demo] iris-training",
        "description": "[source code](https://github.com/opendatahub-io/data-science-pipelines/tree/master/samples/iris-sklearn) A simple pipeline to demonstrate a basic ML Training workflow",
        "file": "/samples/iris-pipeline-compiled.yaml",
        "dspVersion": params.dsp_version.as_str(),
    }])
    .to_string()
}

/// Hex SHA-256, used to roll the API server when its mounted config changes
pub fn config_hash(contents: &str) -> String {
    let digest = Sha256::digest(contents.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn server_config(params: &ResolvedParameters) -> String {
    serde_json::json!({
        "DBConfig": {
            "MySQLConfig": {
                "ExtraParams": params.database.extra_params,
                "GroupConcatMaxLen": "4194304",
            },
            "ConMaxLifeTime": "120s",
        },
        "ObjectStoreConfig": {"PipelinePath": "pipelines"},
        "DBDriverName": "mysql",
        "ARCHIVE_CONFIG_LOG_FILE_NAME": "main.log",
        "ARCHIVE_CONFIG_LOG_PATH_PREFIX": "/artifacts",
        "InitConnectionTimeout": "6m",
    })
    .to_string()
}

fn launcher_config(params: &ResolvedParameters) -> BTreeMap<String, String> {
    if let Some(custom) = &params.custom_kfp_launcher_config {
        if let Ok(data) = serde_json::from_str::<BTreeMap<String, String>>(custom) {
            return data;
        }
    }
    let scheme = match params.object_storage_backend {
        ObjectStorageBackend::Managed(_) => "minio",
        ObjectStorageBackend::External => "s3",
    };
    BTreeMap::from([(
        "defaultPipelineRoot".to_string(),
        format!("{scheme}://{}", params.object_storage.bucket),
    )])
}

fn object_storage_env(params: &ResolvedParameters) -> Vec<EnvVar> {
    let os = &params.object_storage;
    let creds = &os.credentials_secret;
    let mut vars = vec![
        env("OBJECTSTORECONFIG_HOST", &os.host),
        env("OBJECTSTORECONFIG_SCHEME", &os.scheme),
        env("OBJECTSTORECONFIG_REGION", &os.region),
        env("OBJECTSTORECONFIG_BUCKETNAME", &os.bucket),
        env("OBJECTSTORECONFIG_SECURE", os.secure.to_string()),
        env_from_secret("OBJECTSTORECONFIG_ACCESSKEY", &creds.secret_name, &creds.access_key),
        env_from_secret("OBJECTSTORECONFIG_SECRETACCESSKEY", &creds.secret_name, &creds.secret_key),
    ];
    if let Some(port) = &os.port {
        vars.push(env("OBJECTSTORECONFIG_PORT", port));
    }
    if let Some(base_path) = &os.base_path {
        vars.push(env("OBJECTSTORECONFIG_BASEPATH", base_path));
    }
    vars
}

fn api_server(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::ApiServer;
    let api = params
        .api_server
        .as_ref()
        .ok_or_else(|| missing(template, "API server"))?;
    let ns = params.namespace.as_str();
    let labels = labels(&api.name, &params.name);
    let mut objects = Vec::new();

    objects.push(to_dynamic(&service_account(&api.name, ns, &labels, owner), template)?);
    objects.push(to_dynamic(
        &service(
            &api.name,
            ns,
            &labels,
            owner,
            &[
                ("oauth", API_SERVER_HTTPS_PORT),
                ("http", API_SERVER_HTTP_PORT),
                ("grpc", API_SERVER_GRPC_PORT),
            ],
        ),
        template,
    )?);

    // A user-supplied server config is mounted as-is
    let default_server_config = format!("{CUSTOM_SERVER_CONFIGMAP_PREFIX}{}", params.name);
    if api.custom_server_config.name == default_server_config {
        objects.push(to_dynamic(
            &config_map(
                &default_server_config,
                ns,
                &labels,
                owner,
                BTreeMap::from([(CUSTOM_SERVER_CONFIGMAP_KEY.to_string(), server_config(params))]),
            ),
            template,
        )?);
    }

    objects.push(to_dynamic(
        &config_map(KFP_LAUNCHER_CONFIGMAP, ns, &labels, owner, launcher_config(params)),
        template,
    )?);

    let mut pod_annotations = BTreeMap::new();
    let mut volumes = vec![config_map_volume(
        "server-config",
        &api.custom_server_config.name,
    )];
    let mut mounts = vec![volume_mount("server-config", "/config/config.json")];
    if let Some(mount) = mounts.last_mut() {
        mount.sub_path = Some(api.custom_server_config.key.clone());
    }

    if api.enable_sample_pipeline {
        let sample_name = format!("{SAMPLE_CONFIGMAP_PREFIX}{}", params.name);
        let contents = sample_config(params);
        pod_annotations.insert(SAMPLE_CONFIG_HASH_ANNOTATION.to_string(), config_hash(&contents));
        objects.push(to_dynamic(
            &config_map(
                &sample_name,
                ns,
                &labels,
                owner,
                BTreeMap::from([("sample_config.json".to_string(), contents)]),
            ),
            template,
        )?);
        volumes.push(config_map_volume("sample-config", &sample_name));
        mounts.push(volume_mount("sample-config", "/config/sample_config.json"));
        if let Some(mount) = mounts.last_mut() {
            mount.sub_path = Some("sample_config.json".to_string());
        }
    }

    let mut vars = vec![
        env("POD_NAMESPACE", ns),
        env("DSPA_VERSION", params.dsp_version.as_str()),
        env("V2_LAUNCHER_IMAGE", &api.argo_launcher_image),
        env("V2_DRIVER_IMAGE", &api.argo_driver_image),
        env("ML_PIPELINE_SERVICE_HOST", params.api_server_service_dns()),
        env("ML_PIPELINE_SERVICE_PORT_GRPC", API_SERVER_GRPC_PORT.to_string()),
        env(
            "SIGNED_URL_EXPIRY_TIME_SECONDS",
            api.artifact_signed_url_expiry_seconds.to_string(),
        ),
        env("CACHEENABLED", api.cache_enabled.to_string()),
        env(
            "PIPELINESTORE",
            match api.pipeline_store {
                PipelineStore::Database => PIPELINE_STORE_DATABASE,
                PipelineStore::Kubernetes => PIPELINE_STORE_KUBERNETES,
            },
        ),
        env("SAMPLE_PIPELINE_ENABLED", api.enable_sample_pipeline.to_string()),
    ];
    vars.extend(database_env(params));
    vars.extend(object_storage_env(params));

    if let (Some(ca_config_map), Some(ssl_cert_dir)) =
        (&params.ca_mount.config_map_name, &params.ca_mount.ssl_cert_dir)
    {
        vars.push(env("SSL_CERT_DIR", ssl_cert_dir));
        vars.push(env("ARTIFACT_COPY_STEP_CABUNDLE_CONFIGMAP_NAME", ca_config_map));
        vars.push(env("ARTIFACT_COPY_STEP_CABUNDLE_CONFIGMAP_KEY", &params.ca_mount.file_name));
        vars.push(env(
            "ARTIFACT_COPY_STEP_CABUNDLE_MOUNTPATH",
            &params.ca_mount.root_mount_path,
        ));
        volumes.push(config_map_volume("ca-bundle", ca_config_map));
        mounts.push(volume_mount("ca-bundle", &params.ca_mount.root_mount_path));
    }

    let mut main = container("ds-pipeline-api-server", &api.image, &api.resources);
    main.ports = Some(vec![
        container_port("http", API_SERVER_HTTP_PORT),
        container_port("grpc", API_SERVER_GRPC_PORT),
    ]);
    main.env = Some(vars);
    main.volume_mounts = Some(mounts);

    let mut containers = vec![main];
    if api.enable_route {
        let mut proxy = container("oauth-proxy", &api.oauth_proxy_image, &api.resources);
        proxy.args = Some(vec![
            format!("--https-address=:{API_SERVER_HTTPS_PORT}"),
            "--provider=openshift".to_string(),
            format!("--openshift-service-account={}", api.name),
            format!("--upstream=http://localhost:{API_SERVER_HTTP_PORT}"),
            "--tls-cert=/etc/tls/private/tls.crt".to_string(),
            "--tls-key=/etc/tls/private/tls.key".to_string(),
        ]);
        proxy.ports = Some(vec![container_port("oauth", API_SERVER_HTTPS_PORT)]);
        containers.push(proxy);
    }

    let deployment = Workload {
        name: &api.name,
        namespace: ns,
        labels: labels.clone(),
        owner,
        service_account: Some(&api.name),
        containers,
        volumes,
        pod_annotations,
    }
    .into_deployment();
    objects.push(to_dynamic(&deployment, template)?);

    Ok(objects)
}

fn api_server_route(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::ApiServerRoute;
    let api = params
        .api_server
        .as_ref()
        .ok_or_else(|| missing(template, "API server"))?;
    let service_name = api_server_service_name(params);
    Ok(vec![route(
        &service_name,
        &params.namespace,
        &labels(&api.name, &params.name),
        owner,
        &service_name,
        "oauth",
        "reencrypt",
        template,
    )?])
}

fn persistence_agent(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::PersistenceAgent;
    let agent = params
        .persistence_agent
        .as_ref()
        .ok_or_else(|| missing(template, "persistence agent"))?;
    let ns = params.namespace.as_str();
    let labels = labels(&agent.name, &params.name);

    let mut main = container("ds-pipeline-persistenceagent", &agent.image, &agent.resources);
    main.env = Some(vec![
        env("NAMESPACE", ns),
        env("NUM_WORKERS", agent.num_workers.to_string()),
        env("TTL_SECONDS_AFTER_WORKFLOW_FINISH", "86400"),
        env("ML_PIPELINE_SERVICE_HOST", params.api_server_service_dns()),
        env("ML_PIPELINE_SERVICE_PORT_GRPC", API_SERVER_GRPC_PORT.to_string()),
    ]);

    let sa = service_account(&agent.name, ns, &labels, owner);
    let deployment = Workload {
        name: &agent.name,
        namespace: ns,
        labels: labels.clone(),
        owner,
        service_account: Some(&agent.name),
        containers: vec![main],
        ..Default::default()
    }
    .into_deployment();

    Ok(vec![to_dynamic(&sa, template)?, to_dynamic(&deployment, template)?])
}

fn scheduled_workflow(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::ScheduledWorkflow;
    let swf = params
        .scheduled_workflow
        .as_ref()
        .ok_or_else(|| missing(template, "scheduled workflow"))?;
    let ns = params.namespace.as_str();
    let labels = labels(&swf.name, &params.name);

    let mut main = container("ds-pipeline-scheduledworkflow", &swf.image, &swf.resources);
    main.env = Some(vec![
        env("NAMESPACE", ns),
        env("CRON_SCHEDULE_TIMEZONE", &swf.cron_schedule_timezone),
    ]);

    let sa = service_account(&swf.name, ns, &labels, owner);
    let deployment = Workload {
        name: &swf.name,
        namespace: ns,
        labels: labels.clone(),
        owner,
        service_account: Some(&swf.name),
        containers: vec![main],
        ..Default::default()
    }
    .into_deployment();

    Ok(vec![to_dynamic(&sa, template)?, to_dynamic(&deployment, template)?])
}

fn workflow_controller(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::WorkflowController;
    let wc = params
        .workflow_controller
        .as_ref()
        .ok_or_else(|| missing(template, "workflow controller"))?;
    let ns = params.namespace.as_str();
    let labels = labels(&wc.name, &params.name);
    let mut objects = Vec::new();

    let config_name = match &wc.custom_config {
        Some(custom) => custom.clone(),
        None => {
            let executor = serde_json::json!({
                "imagePullPolicy": "IfNotPresent",
                "image": wc.argo_exec_image,
            });
            objects.push(to_dynamic(
                &config_map(
                    &wc.name,
                    ns,
                    &labels,
                    owner,
                    BTreeMap::from([
                        ("executor".to_string(), executor.to_string()),
                        ("namespace".to_string(), ns.to_string()),
                    ]),
                ),
                template,
            )?);
            wc.name.clone()
        }
    };

    let mut main = container("ds-pipeline-workflow-controller", &wc.image, &wc.resources);
    main.args = Some(vec![
        "--configmap".to_string(),
        config_name,
        "--executor-image".to_string(),
        wc.argo_exec_image.clone(),
        "--namespaced".to_string(),
    ]);
    main.env = Some(vec![env("LEADER_ELECTION_IDENTITY", &wc.name)]);

    objects.push(to_dynamic(&service_account(&wc.name, ns, &labels, owner), template)?);
    let deployment = Workload {
        name: &wc.name,
        namespace: ns,
        labels: labels.clone(),
        owner,
        service_account: Some(&wc.name),
        containers: vec![main],
        ..Default::default()
    }
    .into_deployment();
    objects.push(to_dynamic(&deployment, template)?);

    Ok(objects)
}

fn ui(
    params: &ResolvedParameters,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::Ui;
    let ui = params.ui.as_ref().ok_or_else(|| missing(template, "UI"))?;
    let ns = params.namespace.as_str();
    let labels = labels(&ui.name, &params.name);
    let os = &params.object_storage;
    let creds = &os.credentials_secret;

    let mut vars = vec![
        env("ML_PIPELINE_SERVICE_HOST", params.api_server_service_dns()),
        env("ML_PIPELINE_SERVICE_PORT", API_SERVER_HTTP_PORT.to_string()),
        env("MINIO_HOST", &os.host),
        env("MINIO_NAMESPACE", ns),
        env("ALLOW_CUSTOM_VISUALIZATIONS", "true"),
        env_from_secret("MINIO_ACCESS_KEY", &creds.secret_name, &creds.access_key),
        env_from_secret("MINIO_SECRET_KEY", &creds.secret_name, &creds.secret_key),
    ];
    if let Some(port) = &os.port {
        vars.push(env("MINIO_PORT", port));
    }
    if params.mlmd.is_some() {
        vars.push(env("METADATA_ENVOY_SERVICE_SERVICE_HOST", mlmd_proxy_service_name(params)));
        vars.push(env(
            "METADATA_ENVOY_SERVICE_SERVICE_PORT",
            MLMD_ENVOY_HTTPS_PORT.to_string(),
        ));
    }

    let mut main = container("ds-pipeline-ui", &ui.image, &ui.resources);
    main.ports = Some(vec![container_port("http", UI_PORT)]);
    main.env = Some(vars);

    let mut volumes = Vec::new();
    if let Some(config_map_name) = &ui.config_map_name {
        volumes.push(config_map_volume("config-volume", config_map_name));
        main.volume_mounts = Some(vec![volume_mount("config-volume", "/etc/config")]);
    }

    let sa = service_account(&ui.name, ns, &labels, owner);
    let svc = service(&ui.name, ns, &labels, owner, &[("http", UI_PORT)]);
    let deployment = Workload {
        name: &ui.name,
        namespace: ns,
        labels: labels.clone(),
        owner,
        service_account: Some(&ui.name),
        containers: vec![main],
        volumes,
        ..Default::default()
    }
    .into_deployment();

    Ok(vec![
        to_dynamic(&sa, template)?,
        to_dynamic(&svc, template)?,
        to_dynamic(&deployment, template)?,
    ])
}

fn webhook_labels() -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_APP.to_string(), WEBHOOK_NAME.to_string()),
        (LABEL_COMPONENT.to_string(), COMPONENT_LABEL_VALUE.to_string()),
    ])
}

/// Webhook workload, owned by the operator's own Deployment
///
/// One copy serves every instance, so nothing here comes from a single resource:
/// the image is operator configuration and the resources are fixed.
pub fn webhook_namespaced_objects(
    operator_namespace: &str,
    image: &str,
    owner: Option<&OwnerReference>,
) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::WebhookNamespaced;
    let ns = operator_namespace;
    let labels = webhook_labels();
    let tls_secret = format!("{WEBHOOK_NAME}-tls");

    let mut svc = service(WEBHOOK_NAME, ns, &labels, owner, &[("webhook", WEBHOOK_PORT)]);
    svc.metadata.annotations = Some(BTreeMap::from([(
        "service.beta.openshift.io/serving-cert-secret-name".to_string(),
        tls_secret.clone(),
    )]));

    let mut main = container("webhook", image, &webhook_resources());
    main.command = Some(vec!["/bin/webhook".to_string()]);
    main.args = Some(vec![
        "--tlsCertPath=/etc/webhook/certs/tls.crt".to_string(),
        "--tlsKeyPath=/etc/webhook/certs/tls.key".to_string(),
    ]);
    main.ports = Some(vec![container_port("webhook", WEBHOOK_PORT)]);
    main.volume_mounts = Some(vec![volume_mount("webhook-certs", "/etc/webhook/certs")]);

    let deployment = Workload {
        name: WEBHOOK_NAME,
        namespace: ns,
        labels: labels.clone(),
        owner,
        service_account: Some(WEBHOOK_NAME),
        containers: vec![main],
        volumes: vec![Volume {
            name: "webhook-certs".to_string(),
            secret: Some(k8s_openapi::api::core::v1::SecretVolumeSource {
                secret_name: Some(tls_secret),
                ..Default::default()
            }),
            ..Default::default()
        }],
        ..Default::default()
    }
    .into_deployment();

    Ok(vec![
        to_dynamic(&service_account(WEBHOOK_NAME, ns, &labels, owner), template)?,
        to_dynamic(&svc, template)?,
        to_dynamic(&deployment, template)?,
    ])
}

fn webhook_resources() -> ResolvedResources {
    ResolvedResources {
        requests_cpu: WEBHOOK_REQUESTS_CPU.to_string(),
        requests_memory: WEBHOOK_REQUESTS_MEMORY.to_string(),
        limits_cpu: WEBHOOK_LIMITS_CPU.to_string(),
        limits_memory: WEBHOOK_LIMITS_MEMORY.to_string(),
    }
}

fn pipelineversion_rule() -> RuleWithOperations {
    RuleWithOperations {
        api_groups: Some(vec!["pipelines.kubeflow.org".to_string()]),
        api_versions: Some(vec!["v2beta1".to_string()]),
        operations: Some(vec!["CREATE".to_string(), "UPDATE".to_string()]),
        resources: Some(vec!["pipelineversions".to_string()]),
        scope: Some("Namespaced".to_string()),
    }
}

fn webhook_client(operator_namespace: &str, path: &str) -> WebhookClientConfig {
    WebhookClientConfig {
        service: Some(ServiceReference {
            name: WEBHOOK_NAME.to_string(),
            namespace: operator_namespace.to_string(),
            path: Some(path.to_string()),
            port: Some(WEBHOOK_PORT),
        }),
        ..Default::default()
    }
}

/// Cluster-scoped webhook objects
///
/// These never carry an owner reference and depend only on the operator namespace,
/// so teardown can render them without a full parameter set.
pub fn webhook_cluster_objects(operator_namespace: &str) -> Result<Vec<DynamicObject>, ApplyError> {
    let template = TemplateRef::WebhookClusterScoped;
    let labels = webhook_labels();
    let inject_ca = BTreeMap::from([(
        "service.beta.openshift.io/inject-cabundle".to_string(),
        "true".to_string(),
    )]);

    let role = ClusterRole {
        metadata: metadata(WEBHOOK_NAME, None, &labels, None),
        rules: Some(vec![PolicyRule {
            api_groups: Some(vec!["pipelines.kubeflow.org".to_string()]),
            resources: Some(vec!["pipelines".to_string(), "pipelineversions".to_string()]),
            verbs: vec!["get".to_string(), "list".to_string(), "watch".to_string()],
            ..Default::default()
        }]),
        ..Default::default()
    };
    let binding = ClusterRoleBinding {
        metadata: metadata(WEBHOOK_NAME, None, &labels, None),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: WEBHOOK_NAME.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: WEBHOOK_NAME.to_string(),
            namespace: Some(operator_namespace.to_string()),
            ..Default::default()
        }]),
    };

    let mut mutating_meta = metadata(WEBHOOK_CONFIGURATION_NAME, None, &labels, None);
    mutating_meta.annotations = Some(inject_ca.clone());
    let mutating = MutatingWebhookConfiguration {
        metadata: mutating_meta,
        webhooks: Some(vec![MutatingWebhook {
            name: WEBHOOK_CONFIGURATION_NAME.to_string(),
            admission_review_versions: vec!["v1".to_string()],
            client_config: webhook_client(operator_namespace, "/webhooks/mutate-pipelineversions"),
            rules: Some(vec![pipelineversion_rule()]),
            side_effects: "None".to_string(),
            failure_policy: Some("Fail".to_string()),
            ..Default::default()
        }]),
    };

    let mut validating_meta = metadata(WEBHOOK_CONFIGURATION_NAME, None, &labels, None);
    validating_meta.annotations = Some(inject_ca);
    let validating = ValidatingWebhookConfiguration {
        metadata: validating_meta,
        webhooks: Some(vec![ValidatingWebhook {
            name: WEBHOOK_CONFIGURATION_NAME.to_string(),
            admission_review_versions: vec!["v1".to_string()],
            client_config: webhook_client(operator_namespace, "/webhooks/validate-pipelineversion"),
            rules: Some(vec![pipelineversion_rule()]),
            side_effects: "None".to_string(),
            failure_policy: Some("Fail".to_string()),
            ..Default::default()
        }]),
    };

    Ok(vec![
        to_dynamic(&role, template)?,
        to_dynamic(&binding, template)?,
        to_dynamic(&mutating, template)?,
        to_dynamic(&validating, template)?,
    ])
}

fn pvc_volume(name: &str, claim: &str) -> Volume {
    Volume {
        name: name.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: claim.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn config_map_volume(name: &str, config_map: &str) -> Volume {
    Volume {
        name: name.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}
