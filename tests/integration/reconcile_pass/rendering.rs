//! Rendered object content that depends on derived parameters.

use super::fakes::*;
use kube::api::DynamicObject;
use pipelines_application_controller::constants::*;
use pipelines_application_controller::controller::errors::ErrorClass;
use pipelines_application_controller::controller::probes::Probes;
use pipelines_application_controller::crd::{ApiServer, CaBundle};
use serde_json::Value;

const API_SERVER_DEPLOYMENT: &str = "Deployment/team-a/ds-pipeline-sample";

fn env_value(deployment: &DynamicObject, name: &str) -> Option<String> {
    deployment.data["spec"]["template"]["spec"]["containers"][0]["env"]
        .as_array()?
        .iter()
        .find(|e| e["name"] == name)
        .and_then(|e| e["value"].as_str())
        .map(str::to_string)
}

#[tokio::test]
async fn test_namespaced_objects_are_owned_by_the_instance() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;

    let applied = cluster.applied();
    let owners = applied[API_SERVER_DEPLOYMENT]
        .metadata
        .owner_references
        .clone()
        .unwrap_or_default();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].kind, "DataSciencePipelinesApplication");
    assert_eq!(owners[0].uid, "uid-team-a-sample");
    assert_eq!(owners[0].controller, Some(true));
}

#[tokio::test]
async fn test_owner_references_can_be_disabled() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());
    let config = pipelines_application_controller::config::ControllerConfig {
        include_owner_reference: false,
        ..config()
    };

    pass_with(&cluster, &mut dspa, &Probes::fixed(Ok(()), Ok(())), &config).await;

    assert!(cluster
        .applied()
        .values()
        .all(|o| o.metadata.owner_references.is_none()));
}

#[tokio::test]
async fn test_objects_carry_managed_by_label() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;

    for (key, object) in cluster.applied() {
        let labels = object.metadata.labels.clone().unwrap_or_default();
        assert_eq!(
            labels.get(LABEL_MANAGED_BY).map(String::as_str),
            Some(FIELD_MANAGER),
            "{key}"
        );
    }
}

#[tokio::test]
async fn test_default_launcher_config_points_at_managed_bucket() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;

    let applied = cluster.applied();
    let launcher = &applied[&format!("ConfigMap/team-a/{KFP_LAUNCHER_CONFIGMAP}")];
    assert_eq!(launcher.data["data"]["defaultPipelineRoot"], "minio://mlpipeline");
}

#[tokio::test]
async fn test_custom_launcher_config_replaces_generated_one() {
    let cluster = FakeCluster::new().with_config_map(
        NAMESPACE,
        "my-launcher",
        &[("defaultPipelineRoot", "s3://custom-root"), ("providers", "{}")],
    );
    let mut spec = minimal_spec();
    spec.api_server = Some(ApiServer {
        custom_kfp_launcher_config_map: Some("my-launcher".to_string()),
        ..Default::default()
    });
    let mut dspa = application(spec);

    pass(&cluster, &mut dspa).await;

    let applied = cluster.applied();
    let launcher = &applied[&format!("ConfigMap/team-a/{KFP_LAUNCHER_CONFIGMAP}")];
    assert_eq!(launcher.data["data"]["defaultPipelineRoot"], "s3://custom-root");
    assert_eq!(launcher.data["data"]["providers"], "{}");
}

#[tokio::test]
async fn test_missing_custom_launcher_config_fails_the_pass() {
    let cluster = FakeCluster::new();
    let mut spec = minimal_spec();
    spec.api_server = Some(ApiServer {
        custom_kfp_launcher_config_map: Some("my-launcher".to_string()),
        ..Default::default()
    });
    let mut dspa = application(spec);

    let outcome = pass(&cluster, &mut dspa).await;

    assert_eq!(
        outcome.error.as_ref().map(|e| e.class()),
        Some(ErrorClass::MissingDependency)
    );
    assert!(condition(&outcome, CR_READY)
        .message
        .as_deref()
        .unwrap_or_default()
        .contains("my-launcher"));
}

#[tokio::test]
async fn test_sample_pipeline_rolls_out_with_config_hash() {
    let cluster = FakeCluster::new();
    let mut spec = minimal_spec();
    spec.api_server = Some(ApiServer {
        enable_sample_pipeline: Some(true),
        ..Default::default()
    });
    let mut dspa = application(spec);

    pass(&cluster, &mut dspa).await;

    let applied = cluster.applied();
    assert!(applied.contains_key(&format!("ConfigMap/team-a/{SAMPLE_CONFIGMAP_PREFIX}sample")));
    let hash = &applied[API_SERVER_DEPLOYMENT].data["spec"]["template"]["metadata"]["annotations"]
        [SAMPLE_CONFIG_HASH_ANNOTATION];
    assert!(matches!(hash, Value::String(h) if h.len() == 64));
    assert_eq!(
        env_value(&applied[API_SERVER_DEPLOYMENT], "SAMPLE_PIPELINE_ENABLED").as_deref(),
        Some("true")
    );
}

#[tokio::test]
async fn test_ca_bundle_mounted_into_api_server() {
    let cluster = FakeCluster::new().with_config_map(NAMESPACE, "user-ca", &[("ca.crt", "USER")]);
    let mut spec = minimal_spec();
    spec.api_server = Some(ApiServer {
        ca_bundle: Some(CaBundle {
            config_map_name: "user-ca".to_string(),
            config_map_key: "ca.crt".to_string(),
        }),
        ..Default::default()
    });
    let mut dspa = application(spec);

    pass(&cluster, &mut dspa).await;

    let applied = cluster.applied();
    let deployment = &applied[API_SERVER_DEPLOYMENT];
    assert_eq!(
        env_value(deployment, "SSL_CERT_DIR").as_deref(),
        Some("/dsp-custom-certs:/etc/ssl/certs:/etc/pki/tls/certs")
    );
    assert_eq!(
        env_value(deployment, "ARTIFACT_COPY_STEP_CABUNDLE_CONFIGMAP_NAME").as_deref(),
        Some("dsp-trusted-ca-sample")
    );
}

#[tokio::test]
async fn test_database_env_references_credentials_secret() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;

    let applied = cluster.applied();
    let env = applied[API_SERVER_DEPLOYMENT].data["spec"]["template"]["spec"]["containers"][0]
        ["env"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    let password = env
        .iter()
        .find(|e| e["name"] == "DBCONFIG_PASSWORD")
        .expect("password env var");
    assert!(password.get("value").is_none());
    assert_eq!(
        password["valueFrom"]["secretKeyRef"]["name"],
        "ds-pipeline-db-sample"
    );
}
