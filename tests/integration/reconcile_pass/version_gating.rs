//! DSP version gating and configuration errors.

use super::fakes::*;
use pipelines_application_controller::constants::*;
use pipelines_application_controller::controller::errors::ErrorClass;
use pipelines_application_controller::crd::{Mlmd, ObjectStorage};

#[tokio::test]
async fn test_v2_without_mlmd_is_a_configuration_error() {
    let cluster = FakeCluster::new();
    let mut spec = minimal_spec();
    spec.mlmd = None;
    let mut dspa = application(spec);

    let outcome = pass(&cluster, &mut dspa).await;

    let error = outcome.error.as_ref().expect("pass must fail");
    assert_eq!(error.class(), ErrorClass::Configuration);
    let ready = condition(&outcome, CR_READY);
    assert_eq!(ready.reason.as_deref(), Some(REASON_CONFIGURATION_ERROR));
    assert!(ready.message.as_deref().unwrap_or_default().contains("MLMD"));
    // Component conditions stay unevaluated
    assert_eq!(condition(&outcome, API_SERVER_READY).status, "Unknown");
    assert!(cluster.applied().is_empty());
}

#[tokio::test]
async fn test_v1_without_mlmd_reports_not_applicable() {
    let cluster = FakeCluster::new();
    let mut spec = minimal_spec();
    spec.dsp_version = Some(DSP_VERSION_V1.to_string());
    spec.mlmd = None;
    let mut dspa = application(spec);

    let outcome = pass(&cluster, &mut dspa).await;

    assert!(outcome.error.is_none());
    let mlmd = condition(&outcome, MLMD_PROXY_READY);
    assert_eq!(mlmd.status, "False");
    assert_eq!(mlmd.reason.as_deref(), Some(REASON_NOT_APPLICABLE));
    assert!(!cluster
        .applied_keys()
        .iter()
        .any(|k| k.contains("metadata-envoy")));
}

#[tokio::test]
async fn test_v1_mlmd_deploys_writer() {
    let cluster = FakeCluster::new();
    let mut spec = minimal_spec();
    spec.dsp_version = Some(DSP_VERSION_V1.to_string());
    spec.mlmd = Some(Mlmd {
        deploy: Some(true),
        ..Default::default()
    });
    let mut dspa = application(spec);

    pass(&cluster, &mut dspa).await;

    assert!(cluster
        .applied_keys()
        .contains(&"Deployment/team-a/ds-pipeline-metadata-writer-sample".to_string()));
}

#[tokio::test]
async fn test_v2_mlmd_has_no_writer() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;

    let keys = cluster.applied_keys();
    assert!(keys.contains(&"Deployment/team-a/ds-pipeline-metadata-envoy-sample".to_string()));
    assert!(keys.contains(&"Deployment/team-a/ds-pipeline-metadata-grpc-sample".to_string()));
    assert!(!keys.iter().any(|k| k.contains("metadata-writer")));
}

#[tokio::test]
async fn test_unsupported_version() {
    let cluster = FakeCluster::new();
    let mut spec = minimal_spec();
    spec.dsp_version = Some("v3".to_string());
    let mut dspa = application(spec);

    let outcome = pass(&cluster, &mut dspa).await;

    let ready = condition(&outcome, CR_READY);
    assert_eq!(ready.reason.as_deref(), Some(REASON_CONFIGURATION_ERROR));
    assert!(ready.message.as_deref().unwrap_or_default().contains("v3"));
}

#[tokio::test]
async fn test_missing_object_storage_is_rejected() {
    let cluster = FakeCluster::new();
    let mut spec = minimal_spec();
    spec.object_storage = Some(ObjectStorage::default());
    let mut dspa = application(spec);

    let outcome = pass(&cluster, &mut dspa).await;

    assert_eq!(
        outcome.error.as_ref().map(|e| e.class()),
        Some(ErrorClass::Configuration)
    );
}

#[tokio::test]
async fn test_derive_failure_keeps_previous_components() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;
    cluster.mark_all_available();
    let ready = pass(&cluster, &mut dspa).await;
    assert!(ready.status.components.api_server.is_some());

    dspa.spec.mlmd = None;
    dspa.metadata.generation = Some(2);
    let failed = pass(&cluster, &mut dspa).await;

    assert_eq!(failed.status.components, ready.status.components);
    assert_eq!(condition(&failed, CR_READY).status, "False");
    assert_eq!(condition(&failed, CR_READY).observed_generation, Some(2));
}
