//! Webhook lifecycle for the Kubernetes pipeline store.

use super::fakes::*;
use pipelines_application_controller::constants::*;
use pipelines_application_controller::controller::errors::ErrorClass;
use pipelines_application_controller::crd::{ApiServer, DataSciencePipelinesApplicationSpec};

fn kubernetes_store_spec() -> DataSciencePipelinesApplicationSpec {
    DataSciencePipelinesApplicationSpec {
        api_server: Some(ApiServer {
            pipeline_store: Some(PIPELINE_STORE_KUBERNETES.to_string()),
            ..Default::default()
        }),
        ..minimal_spec()
    }
}

#[tokio::test]
async fn test_missing_operator_deployment_is_a_missing_dependency() {
    let cluster = FakeCluster::new();
    let mut dspa = application(kubernetes_store_spec());

    let outcome = pass(&cluster, &mut dspa).await;

    let error = outcome.error.as_ref().expect("pass must fail");
    assert_eq!(error.class(), ErrorClass::MissingDependency);
    let ready = condition(&outcome, CR_READY);
    assert_eq!(ready.reason.as_deref(), Some(REASON_MISSING_DEPENDENCY));
    assert!(ready
        .message
        .as_deref()
        .unwrap_or_default()
        .contains(OPERATOR_DEPLOYMENT_NAME));
    // Earlier components were still applied
    assert!(cluster
        .applied_keys()
        .contains(&"Deployment/team-a/ds-pipeline-sample".to_string()));
}

#[tokio::test]
async fn test_operator_deployment_without_uid_is_not_usable() {
    let cluster =
        FakeCluster::new().with_deployment(OPERATOR_NAMESPACE, OPERATOR_DEPLOYMENT_NAME, None);
    let mut dspa = application(kubernetes_store_spec());

    let outcome = pass(&cluster, &mut dspa).await;

    assert_eq!(
        outcome.error.as_ref().map(|e| e.class()),
        Some(ErrorClass::MissingDependency)
    );
}

#[tokio::test]
async fn test_webhook_applied_and_owned_by_operator() {
    let cluster = FakeCluster::new().with_deployment(
        OPERATOR_NAMESPACE,
        OPERATOR_DEPLOYMENT_NAME,
        Some("operator-uid"),
    );
    let mut dspa = application(kubernetes_store_spec());

    let outcome = pass(&cluster, &mut dspa).await;
    assert!(outcome.error.is_none());

    let applied = cluster.applied();
    let webhook = &applied[&format!("Deployment/{OPERATOR_NAMESPACE}/{WEBHOOK_NAME}")];
    let owners = webhook.metadata.owner_references.clone().unwrap_or_default();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].uid, "operator-uid");
    assert_eq!(owners[0].kind, "Deployment");

    let cluster_scoped = applied
        .get(&format!("MutatingWebhookConfiguration/{WEBHOOK_CONFIGURATION_NAME}"))
        .expect("mutating webhook configuration applied");
    assert!(cluster_scoped.metadata.owner_references.is_none());

    cluster.mark_all_available();
    let outcome = pass(&cluster, &mut dspa).await;
    assert_eq!(condition(&outcome, WEBHOOK_READY).status, "True");
    assert!(outcome.is_ready());
}

#[tokio::test]
async fn test_webhook_workload_independent_of_reconciling_instance() {
    let cluster = FakeCluster::new().with_deployment(
        OPERATOR_NAMESPACE,
        OPERATOR_DEPLOYMENT_NAME,
        Some("operator-uid"),
    );
    let first = application(kubernetes_store_spec());
    let second = named_application(
        "team-b",
        "other",
        DataSciencePipelinesApplicationSpec {
            api_server: Some(ApiServer {
                pipeline_store: Some(PIPELINE_STORE_KUBERNETES.to_string()),
                image: Some("example.com/custom-api:dev".to_string()),
                ..Default::default()
            }),
            ..minimal_spec()
        },
    );
    let key = format!("Deployment/{OPERATOR_NAMESPACE}/{WEBHOOK_NAME}");
    let expected_image = config().images.webhook;

    let mut seen = Vec::new();
    let mut instances = [first, second];
    for round in 0..4 {
        let outcome = pass(&cluster, &mut instances[round % 2]).await;
        assert!(outcome.error.is_none());
        let webhook = cluster.applied()[&key].clone();
        let image = webhook.data["spec"]["template"]["spec"]["containers"][0]["image"].clone();
        assert_eq!(image, expected_image.as_str());
        seen.push(webhook.data);
    }
    assert!(seen.windows(2).all(|pair| pair[0] == pair[1]));
}
