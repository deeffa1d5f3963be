//! Teardown of the shared webhook objects.

use super::fakes::*;
use pipelines_application_controller::constants::*;
use pipelines_application_controller::controller::reconciler::cleanup;
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

async fn deployed_webhook(cluster: &FakeCluster) {
    let mut dspa = application(kubernetes_store_spec());
    let outcome = pass(cluster, &mut dspa).await;
    assert!(outcome.error.is_none());
}

fn operator_cluster() -> FakeCluster {
    FakeCluster::new().with_deployment(
        OPERATOR_NAMESPACE,
        OPERATOR_DEPLOYMENT_NAME,
        Some("operator-uid"),
    )
}

#[tokio::test]
async fn test_last_instance_removes_webhook_configuration() {
    let dspa = application(kubernetes_store_spec());
    let cluster = operator_cluster().with_application(dspa.clone());
    deployed_webhook(&cluster).await;

    let removed = cleanup(&dspa, &cluster, &cluster, &config())
        .await
        .unwrap();

    assert!(removed);
    let deleted = cluster.deleted();
    assert!(deleted.contains(&format!(
        "MutatingWebhookConfiguration/{WEBHOOK_CONFIGURATION_NAME}"
    )));
    assert!(deleted.contains(&format!(
        "ValidatingWebhookConfiguration/{WEBHOOK_CONFIGURATION_NAME}"
    )));
}

#[tokio::test]
async fn test_last_instance_removes_webhook_workload() {
    let dspa = application(kubernetes_store_spec());
    let cluster = operator_cluster().with_application(dspa.clone());
    deployed_webhook(&cluster).await;
    let workload = format!("Deployment/{OPERATOR_NAMESPACE}/{WEBHOOK_NAME}");
    assert!(cluster.applied_keys().contains(&workload));

    cleanup(&dspa, &cluster, &cluster, &config())
        .await
        .unwrap();

    let deleted = cluster.deleted();
    for kind in ["Deployment", "Service", "ServiceAccount"] {
        assert!(
            deleted.contains(&format!("{kind}/{OPERATOR_NAMESPACE}/{WEBHOOK_NAME}")),
            "{kind} not deleted: {deleted:?}"
        );
    }
    let leftovers: Vec<String> = cluster
        .applied_keys()
        .into_iter()
        .filter(|key| key.contains(WEBHOOK_NAME) || key.contains(WEBHOOK_CONFIGURATION_NAME))
        .collect();
    assert!(leftovers.is_empty(), "webhook objects left behind: {leftovers:?}");
}

#[tokio::test]
async fn test_webhook_kept_while_another_instance_needs_it() {
    let dspa = application(kubernetes_store_spec());
    let other = named_application("team-b", "other", kubernetes_store_spec());
    let cluster = operator_cluster()
        .with_application(dspa.clone())
        .with_application(other);
    deployed_webhook(&cluster).await;

    let removed = cleanup(&dspa, &cluster, &cluster, &config())
        .await
        .unwrap();

    assert!(!removed);
    assert!(cluster.deleted().is_empty());
}

#[tokio::test]
async fn test_same_name_in_other_namespace_is_a_different_instance() {
    let dspa = application(kubernetes_store_spec());
    let twin = named_application("team-b", NAME, kubernetes_store_spec());
    let cluster = operator_cluster()
        .with_application(dspa.clone())
        .with_application(twin);

    let removed = cleanup(&dspa, &cluster, &cluster, &config())
        .await
        .unwrap();

    assert!(!removed);
}

#[tokio::test]
async fn test_database_store_instances_do_not_hold_webhook() {
    let dspa = application(kubernetes_store_spec());
    let other = named_application("team-b", "other", minimal_spec());
    let cluster = operator_cluster()
        .with_application(dspa.clone())
        .with_application(other);

    let removed = cleanup(&dspa, &cluster, &cluster, &config())
        .await
        .unwrap();

    assert!(removed);
}

#[tokio::test]
async fn test_store_kind_is_matched_exactly() {
    let dspa = application(kubernetes_store_spec());
    let other = named_application(
        "team-b",
        "other",
        DataSciencePipelinesApplicationSpec {
            api_server: Some(ApiServer {
                pipeline_store: Some(PIPELINE_STORE_KUBERNETES.to_uppercase()),
                ..Default::default()
            }),
            ..minimal_spec()
        },
    );
    let cluster = operator_cluster()
        .with_application(dspa.clone())
        .with_application(other);

    let removed = cleanup(&dspa, &cluster, &cluster, &config())
        .await
        .unwrap();

    assert!(removed);
}
