//! Repeated passes over an unchanged resource converge.

use super::fakes::*;
use pipelines_application_controller::constants::*;

#[tokio::test]
async fn test_first_pass_reports_deploying() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    let outcome = pass(&cluster, &mut dspa).await;

    assert!(outcome.error.is_none());
    assert!(!outcome.is_ready());
    let api = condition(&outcome, API_SERVER_READY);
    assert_eq!(api.status, "False");
    assert_eq!(api.reason.as_deref(), Some(REASON_DEPLOYING));
    assert!(outcome.status.components.api_server.is_none());
}

#[tokio::test]
async fn test_ready_once_deployments_are_available() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;
    cluster.mark_all_available();
    let outcome = pass(&cluster, &mut dspa).await;

    assert!(outcome.is_ready(), "status: {:?}", outcome.status);
    let ready = condition(&outcome, CR_READY);
    assert_eq!(ready.reason.as_deref(), Some(REASON_MINIMUM_REPLICAS_AVAILABLE));
    assert_eq!(
        condition(&outcome, ML_PIPELINE_UI_READY).reason.as_deref(),
        Some(REASON_NOT_APPLICABLE)
    );
    assert_eq!(
        condition(&outcome, WEBHOOK_READY).reason.as_deref(),
        Some(REASON_NOT_APPLICABLE)
    );

    let api = outcome.status.components.api_server.as_ref().unwrap();
    assert_eq!(
        api.url.as_deref(),
        Some("https://ds-pipeline-sample.team-a.svc.cluster.local:8443")
    );
    let mlmd = outcome.status.components.mlmd_proxy.as_ref().unwrap();
    assert_eq!(
        mlmd.url.as_deref(),
        Some("https://ds-pipeline-md-sample.team-a.svc.cluster.local:8443")
    );
}

#[tokio::test]
async fn test_second_pass_changes_nothing() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;
    cluster.mark_all_available();
    let second = pass(&cluster, &mut dspa).await;
    let applied_after_second = cluster.applied();

    let third = pass(&cluster, &mut dspa).await;

    assert_eq!(cluster.applied(), applied_after_second);
    assert_eq!(second.status, third.status);
}

#[tokio::test]
async fn test_generation_bump_keeps_transition_times() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;
    cluster.mark_all_available();
    let before = pass(&cluster, &mut dspa).await;

    dspa.metadata.generation = Some(2);
    let after = pass(&cluster, &mut dspa).await;

    for (old, new) in before.status.conditions.iter().zip(&after.status.conditions) {
        assert_eq!(old.r#type, new.r#type);
        assert_eq!(old.last_transition_time, new.last_transition_time);
        assert_eq!(new.observed_generation, Some(2));
    }
}

#[tokio::test]
async fn test_condition_order_is_stable() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    let outcome = pass(&cluster, &mut dspa).await;

    let types: Vec<&str> = outcome
        .status
        .conditions
        .iter()
        .map(|c| c.r#type.as_str())
        .collect();
    assert_eq!(
        types,
        vec![
            DATABASE_AVAILABLE,
            OBJECT_STORE_AVAILABLE,
            MLMD_PROXY_READY,
            API_SERVER_READY,
            PERSISTENCE_AGENT_READY,
            SCHEDULED_WORKFLOW_READY,
            WORKFLOW_CONTROLLER_READY,
            ML_PIPELINE_UI_READY,
            WEBHOOK_READY,
            CR_READY,
        ]
    );
}
