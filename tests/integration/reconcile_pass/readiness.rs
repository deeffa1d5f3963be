//! Overall readiness from component Deployments.

use super::fakes::*;
use pipelines_application_controller::constants::*;
use pipelines_application_controller::crd::{
    ApiServer, MlPipelineUi, PersistenceAgent, ScheduledWorkflow,
};

#[tokio::test]
async fn test_one_unavailable_deployment_blocks_ready() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;
    cluster.mark_all_available();
    // Only the UI deployment is missing from the available set once it is enabled
    dspa.spec.mlpipeline_ui = Some(MlPipelineUi {
        deploy: Some(true),
        ..Default::default()
    });
    let outcome = pass(&cluster, &mut dspa).await;

    let ui = condition(&outcome, ML_PIPELINE_UI_READY);
    assert_eq!(ui.status, "False");
    assert_eq!(ui.reason.as_deref(), Some(REASON_DEPLOYING));

    let ready = condition(&outcome, CR_READY);
    assert_eq!(ready.status, "False");
    assert_eq!(ready.reason.as_deref(), Some(REASON_DEPLOYING));
    assert_eq!(
        ready.message.as_deref(),
        Some("Component [ds-pipeline-ui-sample] is deploying.")
    );

    cluster.mark_available(NAMESPACE, "ds-pipeline-ui-sample");
    assert!(pass(&cluster, &mut dspa).await.is_ready());
}

#[tokio::test]
async fn test_disabled_components_are_not_applied() {
    let cluster = FakeCluster::new();
    let mut spec = minimal_spec();
    spec.persistence_agent = Some(PersistenceAgent {
        deploy: Some(false),
        ..Default::default()
    });
    spec.scheduled_workflow = Some(ScheduledWorkflow {
        deploy: Some(false),
        ..Default::default()
    });
    let mut dspa = application(spec);

    let outcome = pass(&cluster, &mut dspa).await;

    for condition_type in [PERSISTENCE_AGENT_READY, SCHEDULED_WORKFLOW_READY] {
        assert_eq!(
            condition(&outcome, condition_type).reason.as_deref(),
            Some(REASON_NOT_APPLICABLE)
        );
    }
    let keys = cluster.applied_keys();
    assert!(!keys.iter().any(|k| k.contains("persistenceagent")));
    assert!(!keys.iter().any(|k| k.contains("scheduledworkflow")));

    cluster.mark_all_available();
    assert!(pass(&cluster, &mut dspa).await.is_ready());
}

#[tokio::test]
async fn test_failures_are_listed_in_order() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    let outcome = pass(&cluster, &mut dspa).await;

    let message = condition(&outcome, CR_READY).message.clone().unwrap_or_default();
    let lines: Vec<&str> = message.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].contains("ds-pipeline-metadata-envoy-sample"));
    assert!(lines[1].contains("ds-pipeline-sample"));
}

#[tokio::test]
async fn test_route_host_becomes_external_url() {
    let cluster = FakeCluster::new().with_route_host(
        NAMESPACE,
        "ds-pipeline-sample",
        "ds-pipeline-sample-team-a.apps.example.com",
    );
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;
    cluster.mark_all_available();
    let outcome = pass(&cluster, &mut dspa).await;

    let api = outcome.status.components.api_server.as_ref().unwrap();
    assert_eq!(
        api.external_url.as_deref(),
        Some("https://ds-pipeline-sample-team-a.apps.example.com")
    );
}

#[tokio::test]
async fn test_disabling_route_deletes_it() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;
    assert!(cluster
        .applied_keys()
        .contains(&"Route/team-a/ds-pipeline-sample".to_string()));

    dspa.spec.api_server = Some(ApiServer {
        enable_route: Some(false),
        ..Default::default()
    });
    pass(&cluster, &mut dspa).await;

    assert!(cluster
        .deleted()
        .contains(&"Route/team-a/ds-pipeline-sample".to_string()));
}
