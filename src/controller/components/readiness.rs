//! Workload readiness from Deployment conditions.

use crate::constants::*;
use crate::controller::params::{ClusterReader, LookupError};
use crate::controller::status::ComponentCondition;
use k8s_openapi::api::apps::v1::Deployment;

/// Map a component's Deployment to its condition
///
/// | Deployment | Condition |
/// |------------|-----------|
/// | absent | False `ComponentDeploymentNotFound` |
/// | `Available=True` | True `MinimumReplicasAvailable` |
/// | `ReplicaFailure=True` or `Progressing=False` | False `FailingToDeploy` |
/// | anything else | False `Deploying` |
pub fn evaluate(
    deployment: Option<&Deployment>,
    condition_type: &'static str,
    component: &str,
) -> ComponentCondition {
    let Some(deployment) = deployment else {
        return ComponentCondition::not_ready(
            condition_type,
            REASON_DEPLOYMENT_NOT_FOUND,
            format!(
                "Deployment for component \"{component}\" is missing - pre-requisite component may not yet be available."
            ),
        );
    };

    let conditions = deployment
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_deref())
        .unwrap_or_default();
    let find = |t: &str| conditions.iter().find(|c| c.type_ == t);

    if find("Available").is_some_and(|c| c.status == "True") {
        return ComponentCondition::ready(
            condition_type,
            REASON_MINIMUM_REPLICAS_AVAILABLE,
            format!("Component [{component}] is minimally available."),
        );
    }

    let failure = find("ReplicaFailure")
        .filter(|c| c.status == "True")
        .or_else(|| find("Progressing").filter(|c| c.status == "False"));
    if let Some(failure) = failure {
        let detail = failure.message.clone().unwrap_or_default();
        return ComponentCondition::not_ready(
            condition_type,
            REASON_FAILING_TO_DEPLOY,
            format!("Component [{component}] has failed to deploy: {detail}"),
        );
    }

    ComponentCondition::not_ready(
        condition_type,
        REASON_DEPLOYING,
        format!("Component [{component}] is deploying."),
    )
}

/// Fetch a Deployment and evaluate it
pub async fn deployment_condition(
    reader: &dyn ClusterReader,
    namespace: &str,
    name: &str,
    condition_type: &'static str,
) -> Result<ComponentCondition, LookupError> {
    let deployment = reader.get_deployment(namespace, name).await?;
    Ok(evaluate(deployment.as_ref(), condition_type, name))
}

/// Combined condition of several Deployments: the first one not ready wins
pub async fn all_ready(
    reader: &dyn ClusterReader,
    namespace: &str,
    names: &[&str],
    condition_type: &'static str,
) -> Result<ComponentCondition, LookupError> {
    let mut last = None;
    for name in names {
        let condition = deployment_condition(reader, namespace, name, condition_type).await?;
        if !condition.is_true() {
            return Ok(condition);
        }
        last = Some(condition);
    }
    Ok(last.unwrap_or_else(|| ComponentCondition::unknown(condition_type)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::status::ConditionStatus;
    use k8s_openapi::api::apps::v1::{DeploymentCondition, DeploymentStatus};

    fn deployment(conditions: &[(&str, &str, Option<&str>)]) -> Deployment {
        Deployment {
            status: Some(DeploymentStatus {
                conditions: Some(
                    conditions
                        .iter()
                        .map(|(t, s, m)| DeploymentCondition {
                            type_: (*t).to_string(),
                            status: (*s).to_string(),
                            message: m.map(str::to_string),
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_deployment() {
        let condition = evaluate(None, API_SERVER_READY, "ds-pipeline-sample");
        assert_eq!(condition.status, ConditionStatus::False);
        assert_eq!(condition.reason, REASON_DEPLOYMENT_NOT_FOUND);
        assert!(condition.message.contains("ds-pipeline-sample"));
    }

    #[test]
    fn test_available() {
        let d = deployment(&[("Available", "True", None), ("Progressing", "True", None)]);
        let condition = evaluate(Some(&d), API_SERVER_READY, "api");
        assert!(condition.is_true());
        assert_eq!(condition.reason, REASON_MINIMUM_REPLICAS_AVAILABLE);
    }

    #[test]
    fn test_replica_failure_carries_message() {
        let d = deployment(&[
            ("Available", "False", None),
            ("ReplicaFailure", "True", Some("quota exceeded")),
        ]);
        let condition = evaluate(Some(&d), API_SERVER_READY, "api");
        assert_eq!(condition.reason, REASON_FAILING_TO_DEPLOY);
        assert!(condition.message.contains("quota exceeded"));
    }

    #[test]
    fn test_progress_deadline_exceeded() {
        let d = deployment(&[("Progressing", "False", Some("deadline exceeded"))]);
        let condition = evaluate(Some(&d), API_SERVER_READY, "api");
        assert_eq!(condition.reason, REASON_FAILING_TO_DEPLOY);
    }

    #[test]
    fn test_deploying_without_conditions() {
        let condition = evaluate(Some(&Deployment::default()), API_SERVER_READY, "api");
        assert_eq!(condition.reason, REASON_DEPLOYING);
        assert_eq!(condition.status, ConditionStatus::False);
    }
}
