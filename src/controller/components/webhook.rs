//! Pipeline-version admission webhook.
//!
//! Needed only when pipelines are stored as Kubernetes objects. The namespaced part
//! runs next to the operator and is owned by the operator's Deployment, so it lives
//! as long as the operator does. The cluster-scoped part has no owner and is removed
//! by the finalizer once no instance needs it.

use super::readiness;
use super::{ComponentError, ComponentReconciler, PassContext};
use crate::constants::*;
use crate::controller::apply::TemplateRef;
use crate::controller::status::ComponentCondition;
use async_trait::async_trait;
use kube::Resource;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookReconciler;

#[async_trait]
impl ComponentReconciler for WebhookReconciler {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn reconcile(
        &self,
        ctx: &PassContext<'_>,
    ) -> Result<Option<ComponentCondition>, ComponentError> {
        let params = ctx.params;
        if !params.webhook_required() {
            return Ok(Some(ComponentCondition::not_applicable(WEBHOOK_READY)));
        }

        let operator_namespace = params.operator_namespace.as_str();
        let missing = || ComponentError::MissingDependency {
            kind: "Deployment",
            name: OPERATOR_DEPLOYMENT_NAME.to_string(),
            namespace: operator_namespace.to_string(),
        };
        let operator = ctx
            .reader
            .get_deployment(operator_namespace, OPERATOR_DEPLOYMENT_NAME)
            .await?
            .ok_or_else(missing)?;
        let Some(owner) = operator.controller_owner_ref(&()) else {
            warn!(
                "Deployment {}/{} has no uid yet",
                operator_namespace, OPERATOR_DEPLOYMENT_NAME
            );
            return Err(missing());
        };

        info!("Applying webhook in namespace {}", operator_namespace);
        ctx.applier
            .apply(Some(&owner), params, TemplateRef::WebhookNamespaced)
            .await?;
        ctx.applier
            .apply(None, params, TemplateRef::WebhookClusterScoped)
            .await?;

        let condition = readiness::deployment_condition(
            ctx.reader,
            operator_namespace,
            WEBHOOK_NAME,
            WEBHOOK_READY,
        )
        .await?;
        Ok(Some(condition))
    }
}
