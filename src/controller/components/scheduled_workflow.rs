//! Scheduled workflow controller for recurring runs.

use super::readiness;
use super::{ComponentError, ComponentReconciler, PassContext};
use crate::constants::SCHEDULED_WORKFLOW_READY;
use crate::controller::apply::TemplateRef;
use crate::controller::status::ComponentCondition;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduledWorkflowReconciler;

#[async_trait]
impl ComponentReconciler for ScheduledWorkflowReconciler {
    fn name(&self) -> &'static str {
        "scheduled-workflow"
    }

    async fn reconcile(
        &self,
        ctx: &PassContext<'_>,
    ) -> Result<Option<ComponentCondition>, ComponentError> {
        let Some(component) = &ctx.params.scheduled_workflow else {
            return Ok(Some(ComponentCondition::not_applicable(SCHEDULED_WORKFLOW_READY)));
        };

        info!(
            "Applying {} (cron timezone {})",
            component.name, component.cron_schedule_timezone
        );
        ctx.apply(TemplateRef::ScheduledWorkflow).await?;

        let condition = readiness::deployment_condition(
            ctx.reader,
            &ctx.params.namespace,
            &component.name,
            SCHEDULED_WORKFLOW_READY,
        )
        .await?;
        Ok(Some(condition))
    }
}
