use super::readiness;
use super::{ComponentError, ComponentReconciler, PassContext};
use crate::constants::WORKFLOW_CONTROLLER_READY;
use crate::controller::apply::TemplateRef;
use crate::controller::status::ComponentCondition;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowControllerReconciler;

#[async_trait]
impl ComponentReconciler for WorkflowControllerReconciler {
    fn name(&self) -> &'static str {
        "workflow-controller"
    }

    async fn reconcile(
        &self,
        ctx: &PassContext<'_>,
    ) -> Result<Option<ComponentCondition>, ComponentError> {
        let Some(component) = &ctx.params.workflow_controller else {
            return Ok(Some(ComponentCondition::not_applicable(WORKFLOW_CONTROLLER_READY)));
        };

        match &component.custom_config {
            Some(config) => info!("Applying {} with custom config {}", component.name, config),
            None => info!("Applying {}", component.name),
        }
        ctx.apply(TemplateRef::WorkflowController).await?;

        let condition = readiness::deployment_condition(
            ctx.reader,
            &ctx.params.namespace,
            &component.name,
            WORKFLOW_CONTROLLER_READY,
        )
        .await?;
        Ok(Some(condition))
    }
}
