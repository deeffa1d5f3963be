//! Pipelines UI, off unless requested.

use super::readiness;
use super::{ComponentError, ComponentReconciler, PassContext};
use crate::constants::ML_PIPELINE_UI_READY;
use crate::controller::apply::TemplateRef;
use crate::controller::status::ComponentCondition;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct UiReconciler;

#[async_trait]
impl ComponentReconciler for UiReconciler {
    fn name(&self) -> &'static str {
        "ui"
    }

    async fn reconcile(
        &self,
        ctx: &PassContext<'_>,
    ) -> Result<Option<ComponentCondition>, ComponentError> {
        let Some(component) = &ctx.params.ui else {
            return Ok(Some(ComponentCondition::not_applicable(ML_PIPELINE_UI_READY)));
        };

        info!("Applying {}", component.name);
        ctx.apply(TemplateRef::Ui).await?;

        let condition = readiness::deployment_condition(
            ctx.reader,
            &ctx.params.namespace,
            &component.name,
            ML_PIPELINE_UI_READY,
        )
        .await?;
        Ok(Some(condition))
    }
}
