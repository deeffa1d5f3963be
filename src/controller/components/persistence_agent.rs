//! Persistence agent, which records workflow results into the API server.

use super::readiness;
use super::{ComponentError, ComponentReconciler, PassContext};
use crate::constants::PERSISTENCE_AGENT_READY;
use crate::controller::apply::TemplateRef;
use crate::controller::status::ComponentCondition;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct PersistenceAgentReconciler;

#[async_trait]
impl ComponentReconciler for PersistenceAgentReconciler {
    fn name(&self) -> &'static str {
        "persistence-agent"
    }

    async fn reconcile(
        &self,
        ctx: &PassContext<'_>,
    ) -> Result<Option<ComponentCondition>, ComponentError> {
        let Some(component) = &ctx.params.persistence_agent else {
            return Ok(Some(ComponentCondition::not_applicable(PERSISTENCE_AGENT_READY)));
        };

        info!(
            "Applying {} with {} workers",
            component.name, component.num_workers
        );
        ctx.apply(TemplateRef::PersistenceAgent).await?;

        let condition = readiness::deployment_condition(
            ctx.reader,
            &ctx.params.namespace,
            &component.name,
            PERSISTENCE_AGENT_READY,
        )
        .await?;
        Ok(Some(condition))
    }
}
