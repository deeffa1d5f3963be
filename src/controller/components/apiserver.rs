//! Pipelines API server.

use super::readiness;
use super::{ComponentError, ComponentReconciler, PassContext};
use crate::constants::*;
use crate::controller::apply::TemplateRef;
use crate::controller::status::ComponentCondition;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiServerReconciler;

#[async_trait]
impl ComponentReconciler for ApiServerReconciler {
    fn name(&self) -> &'static str {
        "apiserver"
    }

    async fn reconcile(
        &self,
        ctx: &PassContext<'_>,
    ) -> Result<Option<ComponentCondition>, ComponentError> {
        let Some(api) = &ctx.params.api_server else {
            return Ok(Some(ComponentCondition::not_applicable(API_SERVER_READY)));
        };

        info!("Applying API server {}", api.name);
        ctx.apply(TemplateRef::ApiServer).await?;
        if api.enable_route {
            ctx.apply(TemplateRef::ApiServerRoute).await?;
        } else {
            ctx.delete(TemplateRef::ApiServerRoute).await?;
        }

        let condition = readiness::deployment_condition(
            ctx.reader,
            &ctx.params.namespace,
            &api.name,
            API_SERVER_READY,
        )
        .await?;
        Ok(Some(condition))
    }
}
