//! ML metadata store: envoy proxy, gRPC server and, in the legacy topology, a writer.

use super::readiness;
use super::{ComponentError, ComponentReconciler, PassContext};
use crate::constants::*;
use crate::controller::apply::TemplateRef;
use crate::controller::params::MlmdTopology;
use crate::controller::status::ComponentCondition;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct MlmdReconciler;

#[async_trait]
impl ComponentReconciler for MlmdReconciler {
    fn name(&self) -> &'static str {
        "mlmd"
    }

    async fn reconcile(
        &self,
        ctx: &PassContext<'_>,
    ) -> Result<Option<ComponentCondition>, ComponentError> {
        let Some(mlmd) = &ctx.params.mlmd else {
            return Ok(Some(ComponentCondition::not_applicable(MLMD_PROXY_READY)));
        };

        info!(
            "Applying MLMD ({:?} topology) for {}",
            mlmd.topology, ctx.params.name
        );
        ctx.apply(TemplateRef::MlmdEnvoy).await?;
        ctx.apply(TemplateRef::MlmdGrpc).await?;

        let mut deployments = vec![mlmd.envoy.name.as_str(), mlmd.grpc.name.as_str()];
        if let (MlmdTopology::Legacy, Some(writer)) = (mlmd.topology, &mlmd.writer) {
            ctx.apply(TemplateRef::MlmdWriter).await?;
            deployments.push(writer.name.as_str());
        }

        if mlmd.deploy_envoy_route {
            ctx.apply(TemplateRef::MlmdEnvoyRoute).await?;
        } else {
            ctx.delete(TemplateRef::MlmdEnvoyRoute).await?;
        }

        let condition = readiness::all_ready(
            ctx.reader,
            &ctx.params.namespace,
            &deployments,
            MLMD_PROXY_READY,
        )
        .await?;
        Ok(Some(condition))
    }
}
