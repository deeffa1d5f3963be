//! Shared objects every other component depends on.

use super::{ComponentError, ComponentReconciler, PassContext};
use crate::controller::apply::TemplateRef;
use crate::controller::status::ComponentCondition;
use async_trait::async_trait;
use tracing::debug;

/// Materializes the combined CA bundle ConfigMap
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonReconciler;

#[async_trait]
impl ComponentReconciler for CommonReconciler {
    fn name(&self) -> &'static str {
        "common"
    }

    async fn reconcile(
        &self,
        ctx: &PassContext<'_>,
    ) -> Result<Option<ComponentCondition>, ComponentError> {
        if ctx.params.trust.is_empty() {
            debug!("No CA bundle sources for {}, skipping trust ConfigMap", ctx.params.name);
        } else {
            ctx.apply(TemplateRef::CaBundle).await?;
        }
        Ok(None)
    }
}
