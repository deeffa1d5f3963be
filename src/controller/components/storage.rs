//! Object storage: managed Minio or an external S3-compatible endpoint.

use super::{ComponentError, ComponentReconciler, PassContext};
use crate::constants::*;
use crate::controller::apply::TemplateRef;
use crate::controller::params::ObjectStorageBackend;
use crate::controller::probes::ObjectStoreProbeRequest;
use crate::controller::status::ComponentCondition;
use crate::observability;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectStorageReconciler;

#[async_trait]
impl ComponentReconciler for ObjectStorageReconciler {
    fn name(&self) -> &'static str {
        "object-storage"
    }

    async fn reconcile(
        &self,
        ctx: &PassContext<'_>,
    ) -> Result<Option<ComponentCondition>, ComponentError> {
        let params = ctx.params;

        if let ObjectStorageBackend::Managed(minio) = &params.object_storage_backend {
            if params.object_storage.credentials_generated {
                info!(
                    "Storing generated object storage credentials in Secret {}",
                    params.object_storage.credentials_secret.secret_name
                );
                ctx.apply(TemplateRef::ObjectStorageSecret).await?;
            }
            info!("Applying managed object storage {}", minio.name);
            ctx.apply(TemplateRef::Minio).await?;
            if params.object_storage_route {
                ctx.apply(TemplateRef::MinioRoute).await?;
            } else {
                ctx.delete(TemplateRef::MinioRoute).await?;
            }
        } else {
            info!("Using external object storage at {}", params.object_storage.endpoint);
        }

        if !params.object_storage_health_check {
            return Ok(Some(ComponentCondition::ready(
                OBJECT_STORE_AVAILABLE,
                OBJECT_STORE_AVAILABLE,
                "Object Store health check disabled",
            )));
        }

        let request = ObjectStoreProbeRequest::from_params(
            params,
            ctx.config.object_store_connection_timeout(),
        );
        let started = Instant::now();
        let outcome = ctx.probes.object_store.probe(&request).await;
        observability::metrics::record_probe(
            "object-store",
            outcome.is_ok(),
            started.elapsed().as_secs_f64(),
        );

        let condition = match outcome {
            Ok(()) => ComponentCondition::ready(
                OBJECT_STORE_AVAILABLE,
                OBJECT_STORE_AVAILABLE,
                "Object Store connectivity successfully verified",
            ),
            Err(e) => {
                warn!(
                    "Object store {} bucket {} is not reachable: {}",
                    request.endpoint, request.bucket, e
                );
                ComponentCondition::not_ready(
                    OBJECT_STORE_AVAILABLE,
                    REASON_OBJECT_STORE_UNAVAILABLE,
                    format!("Could not connect to Object Store: {e}"),
                )
            }
        };
        Ok(Some(condition))
    }
}
