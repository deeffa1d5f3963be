//! Metadata database: managed MariaDB or an external server.

use super::{ComponentError, ComponentReconciler, PassContext};
use crate::constants::*;
use crate::controller::apply::TemplateRef;
use crate::controller::params::DatabaseBackend;
use crate::controller::probes::DatabaseProbeRequest;
use crate::controller::status::ComponentCondition;
use crate::observability;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseReconciler;

#[async_trait]
impl ComponentReconciler for DatabaseReconciler {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn reconcile(
        &self,
        ctx: &PassContext<'_>,
    ) -> Result<Option<ComponentCondition>, ComponentError> {
        let params = ctx.params;

        if let DatabaseBackend::Managed(mariadb) = &params.database_backend {
            // Stored credentials are read back on the next pass
            if params.database.password_generated {
                info!(
                    "Storing generated database credentials in Secret {}",
                    params.database.credentials_secret.name
                );
                ctx.apply(TemplateRef::DatabaseSecret).await?;
            }
            info!("Applying managed database {}", mariadb.name);
            ctx.apply(TemplateRef::MariaDb).await?;
        } else {
            info!("Using external database at {}", params.database.host);
        }

        if !params.database_health_check {
            return Ok(Some(ComponentCondition::ready(
                DATABASE_AVAILABLE,
                DATABASE_AVAILABLE,
                "Database health check disabled",
            )));
        }

        let request = DatabaseProbeRequest::from_params(params, ctx.config.db_connection_timeout());
        let started = Instant::now();
        let outcome = ctx.probes.database.probe(&request).await;
        observability::metrics::record_probe(
            "database",
            outcome.is_ok(),
            started.elapsed().as_secs_f64(),
        );

        let condition = match outcome {
            Ok(()) => ComponentCondition::ready(
                DATABASE_AVAILABLE,
                DATABASE_AVAILABLE,
                "Database connectivity successfully verified",
            ),
            Err(e) => {
                warn!(
                    "Database {}:{} is not reachable: {}",
                    request.host, request.port, e
                );
                ComponentCondition::not_ready(
                    DATABASE_AVAILABLE,
                    REASON_DATABASE_UNAVAILABLE,
                    format!("Could not connect to database: {e}"),
                )
            }
        };
        Ok(Some(condition))
    }
}
