//! Reconcile entry point: finalizer handling, one pass, status persistence.

use super::cleanup::cleanup;
use super::pass::{run_pass, PassDeps};
use super::status::persist_status;
use super::{Reconciler, ReconcilerError};
use crate::constants::FINALIZER_NAME;
use crate::crd::DataSciencePipelinesApplication;
use crate::observability;
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event};
use kube::{Api, ResourceExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Instrument};

pub async fn reconcile(
    dspa: Arc<DataSciencePipelinesApplication>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = dspa.name_any();
    let namespace = dspa.namespace().unwrap_or_default();
    let span = tracing::info_span!(
        "controller.reconcile",
        resource.name = %name,
        resource.namespace = %namespace,
        resource.generation = dspa.metadata.generation.unwrap_or_default(),
    );

    async move {
        let api: Api<DataSciencePipelinesApplication> =
            Api::namespaced(ctx.client.clone(), &namespace);
        finalizer(&api, FINALIZER_NAME, dspa, |event| async {
            match event {
                Event::Apply(dspa) => apply(&dspa, &ctx).await,
                Event::Cleanup(dspa) => teardown(&dspa, &ctx).await,
            }
        })
        .await
        .map_err(|e| ReconcilerError::Finalizer(Box::new(e)))
    }
    .instrument(span)
    .await
}

async fn apply(
    dspa: &DataSciencePipelinesApplication,
    ctx: &Reconciler,
) -> Result<Action, ReconcilerError> {
    let started = Instant::now();
    observability::metrics::increment_reconciliations();
    let config = ctx.config.read().await.clone();

    let outcome = run_pass(
        dspa,
        PassDeps {
            reader: ctx.reader.as_ref(),
            applier: ctx.applier.as_ref(),
            probes: &ctx.probes,
            config: &config,
            components: &ctx.components,
        },
    )
    .await;

    let ready = outcome.is_ready();
    if persist_status(&ctx.client, dspa, &outcome.status)
        .await
        .map_err(ReconcilerError::Status)?
    {
        observability::metrics::increment_status_updates(if ready { "true" } else { "false" });
    }
    observability::metrics::observe_reconciliation_duration(started.elapsed().as_secs_f64());

    if let Some(error) = outcome.error {
        return Err(error);
    }

    let resource_key = format!("{}/{}", dspa.namespace().unwrap_or_default(), dspa.name_any());
    ctx.reset_backoff(&resource_key);

    if ready {
        info!("{} is ready", resource_key);
        observability::metrics::increment_requeues_total("resync");
        Ok(Action::requeue(config.resync()))
    } else {
        info!("{} is not ready yet, requeueing", resource_key);
        observability::metrics::increment_requeues_total("not-ready");
        Ok(Action::requeue(config.requeue()))
    }
}

async fn teardown(
    dspa: &DataSciencePipelinesApplication,
    ctx: &Reconciler,
) -> Result<Action, ReconcilerError> {
    let config = ctx.config.read().await.clone();
    cleanup(dspa, ctx.reader.as_ref(), ctx.applier.as_ref(), &config).await?;

    let name = dspa.name_any();
    let namespace = dspa.namespace().unwrap_or_default();
    ctx.forget_backoff(&format!("{namespace}/{name}"));
    observability::metrics::remove_instance_readiness(&name, &namespace);
    Ok(Action::await_change())
}
