//! # Watch Loop
//!
//! Runs the controller: watches every `DataSciencePipelinesApplication` and the
//! namespaced objects it owns, and funnels events into [`reconcile`].

use crate::controller::reconciler::{reconcile, Reconciler, ReconcilerError};
use crate::controller::server::ServerState;
use crate::crd::DataSciencePipelinesApplication;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use crate::{constants, observability};
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use kube_runtime::controller::{self, Action, Controller};
use kube_runtime::watcher;
use kube::Api;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

fn error_policy(
    obj: Arc<DataSciencePipelinesApplication>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    handle_reconciliation_error(obj, error, ctx)
}

/// Run until the controller stream ends (on shutdown signal)
pub async fn run_watch_loop(
    applications: Api<DataSciencePipelinesApplication>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<()> {
    let client = reconciler.client.clone();
    let concurrency = reconciler.config.read().await.max_concurrent_reconciles;
    let watch_backoff = Arc::new(AtomicU64::new(constants::DEFAULT_WATCH_INITIAL_BACKOFF_MS));

    info!(
        "Watching DataSciencePipelinesApplication resources in all namespaces (concurrency {})",
        concurrency
    );

    let owned = watcher::Config::default().labels(constants::LABEL_MANAGED_BY_SELECTOR);
    Controller::new(applications, watcher::Config::default())
        .owns(Api::<Deployment>::all(client.clone()), owned.clone())
        .owns(Api::<Service>::all(client.clone()), owned.clone())
        .owns(Api::<ConfigMap>::all(client.clone()), owned.clone())
        .owns(Api::<Secret>::all(client), owned)
        .with_config(controller::Config::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|result| {
            let watch_backoff = Arc::clone(&watch_backoff);
            async move {
                match result {
                    Ok((obj, action)) => {
                        watch_backoff
                            .store(constants::DEFAULT_WATCH_INITIAL_BACKOFF_MS, Ordering::Relaxed);
                        debug!(
                            name = %obj.name,
                            namespace = ?obj.namespace,
                            ?action,
                            "Reconciliation completed"
                        );
                    }
                    Err(controller::Error::ReconcilerFailed(e, obj)) => {
                        // Already handled by the error policy
                        debug!(name = %obj.name, error = %e, "Reconciliation failed");
                    }
                    Err(controller::Error::ObjectNotFound(obj)) => {
                        debug!(name = %obj.name, "Object deleted before reconciliation");
                    }
                    Err(e) => {
                        observability::metrics::increment_reconciliation_errors("watch");
                        handle_watch_stream_error(
                            &e.to_string(),
                            &watch_backoff,
                            constants::DEFAULT_WATCH_MAX_BACKOFF_MS,
                        )
                        .await;
                    }
                }
            }
        })
        .await;

    warn!("Controller stream ended, shutting down");
    server_state.is_ready.store(false, Ordering::Relaxed);
    Ok(())
}
