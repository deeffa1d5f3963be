//! # Error Policy
//!
//! Requeue decisions for failed reconciliations and watch stream errors.
//!
//! | Error class | Requeue |
//! |-------------|---------|
//! | optimistic-concurrency conflict | fixed short interval |
//! | configuration | resync interval, no backoff (the resource must change) |
//! | missing dependency, transient, apply | per-resource Fibonacci backoff |

use crate::config::ControllerConfig;
use crate::constants;
use crate::controller::errors::ErrorClass;
use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::DataSciencePipelinesApplication;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Requeue for a failed reconciliation
pub fn handle_reconciliation_error(
    obj: Arc<DataSciencePipelinesApplication>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");
    let class = error.class();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error.class = class.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}/{}: {}", namespace, name, error);
    observability::metrics::increment_reconciliation_errors(class.as_str());

    // The policy runs synchronously; a config reload in progress falls back to defaults
    let config = ctx
        .config
        .try_read()
        .map(|c| c.clone())
        .unwrap_or_default();

    if error.is_conflict() {
        info!("Write conflict, retrying in {}s", config.conflict_requeue_secs);
        observability::metrics::increment_requeues_total("conflict");
        return Action::requeue(config.conflict_requeue());
    }

    if class == ErrorClass::Configuration {
        info!(
            "Configuration error, waiting for the resource to change (resync in {}s)",
            config.resync_secs
        );
        observability::metrics::increment_requeues_total("configuration");
        return Action::requeue(config.resync());
    }

    let resource_key = format!("{namespace}/{name}");
    let (backoff_seconds, error_count) = next_backoff(&ctx, &resource_key, &config);

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(backoff_seconds).unwrap_or(i64::MAX));
    info!(
        "Retrying with Fibonacci backoff: {}s (error count: {}, class: {})",
        backoff_seconds, error_count, class
    );
    info!(
        "Next retry scheduled: {} (in {}s)",
        next_trigger_time.to_rfc3339(),
        backoff_seconds
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

fn next_backoff(ctx: &Reconciler, resource_key: &str, config: &ControllerConfig) -> (u64, u32) {
    ctx.backoff_states
        .next(resource_key, config.requeue_secs, config.max_backoff_secs)
        .unwrap_or_else(|| {
            warn!("Backoff state unavailable for {}, using base interval", resource_key);
            (config.requeue_secs, 0)
        })
}

/// Kinds of watch stream failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    Expired,
    Throttled,
    NotFound,
    Other,
}

/// Classify a watch stream error by its rendered message
pub fn classify_watch_error(error_string: &str) -> WatchErrorKind {
    if error_string.contains("401") || error_string.contains("Unauthorized") {
        WatchErrorKind::Unauthorized
    } else if error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone")
    {
        WatchErrorKind::Expired
    } else if error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests")
    {
        WatchErrorKind::Throttled
    } else if error_string.contains("ObjectNotFound")
        || (error_string.contains("404") && error_string.contains("not found"))
    {
        WatchErrorKind::NotFound
    } else {
        WatchErrorKind::Other
    }
}

/// Log a watch stream error and pause as appropriate before the stream continues
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
) {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    match classify_watch_error(error_string) {
        WatchErrorKind::Unauthorized => {
            error!("Watch authentication failed (401), RBAC may have been revoked or the token expired");
            error!("Check that the controller ServiceAccount can still list datasciencepipelinesapplications:");
            error!("   kubectl auth can-i list datasciencepipelinesapplications --as=system:serviceaccount:<namespace>:<serviceaccount> --all-namespaces");
            warn!(
                "Waiting {}s before retrying watch",
                constants::DEFAULT_WATCH_RESTART_DELAY_SECS
            );
            tokio::time::sleep(Duration::from_secs(constants::DEFAULT_WATCH_RESTART_DELAY_SECS))
                .await;
        }
        WatchErrorKind::Expired => {
            warn!(error_type = "410", "Watch resource version expired, watch will restart");
        }
        WatchErrorKind::Throttled => {
            let current_backoff = backoff.load(Ordering::Relaxed);
            warn!(
                "API server throttling (429), backing off for {}ms",
                current_backoff
            );
            tokio::time::sleep(Duration::from_millis(current_backoff)).await;
            backoff.store(current_backoff.saturating_mul(2).min(max_backoff_ms), Ordering::Relaxed);
        }
        WatchErrorKind::NotFound => {
            warn!("Resource not found (likely deleted), continuing watch");
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error_string);
            tokio::time::sleep(Duration::from_secs(constants::DEFAULT_WATCH_RESTART_DELAY_SECS))
                .await;
        }
    }
}
