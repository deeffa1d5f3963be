//! # Initialization
//!
//! Process setup before the watch loop starts: rustls crypto provider, tracing
//! (optionally bridged to OpenTelemetry), metrics registry, the HTTP server, the
//! Kubernetes client and the shared reconciler context.

use crate::config::{create_shared_config, ServerConfig};
use crate::controller::apply::KubeApplier;
use crate::controller::params::KubeClusterReader;
use crate::controller::probes::Probes;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::DataSciencePipelinesApplication;
use crate::observability;
use crate::observability::otel::OtelSettings;
use anyhow::{anyhow, Context, Result};
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "pipelines_application_controller=info";

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    /// All application instances, cluster-wide
    pub applications: Api<DataSciencePipelinesApplication>,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
    pub otel_tracer_provider: Option<SdkTracerProvider>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("reconciler", &self.reconciler)
            .field("otel", &self.otel_tracer_provider.is_some())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// # Errors
///
/// Fails when the crypto provider, metrics registry, HTTP server or Kubernetes
/// client cannot be set up.
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before any rustls client is built
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let otel_tracer_provider = observability::otel::init_otel(OtelSettings::from_env().as_ref())
        .context("Failed to initialize OpenTelemetry")?;
    init_tracing(otel_tracer_provider.as_ref());

    info!("Starting Pipelines Application Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    let (controller_config, server_config) = create_shared_config();
    let server_config = server_config.read().await.clone();
    {
        let config = controller_config.read().await;
        info!(
            "Configuration: operator_namespace={}, requeue={}s, resync={}s, max_concurrent_reconciles={}",
            config.operator_namespace,
            config.requeue_secs,
            config.resync_secs,
            config.max_concurrent_reconciles
        );
    }

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let applications: Api<DataSciencePipelinesApplication> = Api::all(client.clone());

    let reconciler = Arc::new(Reconciler::new(
        client.clone(),
        Arc::new(KubeClusterReader::new(client.clone())),
        Arc::new(KubeApplier::new(client.clone())),
        Probes::live(),
        controller_config,
    ));

    log_existing_resources(&applications).await;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        applications,
        reconciler,
        server_state,
        otel_tracer_provider,
    })
}

fn init_tracing(provider: Option<&SdkTracerProvider>) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let otel_layer = provider.map(|p| {
        tracing_opentelemetry::layer().with_tracer(observability::otel::tracer(p))
    });

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .try_init()
    {
        // Only happens when a subscriber was already installed (tests, embedding)
        warn!("Tracing subscriber already initialized: {}", e);
    }
}

async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(server_config.startup_timeout_secs);
    let poll_interval = Duration::from_millis(server_config.poll_interval_ms);
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }
        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }
        if start_time.elapsed() > startup_timeout {
            return Err(anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Log the instances present at startup; the controller's initial list reconciles them
async fn log_existing_resources(applications: &Api<DataSciencePipelinesApplication>) {
    let span = tracing::span!(
        tracing::Level::INFO,
        "controller.startup.existing_resources",
        operation = "list_existing"
    );
    let _guard = span.enter();

    match applications.list(&ListParams::default()).await {
        Ok(list) => {
            info!(
                "CRD is queryable, found {} existing DataSciencePipelinesApplication resources",
                list.items.len()
            );
            let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for item in &list.items {
                by_namespace
                    .entry(item.namespace().unwrap_or_default())
                    .or_default()
                    .push(item.name_any());
            }
            for (namespace, names) in by_namespace {
                info!("  {}: {}", namespace, names.join(", "));
            }
        }
        Err(e) => {
            warn!(
                "Could not list DataSciencePipelinesApplication resources (is the CRD installed?): {}",
                e
            );
        }
    }
}
