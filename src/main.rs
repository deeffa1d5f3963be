//! # Pipelines Application Controller
//!
//! A Kubernetes controller that turns `DataSciencePipelinesApplication` resources into
//! a running pipelines stack and reports its readiness.
//!
//! ## Overview
//!
//! For every resource the controller:
//!
//! 1. **Derives parameters** - applies defaults, resolves database and object storage
//!    backends, reads or generates credentials and assembles the CA trust bundle
//! 2. **Applies components** - metadata services, API server, persistence agent,
//!    scheduled workflow, workflow controller, UI and the shared webhook, in a fixed order
//! 3. **Checks liveness** - one bounded connection attempt against the database and
//!    the object store
//! 4. **Aggregates status** - one condition per component plus an overall `Ready`
//!
//! ## Features
//!
//! - **Multi-namespace**: watches resources across all namespaces
//! - **Server-side apply**: every rendered object is applied with a single field manager
//! - **Prometheus metrics**: exposed on the metrics port with health probes
//! - **OpenTelemetry**: reconciliation spans exported when `OTEL_EXPORTER_OTLP_ENDPOINT` is set

use anyhow::Result;
use pipelines_application_controller::observability;
use pipelines_application_controller::runtime::{initialize, run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;

    run_watch_loop(
        init_result.applications,
        init_result.reconciler,
        init_result.server_state,
    )
    .await?;

    observability::otel::shutdown_otel(init_result.otel_tracer_provider);

    Ok(())
}
