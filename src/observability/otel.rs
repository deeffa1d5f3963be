//! # OpenTelemetry Support
//!
//! Tracing provider setup driven by the standard `OTEL_*` environment variables.
//!
//! When `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an SDK tracer provider is created and
//! bridged into `tracing` through `tracing-opentelemetry`, so every reconciliation span
//! carries OpenTelemetry trace and span ids. Without the variable, nothing is installed.

use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing::{info, warn};

const DEFAULT_SERVICE_NAME: &str = "pipelines-application-controller";

/// OpenTelemetry settings read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtelSettings {
    pub endpoint: String,
    pub service_name: String,
    pub service_version: String,
}

impl OtelSettings {
    /// Returns `None` when no exporter endpoint is configured
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|v| !v.trim().is_empty())?;
        Some(Self {
            endpoint,
            service_name: std::env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string()),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

/// Build the tracer provider for the given settings
///
/// Returns `Ok(None)` when OpenTelemetry is not configured.
///
/// # Errors
///
/// Returns an error if the provider cannot be constructed.
pub fn init_otel(settings: Option<&OtelSettings>) -> Result<Option<SdkTracerProvider>> {
    let Some(settings) = settings else {
        return Ok(None);
    };

    let resource = Resource::builder()
        .with_service_name(settings.service_name.clone())
        .with_attribute(opentelemetry::KeyValue::new(
            "service.version",
            settings.service_version.clone(),
        ))
        .build();
    let provider = SdkTracerProvider::builder().with_resource(resource).build();
    opentelemetry::global::set_tracer_provider(provider.clone());

    info!(
        endpoint = %settings.endpoint,
        service = %settings.service_name,
        "OpenTelemetry tracer provider initialized"
    );
    Ok(Some(provider))
}

/// Tracer used by the `tracing-opentelemetry` layer
pub fn tracer(provider: &SdkTracerProvider) -> SdkTracer {
    provider.tracer(DEFAULT_SERVICE_NAME)
}

/// Flush and shut down the tracer provider
pub fn shutdown_otel(tracer_provider: Option<SdkTracerProvider>) {
    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            warn!("OpenTelemetry shutdown failed: {}", e);
        }
    }
}
