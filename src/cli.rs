//! # dspactl
//!
//! Command-line companion for the Pipelines Application Controller.
//!
//! ## Usage
//!
//! ```bash
//! # List all DataSciencePipelinesApplication resources
//! dspactl list
//!
//! # Show conditions and component URLs of one resource
//! dspactl status --namespace team-a --name sample
//!
//! # Ask the controller to reconcile a resource now
//! dspactl reconcile --namespace team-a --name sample
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use pipelines_application_controller::constants::{CR_READY, RECONCILE_ANNOTATION};
use pipelines_application_controller::crd::{
    ComponentDetailStatus, DataSciencePipelinesApplication,
};
use serde_json::json;

/// Pipelines Application Controller CLI
#[derive(Debug, Parser)]
#[command(name = "dspactl")]
#[command(about = "Inspect and nudge DataSciencePipelinesApplication resources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to all namespaces for list, "default" otherwise)
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Trigger reconciliation by stamping an annotation
    Reconcile {
        #[arg(long)]
        name: String,
    },
    /// List resources and their readiness
    List,
    /// Show conditions and component URLs
    Status {
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dspactl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;

    match cli.command {
        Commands::Reconcile { name } => reconcile_command(client, &name, cli.namespace).await,
        Commands::List => list_command(client, cli.namespace).await,
        Commands::Status { name } => status_command(client, &name, cli.namespace).await,
    }
}

async fn reconcile_command(client: Client, name: &str, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");
    let api: Api<DataSciencePipelinesApplication> = Api::namespaced(client, ns);

    let timestamp = chrono::Utc::now().timestamp().to_string();
    let patch = json!({
        "metadata": {
            "annotations": {
                RECONCILE_ANNOTATION: timestamp
            }
        }
    });

    api.patch(name, &PatchParams::default(), &Patch::Merge(patch))
        .await
        .with_context(|| format!("Failed to trigger reconciliation for '{ns}/{name}'"))?;

    println!(
        "Reconciliation triggered for {ns}/{name} (annotation {RECONCILE_ANNOTATION}={timestamp})"
    );
    Ok(())
}

async fn list_command(client: Client, namespace: Option<String>) -> Result<()> {
    let api: Api<DataSciencePipelinesApplication> = match namespace.as_deref() {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };

    let applications = api
        .list(&ListParams::default())
        .await
        .context("Failed to list DataSciencePipelinesApplication resources")?;

    if applications.items.is_empty() {
        println!("No DataSciencePipelinesApplication resources found.");
        return Ok(());
    }

    println!("{:<30} {:<20} {:<8} {:<8} {:<30}", "NAME", "NAMESPACE", "VERSION", "READY", "REASON");
    println!("{}", "-".repeat(96));
    for dspa in &applications.items {
        let ready = dspa.status.as_ref().and_then(|s| s.condition(CR_READY));
        println!(
            "{:<30} {:<20} {:<8} {:<8} {:<30}",
            dspa.name_any(),
            dspa.namespace().unwrap_or_default(),
            dspa.spec.dsp_version.as_deref().unwrap_or("v2"),
            ready.map_or("Unknown", |c| c.status.as_str()),
            ready.and_then(|c| c.reason.as_deref()).unwrap_or("-"),
        );
    }
    Ok(())
}

async fn status_command(client: Client, name: &str, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");
    let api: Api<DataSciencePipelinesApplication> = Api::namespaced(client, ns);
    let dspa = api
        .get(name)
        .await
        .with_context(|| format!("Failed to get DataSciencePipelinesApplication '{ns}/{name}'"))?;

    println!("{ns}/{name}");
    if let Some(generation) = dspa.metadata.generation {
        println!("  Generation: {generation}");
    }

    let Some(status) = dspa.status.as_ref() else {
        println!("  No status yet (resource may not have been reconciled)");
        return Ok(());
    };

    println!("\nConditions:");
    for condition in &status.conditions {
        println!(
            "  {:<26} {:<8} {}",
            condition.r#type,
            condition.status,
            condition.reason.as_deref().unwrap_or("")
        );
        if let Some(message) = condition.message.as_deref().filter(|m| !m.is_empty()) {
            for line in message.lines() {
                println!("      {line}");
            }
        }
    }

    let print_urls = |label: &str, detail: Option<&ComponentDetailStatus>| {
        if let Some(detail) = detail {
            if let Some(url) = &detail.url {
                println!("  {label}: {url}");
            }
            if let Some(url) = &detail.external_url {
                println!("  {label} (external): {url}");
            }
        }
    };
    println!("\nComponents:");
    print_urls("API server", status.components.api_server.as_ref());
    print_urls("MLMD proxy", status.components.mlmd_proxy.as_ref());
    Ok(())
}
