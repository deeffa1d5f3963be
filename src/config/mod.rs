//! # Controller Configuration
//!
//! Controller-level configuration loaded from environment variables.
//!
//! All configuration has sensible defaults and can be overridden via environment variables.
//! Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
//! No per-instance behavior is configured here; the custom resource spec is the only
//! per-instance input.

mod controller;
mod server;

pub use controller::{ComponentImages, ControllerConfig};
pub use server::ServerConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Global controller configuration
pub type SharedControllerConfig = Arc<RwLock<ControllerConfig>>;

/// Global server configuration
pub type SharedServerConfig = Arc<RwLock<ServerConfig>>;

/// Load configuration from environment variables with defaults
pub fn load_config() -> (ControllerConfig, ServerConfig) {
    (ControllerConfig::from_env(), ServerConfig::from_env())
}

/// Create shared configuration instances
pub fn create_shared_config() -> (SharedControllerConfig, SharedServerConfig) {
    let (controller_config, server_config) = load_config();
    (
        Arc::new(RwLock::new(controller_config)),
        Arc::new(RwLock::new(server_config)),
    )
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read a non-empty string environment variable
pub(crate) fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
