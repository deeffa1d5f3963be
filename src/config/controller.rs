//! # Controller Configuration
//!
//! Reconciliation timing, probe timeouts, default component images and the
//! environment facts the reconcilers depend on (operator namespace, system trust file).

use super::{env_var_opt, env_var_or_default};
use crate::constants::*;
use std::time::Duration;

/// Default container images, used when the custom resource does not name one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentImages {
    pub api_server: String,
    pub argo_launcher: String,
    pub argo_driver: String,
    pub persistence_agent: String,
    pub scheduled_workflow: String,
    pub workflow_controller: String,
    pub argo_exec: String,
    pub mariadb: String,
    /// The managed object store has no built-in default; it must be configured here
    /// or named in the resource.
    pub minio: Option<String>,
    pub ui: String,
    pub mlmd_envoy: String,
    pub mlmd_grpc: String,
    pub mlmd_writer: String,
    pub oauth_proxy: String,
    /// Shared by every instance, so never taken from a resource
    pub webhook: String,
}

impl Default for ComponentImages {
    fn default() -> Self {
        let unset = || DEFAULT_IMAGE_VALUE.to_string();
        Self {
            api_server: unset(),
            argo_launcher: unset(),
            argo_driver: unset(),
            persistence_agent: unset(),
            scheduled_workflow: unset(),
            workflow_controller: unset(),
            argo_exec: unset(),
            mariadb: unset(),
            minio: None,
            ui: unset(),
            mlmd_envoy: unset(),
            mlmd_grpc: unset(),
            mlmd_writer: unset(),
            oauth_proxy: unset(),
            webhook: unset(),
        }
    }
}

impl ComponentImages {
    pub fn from_env() -> Self {
        let image = |key: &str| env_var_or_default(key, DEFAULT_IMAGE_VALUE.to_string());
        let api_server = image("IMAGES_APISERVER");
        Self {
            // The webhook binary ships in the API server image unless overridden
            webhook: env_var_opt("IMAGES_WEBHOOK").unwrap_or_else(|| api_server.clone()),
            api_server,
            argo_launcher: image("IMAGES_ARGO_LAUNCHER"),
            argo_driver: image("IMAGES_ARGO_DRIVER"),
            persistence_agent: image("IMAGES_PERSISTENCEAGENT"),
            scheduled_workflow: image("IMAGES_SCHEDULEDWORKFLOW"),
            workflow_controller: image("IMAGES_ARGO_WORKFLOWCONTROLLER"),
            argo_exec: image("IMAGES_ARGO_EXEC"),
            mariadb: image("IMAGES_MARIADB"),
            minio: env_var_opt("IMAGES_MINIO"),
            ui: image("IMAGES_UI"),
            mlmd_envoy: image("IMAGES_MLMDENVOY"),
            mlmd_grpc: image("IMAGES_MLMDGRPC"),
            mlmd_writer: image("IMAGES_MLMDWRITER"),
            oauth_proxy: image("IMAGES_OAUTHPROXY"),
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Base requeue interval after a successful pass and the starting point of
    /// missing-dependency backoff (seconds)
    pub requeue_secs: u64,
    /// Requeue interval after a configuration error (seconds)
    pub resync_secs: u64,
    /// Requeue interval after an optimistic-concurrency conflict (seconds)
    pub conflict_requeue_secs: u64,
    /// Upper bound of the per-resource Fibonacci backoff (seconds)
    pub max_backoff_secs: u64,
    pub db_connection_timeout_secs: u64,
    pub object_store_connection_timeout_secs: u64,
    /// Maximum number of resource instances reconciled concurrently
    pub max_concurrent_reconciles: u16,
    /// Attach owner references to namespaced objects
    pub include_owner_reference: bool,
    /// Namespace of the operator's own management-plane Deployment
    pub operator_namespace: String,
    /// Local system CA trust file appended to non-empty bundles
    pub system_ssl_cert_file: String,
    /// Run live database connectivity checks
    pub database_health_check_enabled: bool,
    /// Run live object store connectivity checks
    pub object_store_health_check_enabled: bool,
    pub images: ComponentImages,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            requeue_secs: DEFAULT_REQUEUE_SECS,
            resync_secs: DEFAULT_RESYNC_SECS,
            conflict_requeue_secs: DEFAULT_CONFLICT_REQUEUE_SECS,
            max_backoff_secs: DEFAULT_MAX_BACKOFF_SECS,
            db_connection_timeout_secs: DEFAULT_DB_CONNECTION_TIMEOUT_SECS,
            object_store_connection_timeout_secs: DEFAULT_OBJECT_STORE_CONNECTION_TIMEOUT_SECS,
            max_concurrent_reconciles: DEFAULT_MAX_CONCURRENT_RECONCILES,
            include_owner_reference: DEFAULT_INCLUDE_OWNER_REFERENCE,
            operator_namespace: DEFAULT_OPERATOR_NAMESPACE.to_string(),
            system_ssl_cert_file: DEFAULT_SYSTEM_SSL_CERT_FILE_PATH.to_string(),
            database_health_check_enabled: true,
            object_store_health_check_enabled: true,
            images: ComponentImages::default(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            requeue_secs: env_var_or_default("REQUEUE_TIME_SECS", DEFAULT_REQUEUE_SECS),
            resync_secs: env_var_or_default("RESYNC_TIME_SECS", DEFAULT_RESYNC_SECS),
            conflict_requeue_secs: env_var_or_default(
                "CONFLICT_REQUEUE_SECS",
                DEFAULT_CONFLICT_REQUEUE_SECS,
            ),
            max_backoff_secs: env_var_or_default("MAX_BACKOFF_SECS", DEFAULT_MAX_BACKOFF_SECS),
            db_connection_timeout_secs: env_var_or_default(
                "DB_CONNECTION_TIMEOUT_SECS",
                DEFAULT_DB_CONNECTION_TIMEOUT_SECS,
            ),
            object_store_connection_timeout_secs: env_var_or_default(
                "OBJECT_STORE_CONNECTION_TIMEOUT_SECS",
                DEFAULT_OBJECT_STORE_CONNECTION_TIMEOUT_SECS,
            ),
            max_concurrent_reconciles: env_var_or_default(
                "MAX_CONCURRENT_RECONCILES",
                DEFAULT_MAX_CONCURRENT_RECONCILES,
            ),
            include_owner_reference: env_var_or_default(
                "INCLUDE_OWNER_REFERENCE",
                DEFAULT_INCLUDE_OWNER_REFERENCE,
            ),
            operator_namespace: env_var_or_default(
                "OPERATOR_NAMESPACE",
                DEFAULT_OPERATOR_NAMESPACE.to_string(),
            ),
            system_ssl_cert_file: env_var_or_default(
                "SSL_CERT_FILE",
                DEFAULT_SYSTEM_SSL_CERT_FILE_PATH.to_string(),
            ),
            database_health_check_enabled: env_var_or_default("HEALTHCHECK_DATABASE", true),
            object_store_health_check_enabled: env_var_or_default(
                "HEALTHCHECK_OBJECTSTORE",
                true,
            ),
            images: ComponentImages::from_env(),
        }
    }

    pub fn requeue(&self) -> Duration {
        Duration::from_secs(self.requeue_secs)
    }

    pub fn resync(&self) -> Duration {
        Duration::from_secs(self.resync_secs)
    }

    pub fn conflict_requeue(&self) -> Duration {
        Duration::from_secs(self.conflict_requeue_secs)
    }

    pub fn db_connection_timeout(&self) -> Duration {
        Duration::from_secs(self.db_connection_timeout_secs)
    }

    pub fn object_store_connection_timeout(&self) -> Duration {
        Duration::from_secs(self.object_store_connection_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_controller_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.requeue(), Duration::from_secs(20));
        assert_eq!(config.db_connection_timeout(), Duration::from_secs(15));
        assert_eq!(config.object_store_connection_timeout(), Duration::from_secs(15));
        assert_eq!(config.max_concurrent_reconciles, 10);
        assert!(config.include_owner_reference);
        assert_eq!(config.system_ssl_cert_file, "/etc/pki/tls/certs/ca-bundle.crt");
    }

    #[test]
    fn test_default_images_are_placeholders() {
        let images = ComponentImages::default();
        assert_eq!(images.api_server, DEFAULT_IMAGE_VALUE);
        assert_eq!(images.webhook, DEFAULT_IMAGE_VALUE);
        assert!(images.minio.is_none());
    }
}
