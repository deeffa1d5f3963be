//! # Constants
//!
//! Shared names, ports, defaults and condition vocabulary.

// Field manager / finalizer
pub const FIELD_MANAGER: &str = "pipelines-application-controller";
pub const FINALIZER_NAME: &str = "datasciencepipelinesapplications.opendatahub.io/finalizer";
pub const RECONCILE_ANNOTATION: &str = "datasciencepipelinesapplications.opendatahub.io/reconcile";

// Labels applied to every rendered object
pub const LABEL_APP: &str = "app";
pub const LABEL_COMPONENT: &str = "component";
pub const LABEL_INSTANCE: &str = "dspa";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const COMPONENT_LABEL_VALUE: &str = "data-science-pipelines";
/// Selector for the owned objects the controller watches
pub const LABEL_MANAGED_BY_SELECTOR: &str =
    "app.kubernetes.io/managed-by=pipelines-application-controller";

// DSP versions
pub const DSP_VERSION_V1: &str = "v1";
pub const DSP_VERSION_V2: &str = "v2";

pub const DEFAULT_IMAGE_VALUE: &str = "MustSetInConfig";

// Trust material
pub const CUSTOM_CA_BUNDLE_ROOT_MOUNT_PATH: &str = "/dsp-custom-certs";
pub const PLATFORM_CA_BUNDLE_CONFIGMAP: &str = "odh-trusted-ca-bundle";
pub const PLATFORM_CA_BUNDLE_SYSTEM_KEY: &str = "ca-bundle.crt";
pub const DSP_TRUSTED_CA_CONFIGMAP_PREFIX: &str = "dsp-trusted-ca";
pub const DSP_TRUSTED_CA_CONFIGMAP_KEY: &str = "dsp-ca.crt";
pub const SERVICE_CA_CONFIGMAP: &str = "openshift-service-ca.crt";
pub const SERVICE_CA_CONFIGMAP_KEY: &str = "service-ca.crt";
pub const SYSTEM_CERT_DIRS: [&str; 2] = ["/etc/ssl/certs", "/etc/pki/tls/certs"];
pub const DEFAULT_SYSTEM_SSL_CERT_FILE_PATH: &str = "/etc/pki/tls/certs/ca-bundle.crt";

// API server
pub const DSP_SERVICE_PREFIX: &str = "ds-pipeline";
pub const CUSTOM_SERVER_CONFIGMAP_PREFIX: &str = "ds-pipeline-server-config-";
pub const CUSTOM_SERVER_CONFIGMAP_KEY: &str = "config.json";
pub const SAMPLE_CONFIGMAP_PREFIX: &str = "sample-config-";
pub const DEFAULT_SIGNED_URL_EXPIRY_SECONDS: i32 = 60;
pub const API_SERVER_HTTPS_PORT: i32 = 8443;
pub const API_SERVER_HTTP_PORT: i32 = 8888;
pub const API_SERVER_GRPC_PORT: i32 = 8887;
pub const PIPELINE_STORE_KUBERNETES: &str = "kubernetes";
pub const PIPELINE_STORE_DATABASE: &str = "database";
pub const KFP_LAUNCHER_CONFIGMAP: &str = "kfp-launcher";
pub const SAMPLE_CONFIG_HASH_ANNOTATION: &str = "datasciencepipelinesapplications.opendatahub.io/sample-config-hash";
pub const UI_PORT: i32 = 3000;

// Managed database
pub const MARIADB_HOST_PREFIX: &str = "mariadb";
pub const MARIADB_PORT: &str = "3306";
pub const MARIADB_USER: &str = "mlpipeline";
pub const MARIADB_DB_NAME: &str = "mlpipeline";
pub const MARIADB_PVC_SIZE: &str = "10Gi";
pub const DEFAULT_DB_SECRET_PREFIX: &str = "ds-pipeline-db-";
pub const DEFAULT_DB_SECRET_KEY: &str = "password";
pub const GENERATED_DB_PASSWORD_LENGTH: usize = 12;

// Managed object store
pub const MINIO_HOST_PREFIX: &str = "minio";
pub const MINIO_PORT: &str = "9000";
pub const MINIO_SCHEME: &str = "http";
pub const MINIO_REGION: &str = "minio";
pub const MINIO_DEFAULT_BUCKET: &str = "mlpipeline";
pub const MINIO_PVC_SIZE: &str = "10Gi";
pub const EXTERNAL_STORAGE_DEFAULT_REGION: &str = "auto";
pub const DEFAULT_OBJECT_STORAGE_SECRET_PREFIX: &str = "ds-pipeline-s3-";
pub const DEFAULT_OBJECT_STORAGE_ACCESS_KEY: &str = "accesskey";
pub const DEFAULT_OBJECT_STORAGE_SECRET_KEY: &str = "secretkey";
pub const GENERATED_ACCESS_KEY_LENGTH: usize = 16;
pub const GENERATED_SECRET_KEY_LENGTH: usize = 24;
pub const OBJECT_STORE_PROBE_KEY: &str = "some-random-object";

// MLMD
pub const MLMD_GRPC_PORT: &str = "8080";
pub const MLMD_ENVOY_HTTPS_PORT: i32 = 8443;
pub const MLMD_PROXY_SERVICE_PREFIX: &str = "ds-pipeline-md";

// Webhook
pub const OPERATOR_DEPLOYMENT_NAME: &str = "data-science-pipelines-operator-controller-manager";
pub const WEBHOOK_NAME: &str = "ds-pipelines-webhook";
pub const WEBHOOK_CONFIGURATION_NAME: &str = "pipelineversions.pipelines.kubeflow.org";
pub const WEBHOOK_PORT: i32 = 8443;
pub const WEBHOOK_REQUESTS_CPU: &str = "50m";
pub const WEBHOOK_REQUESTS_MEMORY: &str = "64Mi";
pub const WEBHOOK_LIMITS_CPU: &str = "200m";
pub const WEBHOOK_LIMITS_MEMORY: &str = "256Mi";

// Condition types, in persisted order
pub const DATABASE_AVAILABLE: &str = "DatabaseAvailable";
pub const OBJECT_STORE_AVAILABLE: &str = "ObjectStoreAvailable";
pub const MLMD_PROXY_READY: &str = "MLMDProxyReady";
pub const API_SERVER_READY: &str = "APIServerReady";
pub const PERSISTENCE_AGENT_READY: &str = "PersistenceAgentReady";
pub const SCHEDULED_WORKFLOW_READY: &str = "ScheduledWorkflowReady";
pub const WORKFLOW_CONTROLLER_READY: &str = "WorkflowControllerReady";
pub const ML_PIPELINE_UI_READY: &str = "MLPipelineUIReady";
pub const WEBHOOK_READY: &str = "WebhookReady";
pub const CR_READY: &str = "Ready";

// Condition reasons
pub const REASON_MINIMUM_REPLICAS_AVAILABLE: &str = "MinimumReplicasAvailable";
pub const REASON_DEPLOYING: &str = "Deploying";
pub const REASON_FAILING_TO_DEPLOY: &str = "FailingToDeploy";
pub const REASON_DEPLOYMENT_NOT_FOUND: &str = "ComponentDeploymentNotFound";
pub const REASON_NOT_APPLICABLE: &str = "NotApplicable";
pub const REASON_UNKNOWN: &str = "Unknown";
pub const REASON_DATABASE_UNAVAILABLE: &str = "DatabaseUnavailable";
pub const REASON_OBJECT_STORE_UNAVAILABLE: &str = "ObjectStoreUnavailable";
pub const REASON_CONFIGURATION_ERROR: &str = "ConfigurationError";
pub const REASON_MISSING_DEPENDENCY: &str = "MissingDependency";
pub const REASON_RECONCILE_FAILED: &str = "ReconcileFailed";

// Controller defaults
pub const DEFAULT_REQUEUE_SECS: u64 = 20;
pub const DEFAULT_RESYNC_SECS: u64 = 300;
pub const DEFAULT_CONFLICT_REQUEUE_SECS: u64 = 1;
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 600;
pub const DEFAULT_DB_CONNECTION_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_OBJECT_STORE_CONNECTION_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 10;
pub const DEFAULT_INCLUDE_OWNER_REFERENCE: bool = true;
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "opendatahub";

// Server defaults
pub const DEFAULT_METRICS_PORT: u16 = 5000;
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

// Watch defaults
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;
pub const DEFAULT_WATCH_MAX_BACKOFF_MS: u64 = 30_000;
pub const DEFAULT_WATCH_INITIAL_BACKOFF_MS: u64 = 1_000;
