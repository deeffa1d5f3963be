//! # Liveness Probes
//!
//! Live round-trips against the resolved database and object store.
//!
//! Each probe makes exactly one short-lived connection attempt, bounded by a timeout,
//! and never retries; retrying is the control loop's job. Probe implementations are
//! passed to the reconcilers explicitly through [`Probes`], so tests swap in
//! [`StaticProbe`] without any process-wide state.

mod database;
mod object_store;

pub use database::SqlDatabaseProbe;
pub use object_store::S3ObjectStoreProbe;

use crate::controller::params::{Credential, ResolvedParameters};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Probe failures; always absorbed into the owning component's condition
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    #[error("unable to connect: {0}")]
    Connect(String),
    #[error("connectivity check failed: {0}")]
    Check(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid connection parameters: {0}")]
    InvalidParameters(String),
}

/// Database connection material for one probe
#[derive(Debug, Clone)]
pub struct DatabaseProbeRequest {
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: Credential,
    pub db_name: String,
    /// `"true"`, `"skip-verify"`, `"preferred"` or anything else for plaintext
    pub tls_mode: String,
    /// Combined trust bundle; empty means default system trust
    pub ca_pem: String,
    pub extra_params: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl DatabaseProbeRequest {
    pub fn from_params(params: &ResolvedParameters, timeout: Duration) -> Self {
        let db = &params.database;
        Self {
            host: db.host.clone(),
            port: db.port.clone(),
            username: db.username.clone(),
            password: db.password.clone(),
            db_name: db.db_name.clone(),
            tls_mode: db.tls_mode().to_string(),
            ca_pem: params.trust.combined(),
            extra_params: db.extra_params.clone(),
            timeout,
        }
    }
}

/// Object store connection material for one probe
#[derive(Debug, Clone)]
pub struct ObjectStoreProbeRequest {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key: Credential,
    pub secret_key: Credential,
    pub secure: bool,
    pub ca_pem: String,
    pub timeout: Duration,
}

impl ObjectStoreProbeRequest {
    pub fn from_params(params: &ResolvedParameters, timeout: Duration) -> Self {
        let os = &params.object_storage;
        Self {
            endpoint: os.endpoint.clone(),
            bucket: os.bucket.clone(),
            region: os.region.clone(),
            access_key: os.access_key.clone(),
            secret_key: os.secret_key.clone(),
            secure: os.secure,
            ca_pem: params.trust.combined(),
            timeout,
        }
    }
}

#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    /// `Ok(())` when a connection was opened and a trivial query answered
    async fn probe(&self, request: &DatabaseProbeRequest) -> Result<(), ProbeError>;
}

#[async_trait]
pub trait ObjectStoreProbe: Send + Sync {
    /// `Ok(())` when the bucket answered an object metadata request
    async fn probe(&self, request: &ObjectStoreProbeRequest) -> Result<(), ProbeError>;
}

/// Probe implementations handed to the reconcilers
#[derive(Clone)]
pub struct Probes {
    pub database: Arc<dyn DatabaseProbe>,
    pub object_store: Arc<dyn ObjectStoreProbe>,
}

impl Probes {
    /// Real network probes
    pub fn live() -> Self {
        Self {
            database: Arc::new(SqlDatabaseProbe),
            object_store: Arc::new(S3ObjectStoreProbe),
        }
    }

    /// Fixed outcomes, used by tests and dry runs
    pub fn fixed(database: Result<(), ProbeError>, object_store: Result<(), ProbeError>) -> Self {
        Self {
            database: Arc::new(StaticProbe::new(database)),
            object_store: Arc::new(StaticProbe::new(object_store)),
        }
    }
}

/// Probe that always returns the same outcome and counts invocations
#[derive(Debug)]
pub struct StaticProbe {
    outcome: Result<(), ProbeError>,
    calls: std::sync::atomic::AtomicUsize,
}

impl StaticProbe {
    pub fn new(outcome: Result<(), ProbeError>) -> Self {
        Self {
            outcome,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn record(&self) -> Result<(), ProbeError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.outcome.clone()
    }
}

#[async_trait]
impl DatabaseProbe for StaticProbe {
    async fn probe(&self, _request: &DatabaseProbeRequest) -> Result<(), ProbeError> {
        self.record()
    }
}

#[async_trait]
impl ObjectStoreProbe for StaticProbe {
    async fn probe(&self, _request: &ObjectStoreProbeRequest) -> Result<(), ProbeError> {
        self.record()
    }
}
