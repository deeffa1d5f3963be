//! S3-compatible object store probe.

use super::{ObjectStoreProbe, ObjectStoreProbeRequest, ProbeError};
use crate::constants::OBJECT_STORE_PROBE_KEY;
use async_trait::async_trait;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{Certificate, ClientOptions, ObjectStore, RetryConfig};

/// Issues one metadata request for a fixed key; "not found" still proves the
/// endpoint, credentials and bucket are usable
#[derive(Debug, Clone, Copy, Default)]
pub struct S3ObjectStoreProbe;

pub(crate) fn build_store(request: &ObjectStoreProbeRequest) -> Result<AmazonS3, ProbeError> {
    let mut client_options = ClientOptions::new()
        .with_timeout(request.timeout)
        .with_connect_timeout(request.timeout)
        .with_allow_http(!request.secure);

    if request.secure && !request.ca_pem.trim().is_empty() {
        let certificates = Certificate::from_pem_bundle(request.ca_pem.as_bytes())
            .map_err(|e| ProbeError::InvalidParameters(format!("CA bundle: {e}")))?;
        for certificate in certificates {
            client_options = client_options.with_root_certificate(certificate);
        }
    }

    AmazonS3Builder::new()
        .with_endpoint(&request.endpoint)
        .with_bucket_name(&request.bucket)
        .with_region(&request.region)
        .with_access_key_id(request.access_key.expose())
        .with_secret_access_key(request.secret_key.expose())
        .with_allow_http(!request.secure)
        .with_virtual_hosted_style_request(false)
        .with_client_options(client_options)
        .with_retry(RetryConfig {
            max_retries: 0,
            ..Default::default()
        })
        .build()
        .map_err(|e| ProbeError::InvalidParameters(e.to_string()))
}

#[async_trait]
impl ObjectStoreProbe for S3ObjectStoreProbe {
    async fn probe(&self, request: &ObjectStoreProbeRequest) -> Result<(), ProbeError> {
        let store = build_store(request)?;
        let location = Path::from(OBJECT_STORE_PROBE_KEY);

        match tokio::time::timeout(request.timeout, store.head(&location)).await {
            Err(_) => Err(ProbeError::Timeout(request.timeout)),
            Ok(Ok(_)) | Ok(Err(object_store::Error::NotFound { .. })) => Ok(()),
            Ok(Err(e)) => Err(ProbeError::Check(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::params::Credential;
    use std::time::Duration;

    fn request(ca_pem: &str) -> ObjectStoreProbeRequest {
        ObjectStoreProbeRequest {
            endpoint: "https://s3.example.com".to_string(),
            bucket: "pipelines".to_string(),
            region: "auto".to_string(),
            access_key: Credential::new("access"),
            secret_key: Credential::new("secret"),
            secure: true,
            ca_pem: ca_pem.to_string(),
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_builds_without_bundle() {
        assert!(build_store(&request("")).is_ok());
    }
}
