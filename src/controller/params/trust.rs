//! # Trust Resolution
//!
//! Merges CA certificate sources into one ordered [`TrustBundle`].
//!
//! Sources are evaluated in a fixed precedence, each contributing at most one block:
//!
//! | Order | Source | Contributes when |
//! |-------|--------|------------------|
//! | 1 | Service CA (`openshift-service-ca.crt`) | pod-to-pod TLS is enabled |
//! | 2 | Platform bundle (`odh-trusted-ca-bundle`) | one block per non-empty value |
//! | 3 | User bundle (`apiServer.cABundle`) | referenced and non-empty |
//! | 4 | System trust file | another source contributed and the platform bundle has no `ca-bundle.crt` key |
//!
//! Blocks are concatenated as-is, never de-duplicated.

use super::lookup::{config_map_value, ClusterReader};
use super::ParamsError;
use crate::constants::*;
use crate::crd::CaBundle;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Where a trust block came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustSource {
    ServiceCa,
    Platform,
    User,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustBlock {
    pub source: TrustSource,
    pub pem: String,
}

/// Ordered PEM blocks with provenance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustBundle {
    blocks: Vec<TrustBlock>,
}

impl TrustBundle {
    pub fn blocks(&self) -> &[TrustBlock] {
        &self.blocks
    }

    pub fn pems(&self) -> Vec<&str> {
        self.blocks.iter().map(|b| b.pem.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All blocks joined with newlines, as written to the combined ConfigMap
    pub fn combined(&self) -> String {
        self.pems().join("\n")
    }

    fn push(&mut self, source: TrustSource, pem: &str) {
        if !pem.trim().is_empty() {
            self.blocks.push(TrustBlock {
                source,
                pem: pem.to_string(),
            });
        }
    }
}

/// Raw trust material, already fetched
#[derive(Debug, Clone, Default)]
pub struct TrustSources {
    pub service_ca: Option<String>,
    /// Platform bundle ConfigMap data, `None` when the ConfigMap is absent
    pub platform: Option<BTreeMap<String, String>>,
    pub user: Option<String>,
    pub system: Option<String>,
}

/// Apply the precedence rules to already-fetched material
pub fn assemble(sources: &TrustSources) -> TrustBundle {
    let mut bundle = TrustBundle::default();

    if let Some(service_ca) = &sources.service_ca {
        bundle.push(TrustSource::ServiceCa, service_ca);
    }

    let mut platform_has_system_key = false;
    if let Some(platform) = &sources.platform {
        for value in platform.values() {
            bundle.push(TrustSource::Platform, value);
        }
        platform_has_system_key = platform.contains_key(PLATFORM_CA_BUNDLE_SYSTEM_KEY);
    }

    if let Some(user) = &sources.user {
        bundle.push(TrustSource::User, user);
    }

    if !bundle.is_empty() && !platform_has_system_key {
        if let Some(system) = &sources.system {
            bundle.push(TrustSource::System, system);
        }
    }

    bundle
}

/// Inputs for [`resolve_trust`]
#[derive(Debug, Clone, Copy)]
pub struct TrustRequest<'a> {
    pub user_bundle: Option<&'a CaBundle>,
    pub pod_to_pod_tls: bool,
    pub system_trust_file: &'a Path,
}

/// Fetch every source from the cluster and assemble the bundle
///
/// # Errors
///
/// - `NotFound` when the referenced user ConfigMap does not exist, or when pod-to-pod
///   TLS is enabled and the service CA ConfigMap does not exist
/// - `Malformed` when the service CA ConfigMap has no certificate
pub async fn resolve_trust(
    reader: &dyn ClusterReader,
    namespace: &str,
    request: TrustRequest<'_>,
) -> Result<TrustBundle, ParamsError> {
    let mut sources = TrustSources::default();

    if request.pod_to_pod_tls {
        let config_map = reader
            .get_config_map(namespace, SERVICE_CA_CONFIGMAP)
            .await?
            .ok_or_else(|| ParamsError::not_found("ConfigMap", SERVICE_CA_CONFIGMAP, namespace))?;
        let value = config_map_value(&config_map, SERVICE_CA_CONFIGMAP_KEY)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                ParamsError::malformed(
                    "ConfigMap",
                    SERVICE_CA_CONFIGMAP,
                    format!("expected key \"{SERVICE_CA_CONFIGMAP_KEY}\" not found"),
                )
            })?;
        sources.service_ca = Some(value);
    }

    if let Some(platform) = reader
        .get_config_map(namespace, PLATFORM_CA_BUNDLE_CONFIGMAP)
        .await?
    {
        info!(
            "Found platform CA bundle {} in namespace {}, including it in external TLS connections",
            PLATFORM_CA_BUNDLE_CONFIGMAP, namespace
        );
        sources.platform = Some(platform.data.unwrap_or_default());
    }

    if let Some(user_bundle) = request.user_bundle {
        let config_map = reader
            .get_config_map(namespace, &user_bundle.config_map_name)
            .await?
            .ok_or_else(|| {
                ParamsError::not_found("ConfigMap", &user_bundle.config_map_name, namespace)
            })?;
        sources.user = config_map_value(&config_map, &user_bundle.config_map_key);
        if sources.user.is_none() {
            debug!(
                "ConfigMap {} has no key {}, skipping user CA bundle",
                user_bundle.config_map_name, user_bundle.config_map_key
            );
        }
    }

    sources.system = read_system_trust_file(request.system_trust_file).await;

    Ok(assemble(&sources))
}

/// A missing or unreadable system file counts as empty
async fn read_system_trust_file(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Some(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Unable to read system trust file {}: {}", path.display(), e);
            None
        }
    }
}

/// Filesystem location every consumer of the bundle agrees on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaMount {
    pub root_mount_path: String,
    pub file_name: String,
    /// `<root>/<file>`
    pub bundle_file_path: String,
    /// Combined bundle ConfigMap, set only when the bundle is non-empty
    pub config_map_name: Option<String>,
    /// `SSL_CERT_DIR` value for the API server, set only when the bundle is non-empty
    pub ssl_cert_dir: Option<String>,
}

impl CaMount {
    pub fn new(
        instance: &str,
        mount_path_override: Option<&str>,
        file_name_override: Option<&str>,
        bundle: &TrustBundle,
    ) -> Self {
        let root_mount_path = mount_path_override
            .filter(|p| !p.is_empty())
            .unwrap_or(CUSTOM_CA_BUNDLE_ROOT_MOUNT_PATH)
            .to_string();
        let file_name = file_name_override
            .filter(|f| !f.is_empty())
            .unwrap_or(DSP_TRUSTED_CA_CONFIGMAP_KEY)
            .to_string();
        let bundle_file_path = format!("{root_mount_path}/{file_name}");

        let (config_map_name, ssl_cert_dir) = if bundle.is_empty() {
            (None, None)
        } else {
            let mut dirs = vec![root_mount_path.as_str()];
            dirs.extend(SYSTEM_CERT_DIRS);
            (
                Some(format!("{DSP_TRUSTED_CA_CONFIGMAP_PREFIX}-{instance}")),
                Some(dirs.join(":")),
            )
        };

        Self {
            root_mount_path,
            file_name,
            bundle_file_path,
            config_map_name,
            ssl_cert_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(entries: &[(&str, &str)]) -> Option<BTreeMap<String, String>> {
        Some(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_platform_then_user() {
        let bundle = assemble(&TrustSources {
            platform: platform(&[("odh-ca-bundle.crt", "A")]),
            user: Some("B".to_string()),
            ..Default::default()
        });
        assert_eq!(bundle.pems(), vec!["A", "B"]);
    }

    #[test]
    fn test_service_ca_first() {
        let bundle = assemble(&TrustSources {
            service_ca: Some("S".to_string()),
            platform: platform(&[("odh-ca-bundle.crt", "A")]),
            user: Some("B".to_string()),
            ..Default::default()
        });
        assert_eq!(bundle.pems(), vec!["S", "A", "B"]);
        assert_eq!(bundle.blocks()[0].source, TrustSource::ServiceCa);
    }

    #[test]
    fn test_blank_values_dropped() {
        let bundle = assemble(&TrustSources {
            platform: platform(&[("ca-bundle.crt", "  \n"), ("odh-ca-bundle.crt", "")]),
            user: Some(String::new()),
            system: Some("SYS".to_string()),
            ..Default::default()
        });
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_system_file_appended_when_platform_lacks_system_key() {
        let bundle = assemble(&TrustSources {
            platform: platform(&[("odh-ca-bundle.crt", "A")]),
            system: Some("SYS".to_string()),
            ..Default::default()
        });
        assert_eq!(bundle.pems(), vec!["A", "SYS"]);
        assert_eq!(bundle.blocks()[1].source, TrustSource::System);
    }

    #[test]
    fn test_system_file_skipped_when_platform_has_system_key() {
        let bundle = assemble(&TrustSources {
            platform: platform(&[("ca-bundle.crt", "SYSBUNDLE"), ("odh-ca-bundle.crt", "A")]),
            system: Some("SYS".to_string()),
            ..Default::default()
        });
        assert_eq!(bundle.pems(), vec!["SYSBUNDLE", "A"]);
    }

    #[test]
    fn test_system_file_alone_contributes_nothing() {
        let bundle = assemble(&TrustSources {
            system: Some("SYS".to_string()),
            ..Default::default()
        });
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_combined_is_newline_joined() {
        let bundle = assemble(&TrustSources {
            service_ca: Some("S".to_string()),
            user: Some("B".to_string()),
            ..Default::default()
        });
        assert_eq!(bundle.combined(), "S\nB");
    }

    #[test]
    fn test_ca_mount_defaults() {
        let mount = CaMount::new("sample", None, None, &TrustBundle::default());
        assert_eq!(mount.bundle_file_path, "/dsp-custom-certs/dsp-ca.crt");
        assert!(mount.config_map_name.is_none());
        assert!(mount.ssl_cert_dir.is_none());
    }

    #[test]
    fn test_ca_mount_with_bundle_and_overrides() {
        let bundle = assemble(&TrustSources {
            user: Some("B".to_string()),
            ..Default::default()
        });
        let mount = CaMount::new("sample", Some("/certs"), Some("bundle.pem"), &bundle);
        assert_eq!(mount.bundle_file_path, "/certs/bundle.pem");
        assert_eq!(mount.config_map_name.as_deref(), Some("dsp-trusted-ca-sample"));
        assert_eq!(
            mount.ssl_cert_dir.as_deref(),
            Some("/certs:/etc/ssl/certs:/etc/pki/tls/certs")
        );
    }
}
