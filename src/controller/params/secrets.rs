//! # Credentials
//!
//! Stored credential lookup and managed-backend credential generation.
//!
//! Managed backends generate a random alphanumeric credential when their Secret does
//! not exist yet; the generated value is then written by the owning component so the
//! next pass reads it back. External backends never generate: a missing Secret is a
//! `NotFound` error naming the Secret.

use super::lookup::{secret_value, ClusterReader};
use super::ParamsError;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use std::fmt;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// A secret value, wiped from memory on drop and redacted in debug output
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Generate a random alphanumeric credential from the OS random source
pub fn generate_credential(length: usize) -> Credential {
    let value: String = OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();
    Credential::new(value)
}

/// Read one key of an existing Secret
///
/// # Errors
///
/// `NotFound` when the Secret does not exist, `Malformed` when the key is missing
/// or empty.
pub async fn retrieve_credential(
    reader: &dyn ClusterReader,
    namespace: &str,
    secret_name: &str,
    key: &str,
) -> Result<Credential, ParamsError> {
    let secret = reader
        .get_secret(namespace, secret_name)
        .await?
        .ok_or_else(|| ParamsError::not_found("Secret", secret_name, namespace))?;

    match secret_value(&secret, key) {
        Some(value) if !value.is_empty() => Ok(Credential::new(value)),
        _ => Err(ParamsError::malformed(
            "Secret",
            secret_name,
            format!("key \"{key}\" is missing or empty"),
        )),
    }
}

/// Read the requested keys of a managed-backend Secret, generating all of them when
/// the Secret does not exist
///
/// Returns the credentials in the order of `keys` and whether they were generated.
///
/// # Errors
///
/// `Malformed` when the Secret exists but lacks one of the keys.
pub async fn retrieve_or_generate_credentials(
    reader: &dyn ClusterReader,
    namespace: &str,
    secret_name: &str,
    keys: &[(&str, usize)],
) -> Result<(Vec<Credential>, bool), ParamsError> {
    match reader.get_secret(namespace, secret_name).await? {
        Some(secret) => {
            debug!("Secret [{}] already exists, using stored value", secret_name);
            let mut values = Vec::with_capacity(keys.len());
            for (key, _) in keys {
                match secret_value(&secret, key) {
                    Some(value) if !value.is_empty() => values.push(Credential::new(value)),
                    _ => {
                        return Err(ParamsError::malformed(
                            "Secret",
                            secret_name,
                            format!("key \"{key}\" is missing or empty"),
                        ))
                    }
                }
            }
            Ok((values, false))
        }
        None => {
            info!(
                "Secret [{}] not found in namespace [{}], generating credentials",
                secret_name, namespace
            );
            let values = keys
                .iter()
                .map(|(_, length)| generate_credential(*length))
                .collect();
            Ok((values, true))
        }
    }
}
