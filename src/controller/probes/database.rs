//! MySQL-compatible database probe.

use super::{DatabaseProbe, DatabaseProbeRequest, ProbeError};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
use sqlx::{ConnectOptions, Connection};
use tracing::debug;

/// Opens one connection, runs `SELECT 1` and closes it
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlDatabaseProbe;

pub(crate) fn ssl_mode(tls_mode: &str) -> MySqlSslMode {
    match tls_mode {
        "true" => MySqlSslMode::VerifyIdentity,
        "skip-verify" => MySqlSslMode::Required,
        "preferred" => MySqlSslMode::Preferred,
        _ => MySqlSslMode::Disabled,
    }
}

pub(crate) fn connect_options(
    request: &DatabaseProbeRequest,
) -> Result<MySqlConnectOptions, ProbeError> {
    let port: u16 = request.port.parse().map_err(|_| {
        ProbeError::InvalidParameters(format!("database port \"{}\" is not a number", request.port))
    })?;
    let mode = ssl_mode(&request.tls_mode);

    let mut options = MySqlConnectOptions::new()
        .host(&request.host)
        .port(port)
        .username(&request.username)
        .password(request.password.expose())
        .database(&request.db_name)
        .ssl_mode(mode);

    if matches!(mode, MySqlSslMode::VerifyIdentity) && !request.ca_pem.trim().is_empty() {
        options = options.ssl_ca_from_pem(request.ca_pem.as_bytes().to_vec());
    }

    for (key, value) in &request.extra_params {
        match key.as_str() {
            "tls" => {}
            "charset" => options = options.charset(value),
            "collation" => options = options.collation(value),
            other => debug!("Ignoring database parameter {} for connectivity check", other),
        }
    }

    Ok(options)
}

#[async_trait]
impl DatabaseProbe for SqlDatabaseProbe {
    async fn probe(&self, request: &DatabaseProbeRequest) -> Result<(), ProbeError> {
        let options = connect_options(request)?;

        let check = async {
            let mut connection = options
                .connect()
                .await
                .map_err(|e| ProbeError::Connect(e.to_string()))?;
            sqlx::query("SELECT 1")
                .execute(&mut connection)
                .await
                .map_err(|e| ProbeError::Check(e.to_string()))?;
            connection
                .close()
                .await
                .map_err(|e| ProbeError::Check(e.to_string()))
        };

        tokio::time::timeout(request.timeout, check)
            .await
            .map_err(|_| ProbeError::Timeout(request.timeout))?
    }
}
