//! Database and object storage backend selection, credentials and trust material.

use super::fakes::*;
use pipelines_application_controller::constants::*;
use pipelines_application_controller::controller::errors::ErrorClass;
use pipelines_application_controller::controller::probes::{ProbeError, Probes, StaticProbe};
use pipelines_application_controller::crd::{
    ApiServer, CaBundle, Database, DataSciencePipelinesApplicationSpec, ExternalDb, MariaDb,
    SecretKeyValue,
};
use std::sync::Arc;

fn external_db_spec() -> DataSciencePipelinesApplicationSpec {
    DataSciencePipelinesApplicationSpec {
        database: Some(Database {
            external_db: Some(ExternalDb {
                host: "mysql.example.com".to_string(),
                port: "3306".to_string(),
                username: "pipelines".to_string(),
                db_name: "pipelines".to_string(),
                password_secret: SecretKeyValue {
                    name: "db-creds".to_string(),
                    key: "password".to_string(),
                },
            }),
            maria_db: Some(MariaDb {
                deploy: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..minimal_spec()
    }
}

#[tokio::test]
async fn test_managed_backends_generate_credentials_once() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;
    let db_secret = "Secret/team-a/ds-pipeline-db-sample";
    let s3_secret = "Secret/team-a/ds-pipeline-s3-sample";
    let first = cluster.applied();
    assert!(first.contains_key(db_secret));
    assert!(first.contains_key(s3_secret));
    assert!(first.contains_key("Deployment/team-a/mariadb-sample"));
    assert!(first.contains_key("Deployment/team-a/minio-sample"));

    pass(&cluster, &mut dspa).await;
    let second = cluster.applied();
    assert_eq!(first[db_secret].data, second[db_secret].data);
    assert_eq!(first[s3_secret].data, second[s3_secret].data);
}

#[tokio::test]
async fn test_stored_credentials_are_reused() {
    let cluster = FakeCluster::new().with_secret(
        NAMESPACE,
        "ds-pipeline-db-sample",
        &[("password", "stored-password")],
    );
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;

    assert!(!cluster
        .applied_keys()
        .contains(&"Secret/team-a/ds-pipeline-db-sample".to_string()));
}

#[tokio::test]
async fn test_external_database_wins_over_managed() {
    let cluster = FakeCluster::new().with_secret(NAMESPACE, "db-creds", &[("password", "s3cr3t")]);
    let mut dspa = application(external_db_spec());

    let outcome = pass(&cluster, &mut dspa).await;

    assert!(outcome.error.is_none());
    let keys = cluster.applied_keys();
    assert!(!keys.iter().any(|k| k.contains("mariadb-sample")));
    assert!(!keys.iter().any(|k| k.contains("ds-pipeline-db-sample")));
    assert_eq!(condition(&outcome, DATABASE_AVAILABLE).status, "True");
}

#[tokio::test]
async fn test_missing_external_secret_names_the_secret() {
    let cluster = FakeCluster::new();
    let mut dspa = application(external_db_spec());

    let outcome = pass(&cluster, &mut dspa).await;

    let error = outcome.error.as_ref().expect("pass must fail");
    assert_eq!(error.class(), ErrorClass::MissingDependency);
    let ready = condition(&outcome, CR_READY);
    assert_eq!(ready.status, "False");
    assert_eq!(ready.reason.as_deref(), Some(REASON_MISSING_DEPENDENCY));
    assert!(ready.message.as_deref().unwrap_or_default().contains("db-creds"));
    assert!(cluster.applied().is_empty());
}

#[tokio::test]
async fn test_probe_failure_is_absorbed() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());
    let probes = Probes::fixed(
        Err(ProbeError::Connect("connection refused".to_string())),
        Ok(()),
    );

    let outcome = pass_with(&cluster, &mut dspa, &probes, &config()).await;

    assert!(outcome.error.is_none());
    let db = condition(&outcome, DATABASE_AVAILABLE);
    assert_eq!(db.status, "False");
    assert_eq!(db.reason.as_deref(), Some(REASON_DATABASE_UNAVAILABLE));
    assert!(db.message.as_deref().unwrap_or_default().contains("connection refused"));
    assert_eq!(condition(&outcome, OBJECT_STORE_AVAILABLE).status, "True");
    // Later components still ran
    assert!(cluster
        .applied_keys()
        .contains(&"Deployment/team-a/ds-pipeline-sample".to_string()));
}

#[tokio::test]
async fn test_disabled_health_check_skips_probe() {
    let cluster = FakeCluster::new();
    let mut spec = minimal_spec();
    spec.database = Some(Database {
        disable_health_check: Some(true),
        ..Default::default()
    });
    let mut dspa = application(spec);
    let database_probe = Arc::new(StaticProbe::new(Err(ProbeError::Connect("down".to_string()))));
    let probes = Probes {
        database: database_probe.clone(),
        object_store: Arc::new(StaticProbe::new(Ok(()))),
    };

    let outcome = pass_with(&cluster, &mut dspa, &probes, &config()).await;

    let db = condition(&outcome, DATABASE_AVAILABLE);
    assert_eq!(db.status, "True");
    assert_eq!(db.message.as_deref(), Some("Database health check disabled"));
    assert_eq!(database_probe.calls(), 0);
}

#[tokio::test]
async fn test_no_trust_sources_means_no_bundle() {
    let cluster = FakeCluster::new();
    let mut dspa = application(minimal_spec());

    pass(&cluster, &mut dspa).await;

    assert!(!cluster
        .applied_keys()
        .iter()
        .any(|k| k.starts_with("ConfigMap/team-a/dsp-trusted-ca")));
}

#[tokio::test]
async fn test_trust_bundle_precedence() {
    let cluster = FakeCluster::new()
        .with_config_map(NAMESPACE, SERVICE_CA_CONFIGMAP, &[(SERVICE_CA_CONFIGMAP_KEY, "SERVICE")])
        .with_config_map(
            NAMESPACE,
            PLATFORM_CA_BUNDLE_CONFIGMAP,
            &[("ca-bundle.crt", "PLATFORM-SYSTEM"), ("odh-ca-bundle.crt", "PLATFORM-ODH")],
        )
        .with_config_map(NAMESPACE, "user-ca", &[("ca.crt", "USER")]);
    let mut spec = minimal_spec();
    spec.pod_to_pod_tls = Some(true);
    spec.api_server = Some(ApiServer {
        ca_bundle: Some(CaBundle {
            config_map_name: "user-ca".to_string(),
            config_map_key: "ca.crt".to_string(),
        }),
        ..Default::default()
    });
    let mut dspa = application(spec);

    let outcome = pass(&cluster, &mut dspa).await;
    assert!(outcome.error.is_none());

    let applied = cluster.applied();
    let bundle = &applied["ConfigMap/team-a/dsp-trusted-ca-sample"];
    assert_eq!(
        bundle.data["data"]["dsp-ca.crt"],
        "SERVICE\nPLATFORM-SYSTEM\nPLATFORM-ODH\nUSER"
    );
}

#[tokio::test]
async fn test_pod_to_pod_tls_requires_service_ca() {
    let cluster = FakeCluster::new();
    let mut spec = minimal_spec();
    spec.pod_to_pod_tls = Some(true);
    let mut dspa = application(spec);

    let outcome = pass(&cluster, &mut dspa).await;

    let ready = condition(&outcome, CR_READY);
    assert_eq!(ready.reason.as_deref(), Some(REASON_MISSING_DEPENDENCY));
    assert!(ready
        .message
        .as_deref()
        .unwrap_or_default()
        .contains(SERVICE_CA_CONFIGMAP));
}
