use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use registry_api::bootstrap::{bootstrap, bootstrap_from_sources, BootstrapError, StoreConnection};
use registry_api::config::resolver::ENV_MONGODB_URI;
use registry_api::config::{load_file_config, EnvSource, FileConfig, ResolveError};
use registry_api::identity::ServiceIdentity;
use registry_secrets::StoreCredential;

fn connection_for(server: &MockServer) -> StoreConnection {
    StoreConnection {
        address: Url::parse(&server.uri()).expect("mock server uri"),
        mount: "registry".to_string(),
        credential: StoreCredential::Token("root-token".into()),
    }
}

async fn mount_healthy_store(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/sys/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sealed": false})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .mount(server)
        .await;
}

fn kv_body(data: serde_json::Value) -> serde_json::Value {
    json!({"data": {"data": data, "metadata": {"version": 1}}})
}

#[tokio::test]
async fn store_values_win_over_the_environment() {
    let server = MockServer::start().await;
    mount_healthy_store(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/registry/data/mongodb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kv_body(json!({
            "uri": "mongodb://records-db:27017",
            "username": "registry",
            "password": "hunter2",
            "database": "registry"
        }))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/registry/data/apm"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/registry/data/ports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kv_body(json!({
            "student": 5005
        }))))
        .mount(&server)
        .await;

    let connection = connection_for(&server);
    let env = EnvSource::empty().with(ENV_MONGODB_URI, "mongodb://from-env:27017");

    let config = bootstrap_from_sources(
        ServiceIdentity::Student,
        Some(&connection),
        &env,
        &FileConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(config.database.uri, "mongodb://records-db:27017");
    assert_eq!(config.database.username.as_deref(), Some("registry"));
    assert_eq!(config.port, 5005);
    assert!(config.telemetry.is_none());
}

#[tokio::test]
async fn sealed_store_degrades_to_the_environment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/health"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"sealed": true})))
        .mount(&server)
        .await;

    let connection = connection_for(&server);
    let env = EnvSource::empty().with(ENV_MONGODB_URI, "mongodb://from-env:27017");

    let config = bootstrap_from_sources(
        ServiceIdentity::Student,
        Some(&connection),
        &env,
        &FileConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(config.database.uri, "mongodb://from-env:27017");
    assert_eq!(config.port, 5001);
}

#[tokio::test]
async fn unreachable_store_degrades_to_the_environment() {
    // Reserved port with nothing listening.
    let connection = StoreConnection {
        address: Url::parse("http://127.0.0.1:9").unwrap(),
        mount: "registry".to_string(),
        credential: StoreCredential::Token("root-token".into()),
    };
    let env = EnvSource::empty().with(ENV_MONGODB_URI, "mongodb://from-env:27017");

    let config = bootstrap_from_sources(
        ServiceIdentity::Teacher,
        Some(&connection),
        &env,
        &FileConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(config.database.uri, "mongodb://from-env:27017");
    assert_eq!(config.port, 5002);
}

#[tokio::test]
async fn denied_and_missing_paths_degrade_per_path() {
    let server = MockServer::start().await;
    mount_healthy_store(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/registry/data/mongodb"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/registry/data/apm"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/registry/data/ports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kv_body(json!({
            "employee": 6003
        }))))
        .mount(&server)
        .await;

    let connection = connection_for(&server);
    let env = EnvSource::empty().with(ENV_MONGODB_URI, "mongodb://from-env:27017");

    let config = bootstrap_from_sources(
        ServiceIdentity::Employee,
        Some(&connection),
        &env,
        &FileConfig::default(),
    )
    .await
    .unwrap();

    // The denied database path lost; the readable ports path still won.
    assert_eq!(config.database.uri, "mongodb://from-env:27017");
    assert_eq!(config.port, 6003);
}

#[tokio::test]
async fn missing_uri_everywhere_fails_the_bootstrap() {
    let server = MockServer::start().await;
    mount_healthy_store(&server).await;
    Mock::given(method("GET"))
        .and(path("/v1/registry/data/mongodb"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/registry/data/apm"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/registry/data/ports"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let connection = connection_for(&server);
    let err = bootstrap_from_sources(
        ServiceIdentity::Student,
        Some(&connection),
        &EnvSource::empty(),
        &FileConfig::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Resolve(ResolveError::MissingField { field, .. }) if field == "database.uri"
    ));
}

#[tokio::test]
async fn no_store_configured_resolves_from_lower_layers() {
    let env = EnvSource::empty().with(ENV_MONGODB_URI, "mongodb://from-env:27017");

    let config = bootstrap_from_sources(
        ServiceIdentity::Student,
        None,
        &env,
        &FileConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(config.database.uri, "mongodb://from-env:27017");
    assert_eq!(config.port, 5001);
}

#[tokio::test]
#[serial]
async fn one_shot_bootstrap_reads_the_process_environment() {
    std::env::remove_var("VAULT_ADDR");
    std::env::set_var("MONGODB_URI", "mongodb://from-process:27017");

    let config = bootstrap(ServiceIdentity::Student).await.expect("bootstrap");

    std::env::remove_var("MONGODB_URI");

    assert_eq!(config.database.uri, "mongodb://from-process:27017");
    assert_eq!(config.port, 5001);
}

#[test]
#[serial]
fn file_layer_reads_toml_with_env_overrides() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("configs/test")).expect("configs dir");
    std::fs::write(
        dir.path().join("configs/test/default.toml"),
        r#"
[server]
port = 9090

[database]
name = "records-archive"

[logging]
level = "warn"
"#,
    )
    .expect("config file");

    let previous_dir = std::env::current_dir().expect("cwd");
    std::env::set_current_dir(dir.path()).expect("chdir");
    std::env::set_var("APP__ENV", "test");
    std::env::set_var("APP__SERVER__PORT", "7777");

    let file = load_file_config().expect("file config");

    std::env::set_current_dir(previous_dir).expect("chdir back");
    std::env::remove_var("APP__ENV");
    std::env::remove_var("APP__SERVER__PORT");

    assert_eq!(file.server.port, 7777);
    assert_eq!(file.database.name, "records-archive");
    assert_eq!(file.logging.level, "warn");
    assert_eq!(file.logging.format, "json");
}

#[test]
#[serial]
fn store_connection_discovery_prefers_the_environment() {
    std::env::set_var("VAULT_ADDR", "http://store:8200");
    std::env::set_var("VAULT_TOKEN", "root-token");
    std::env::set_var("VAULT_AUTH_METHOD", "token");

    let mut file = FileConfig::default();
    file.secret_store.address = "http://file-store:8200".to_string();

    let connection = StoreConnection::discover(&file).expect("connection");

    std::env::remove_var("VAULT_ADDR");
    std::env::remove_var("VAULT_TOKEN");
    std::env::remove_var("VAULT_AUTH_METHOD");

    assert_eq!(connection.address.as_str(), "http://store:8200/");
    assert_eq!(connection.mount, "registry");
    assert!(matches!(connection.credential, StoreCredential::Token(ref t) if t == "root-token"));
}

#[test]
#[serial]
fn no_address_anywhere_means_no_store_connection() {
    std::env::remove_var("VAULT_ADDR");
    assert!(StoreConnection::discover(&FileConfig::default()).is_none());
}
