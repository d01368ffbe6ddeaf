/// Registry service runtime
///
/// Shared by the three record-service binaries. Each binary names its
/// identity and calls [`run`]; everything else, from configuration
/// resolution to the HTTP server lifecycle, is identical across the
/// family.
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod http;
pub mod identity;
pub mod infra;
pub mod telemetry;

use app_state::AppState;
use bootstrap::StoreConnection;
use config::{load_file_config, EnvSource, LoggingConfig};
use identity::ServiceIdentity;
use telemetry::{init_apm, init_logging, otel::shutdown_otel};

pub async fn run(identity: ServiceIdentity) -> std::io::Result<()> {
    // Load .env file if exists
    let _ = dotenvy::dotenv();

    // File layer first: logging settings live there, and the bootstrap
    // warnings below need a subscriber to land in
    let file = load_file_config().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });
    init_logging(&LoggingConfig::from_settings(&file.logging));

    // Resolve configuration from every source, once
    let env_source = EnvSource::from_process();
    let connection = StoreConnection::discover(&file);
    let config = bootstrap::bootstrap_from_sources(identity, connection.as_ref(), &env_source, &file)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Failed to resolve configuration: {}", e);
            std::process::exit(1);
        });

    // Initialize telemetry
    init_apm(config.telemetry.as_ref());

    tracing::info!("Initializing integrations...");

    let mongo = infra::mongo::init_mongo(&config.database).await;
    let app_state = AppState::new(&config, mongo);

    // Setup graceful shutdown
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Shutdown signal received");
        let _ = tx.send(());
    });

    // Start HTTP server
    let server = http::start_server(&config, app_state);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Server error");
                return Err(e);
            }
        }
        _ = rx => {
            tracing::info!("Shutting down gracefully");
        }
    }

    // Shutdown OpenTelemetry
    shutdown_otel();

    tracing::info!("Shutdown complete");
    Ok(())
}
