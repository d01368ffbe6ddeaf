/// MongoDB integration
use crate::config::DatabaseConfig;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, Database};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn init_mongo(config: &DatabaseConfig) -> Option<Database> {
    tracing::info!(
        uri = %config.uri.split('@').last().unwrap_or("***"),
        database = %config.database_name,
        credentialed = %config.username.is_some(),
        "Initializing MongoDB client"
    );

    let mut options = match ClientOptions::parse(&config.uri).await {
        Ok(options) => options,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse MongoDB connection string");
            return None;
        }
    };
    options.connect_timeout = Some(CONNECT_TIMEOUT);
    options.server_selection_timeout = Some(CONNECT_TIMEOUT);

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.credential = Some(
            Credential::builder()
                .username(username.clone())
                .password(password.clone())
                .build(),
        );
    }

    let client = match Client::with_options(options) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build MongoDB client");
            return None;
        }
    };

    let database = client.database(&config.database_name);
    match database.run_command(doc! { "ping": 1 }).await {
        Ok(_) => {
            tracing::info!("MongoDB connection established");
            Some(database)
        }
        Err(e) => {
            tracing::error!(error = %e, "MongoDB ping failed");
            None
        }
    }
}

pub async fn check_mongo_health(database: &Database) -> Result<(), String> {
    match database.run_command(doc! { "ping": 1 }).await {
        Ok(_) => Ok(()),
        Err(e) => Err(format!("MongoDB health check failed: {}", e)),
    }
}
