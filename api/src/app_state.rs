/// Application state
use crate::config::ResolvedConfig;
use mongodb::Database;

#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub version: String,
    pub mongo: Option<Database>,
}

impl AppState {
    pub fn new(config: &ResolvedConfig, mongo: Option<Database>) -> Self {
        Self {
            service_name: config.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            mongo,
        }
    }
}
