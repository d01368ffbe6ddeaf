/// Telemetry module
///
/// Logging comes up first, from the file layer, so the bootstrap sequence
/// can narrate its fallbacks. APM wiring follows once configuration has
/// resolved.
pub mod otel;

use crate::config::{ApmConfig, LoggingConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_logging(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if logging.format == "json" {
        registry
            .with(fmt::layer().json().flatten_event(true))
            .init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

pub fn init_apm(apm: Option<&ApmConfig>) {
    match apm {
        Some(apm) => otel::init_otel(apm),
        None => tracing::info!("APM telemetry disabled, running with plain logs"),
    }
}
