/// HTTP server module
pub mod routes;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use std::io;

use crate::app_state::AppState;
use crate::config::ResolvedConfig;

pub async fn start_server(config: &ResolvedConfig, app_state: AppState) -> io::Result<()> {
    let bind_addr = config.bind_addr();

    tracing::info!(
        service_name = %config.service_name,
        bind_addr = %bind_addr,
        log_level = %config.logging.level,
        log_format = %config.logging.format,
        "Starting HTTP server"
    );

    let app_state = web::Data::new(app_state);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .configure(routes::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
