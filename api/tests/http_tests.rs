use actix_web::{http::StatusCode, test, web, App};
use pretty_assertions::assert_eq;

use registry_api::app_state::AppState;
use registry_api::config::{DatabaseConfig, LoggingConfig, ResolvedConfig};
use registry_api::http::routes;
use registry_api::identity::ServiceIdentity;

fn resolved_for(identity: ServiceIdentity) -> ResolvedConfig {
    ResolvedConfig {
        service_name: identity.service_name().to_string(),
        host: "127.0.0.1".to_string(),
        port: identity.default_port(),
        database: DatabaseConfig {
            uri: "mongodb://records-db:27017".to_string(),
            username: None,
            password: None,
            database_name: "registry".to_string(),
        },
        telemetry: None,
        logging: LoggingConfig {
            level: "info".to_string(),
            format: "compact".to_string(),
        },
    }
}

#[actix_rt::test]
async fn healthz_answers_ok() {
    let state = web::Data::new(AppState::new(&resolved_for(ServiceIdentity::Student), None));
    let app = test::init_service(
        App::new()
            .app_data(state)
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/healthz").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[actix_rt::test]
async fn version_reports_the_service_identity() {
    let state = web::Data::new(AppState::new(&resolved_for(ServiceIdentity::Teacher), None));
    let app = test::init_service(
        App::new()
            .app_data(state)
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/version").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], "teacher-service");
}

#[actix_rt::test]
async fn readyz_is_unavailable_without_a_database() {
    let state = web::Data::new(AppState::new(&resolved_for(ServiceIdentity::Employee), None));
    let app = test::init_service(
        App::new()
            .app_data(state)
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/readyz").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["ready"], false);
}
