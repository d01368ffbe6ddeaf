/// Health check routes
use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::collections::HashMap;

use crate::app_state::AppState;
use crate::infra::mongo;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    ready: bool,
    checks: HashMap<String, CheckResult>,
}

#[derive(Serialize)]
struct CheckResult {
    enabled: bool,
    ok: bool,
    details: String,
}

pub async fn healthz() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn readyz(state: web::Data<AppState>) -> impl Responder {
    let mut checks = HashMap::new();
    let mut overall_ready = true;

    if let Some(ref database) = state.mongo {
        match mongo::check_mongo_health(database).await {
            Ok(_) => {
                checks.insert(
                    "mongodb".to_string(),
                    CheckResult {
                        enabled: true,
                        ok: true,
                        details: "healthy".to_string(),
                    },
                );
            }
            Err(e) => {
                overall_ready = false;
                checks.insert(
                    "mongodb".to_string(),
                    CheckResult {
                        enabled: true,
                        ok: false,
                        details: e,
                    },
                );
            }
        }
    } else {
        overall_ready = false;
        checks.insert(
            "mongodb".to_string(),
            CheckResult {
                enabled: false,
                ok: false,
                details: "not connected".to_string(),
            },
        );
    }

    let status_code = if overall_ready { 200 } else { 503 };

    HttpResponse::build(
        actix_web::http::StatusCode::from_u16(status_code)
            .unwrap_or(actix_web::http::StatusCode::SERVICE_UNAVAILABLE),
    )
    .json(ReadyResponse {
        ready: overall_ready,
        checks,
    })
}
