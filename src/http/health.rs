use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::health::full_health_check;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct ServiceBanner {
    pub message: &'static str,
    pub version: &'static str,
    pub health: String,
}

pub async fn root(State(state): State<AppState>) -> Json<ServiceBanner> {
    Json(ServiceBanner {
        message: "USD/MXN rates service is running",
        version: env!("CARGO_PKG_VERSION"),
        health: format!("{}/health", state.config.http.api_prefix.trim_end_matches('/')),
    })
}

/// Process liveness; touches no dependency.
pub async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

pub async fn detailed_health(State(state): State<AppState>) -> Response {
    let report = full_health_check(&state.service, state.started_at.elapsed()).await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}
