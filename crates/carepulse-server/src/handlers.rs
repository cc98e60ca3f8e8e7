use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn info(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "service": "CarePulse Intake",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "baseUrl": state.config.base_url(),
        "backend": state.config.backend.mode,
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz() -> impl IntoResponse {
    // The backend is remote and checked per request; nothing to wait for locally.
    (StatusCode::OK, Json(HealthResponse { status: "ready" }))
}
