use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

/// Liveness text kept for clients polling the root path.
pub async fn root() -> &'static str {
    "Server is up and running!"
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}
