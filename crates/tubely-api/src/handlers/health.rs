use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: String,
}

/// Liveness probe; reports the configured storage backend.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            storage: state.storage.backend_type().to_string(),
        }),
    )
}
