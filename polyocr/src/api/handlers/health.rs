use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub engine: String,
    pub preset: String,
    pub default_language: String,
    pub inference_backend: String,
    /// Languages with a built pipeline.
    pub pipelines: Vec<String>,
}

/// `GET /health`
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthData> {
    let settings = state.service.settings().current();

    Json(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: state.service.cache().engine_name().to_string(),
        preset: settings.preset_name,
        default_language: settings.language_code,
        inference_backend: settings.inference_backend.to_string(),
        pipelines: state.service.cache().cached_languages(),
    })
}
