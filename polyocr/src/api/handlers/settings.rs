use axum::{extract::State, Json};

use crate::api::dto::{UpdateSettingsRequest, UpdateSettingsResponse};
use crate::api::extractors::AppJson;
use crate::api::response::{ApiError, ErrorEnvelope};
use crate::api::state::AppState;

/// `POST /settings`
///
/// Pipelines already built keep their settings; only later builds see the change.
#[utoipa::path(
    post,
    path = "/settings",
    tag = "settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings applied and persisted", body = UpdateSettingsResponse),
        (status = 400, description = "Rejected; previous settings remain active", body = ErrorEnvelope),
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    AppJson(req): AppJson<UpdateSettingsRequest>,
) -> Result<Json<UpdateSettingsResponse>, ApiError> {
    state.service.update_settings(req.into()).await?;
    Ok(Json(UpdateSettingsResponse { success: true }))
}
