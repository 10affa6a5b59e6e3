use axum::{extract::State, Json};

use crate::api::dto::{RecognizeRequest, RecognizeResponse};
use crate::api::extractors::AppJson;
use crate::api::response::{ApiError, ErrorEnvelope};
use crate::api::state::AppState;

/// `POST /recognize`
#[utoipa::path(
    post,
    path = "/recognize",
    tag = "recognition",
    request_body = RecognizeRequest,
    responses(
        (status = 200, description = "Recognized text lines", body = RecognizeResponse),
        (status = 400, description = "Image could not be decoded", body = ErrorEnvelope),
        (status = 404, description = "No preset for the language", body = ErrorEnvelope),
        (status = 503, description = "Pipeline could not be built", body = ErrorEnvelope),
    )
)]
pub async fn recognize(
    State(state): State<AppState>,
    AppJson(req): AppJson<RecognizeRequest>,
) -> Result<Json<RecognizeResponse>, ApiError> {
    let response = state
        .service
        .infer_base64(&req.id, &req.base64_image, &req.language_code)
        .await?;

    Ok(Json(RecognizeResponse::from(&response)))
}
