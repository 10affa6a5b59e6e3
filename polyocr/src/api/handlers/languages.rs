use axum::{extract::State, Json};

use crate::api::dto::SupportedLanguagesResponse;
use crate::api::state::AppState;

/// `GET /supported-languages`
#[utoipa::path(
    get,
    path = "/supported-languages",
    tag = "recognition",
    responses(
        (status = 200, description = "Language codes with a preset, sorted", body = SupportedLanguagesResponse),
    )
)]
pub async fn supported_languages(State(state): State<AppState>) -> Json<SupportedLanguagesResponse> {
    Json(SupportedLanguagesResponse {
        language_codes: state.service.supported_languages(),
    })
}
