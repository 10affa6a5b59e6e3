use axum::Json;
use utoipa::OpenApi;

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "polyocr API",
        version = "1.0.0",
        description = "Multi-language OCR with cached inference pipelines.",
    ),
    paths(
        handlers::recognize::recognize,
        handlers::languages::supported_languages,
        handlers::settings::update_settings,
        handlers::health::health_check,
    ),
    components(schemas(
        // Error envelope
        response::ErrorCode,
        response::ApiError,
        response::ErrorEnvelope,
        // Recognition
        dto::RecognizeRequest,
        dto::RecognizeResponse,
        dto::RecognizedText,
        dto::SupportedLanguagesResponse,
        crate::ocr::ContextResolution,
        crate::ocr::Quad,
        crate::ocr::Vertex,
        // Settings
        dto::UpdateSettingsRequest,
        dto::UpdateSettingsResponse,
        // Health
        handlers::health::HealthData,
    )),
    tags(
        (name = "recognition", description = "Text recognition and language listing"),
        (name = "settings", description = "Runtime settings updates"),
        (name = "health", description = "Health check"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
