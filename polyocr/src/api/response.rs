//! # Error Contract
//!
//! Successful responses carry their payload directly. Every failure uses the
//! same envelope:
//!
//! ```json
//! { "error": { "code": "unknown_language", "message": "Unknown language: xx" } }
//! ```
//!
//! The HTTP status is derived from the code via [`ErrorCode::status`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// Machine-readable error code included in every error response.
///
/// Serialized as a snake_case string on the wire (e.g. `"pipeline_init"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A preset document is missing or malformed. HTTP 500.
    ConfigLoad,
    /// No language preset exists for the requested code. HTTP 404.
    UnknownLanguage,
    /// The inference backend name is not one of the supported eight. HTTP 400.
    UnknownBackend,
    /// A pipeline stage could not be constructed. HTTP 503.
    PipelineInit,
    /// The image payload could not be decoded. HTTP 400.
    Decode,
    /// The engine failed while recognizing. HTTP 500.
    Prediction,
    /// A value was out of range or malformed. HTTP 400.
    Validation,
    /// The request body was not valid JSON for this endpoint. HTTP 400.
    InvalidRequest,
    /// The request body exceeded the configured limit. HTTP 413.
    PayloadTooLarge,
    /// An unexpected server-side error occurred. Details are never leaked. HTTP 500.
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownLanguage => StatusCode::NOT_FOUND,
            Self::UnknownBackend | Self::Decode | Self::Validation | Self::InvalidRequest => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::PipelineInit => StatusCode::SERVICE_UNAVAILABLE,
            Self::ConfigLoad | Self::Prediction | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            Self::ConfigLoad => "config_load",
            Self::UnknownLanguage => "unknown_language",
            Self::UnknownBackend => "unknown_backend",
            Self::PipelineInit => "pipeline_init",
            Self::Decode => "decode",
            Self::Prediction => "prediction",
            Self::Validation => "validation",
            Self::InvalidRequest => "invalid_request",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Internal => "internal",
        };
        f.write_str(code)
    }
}

/// Structured error payload.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

/// Wire shape of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorEnvelope {
    pub error: ApiError,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorEnvelope { error: self })).into_response()
    }
}

impl From<OcrError> for ApiError {
    /// Internal details are never sent to the client; they are logged.
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::ConfigLoad { .. } => {
                tracing::error!(error = %err, "Configuration error mapped to response");
                ApiError::new(ErrorCode::ConfigLoad, err.to_string())
            }
            OcrError::UnknownLanguage(_) => ApiError::new(ErrorCode::UnknownLanguage, err.to_string()),
            OcrError::UnknownBackend(_) => ApiError::new(ErrorCode::UnknownBackend, err.to_string()),
            OcrError::PipelineInit { .. } => ApiError::new(ErrorCode::PipelineInit, err.to_string()),
            OcrError::Decode(_) => ApiError::new(ErrorCode::Decode, err.to_string()),
            OcrError::Prediction { .. } => {
                tracing::error!(error = %err, "Prediction failed");
                ApiError::new(ErrorCode::Prediction, err.to_string())
            }
            OcrError::Validation(_) => ApiError::new(ErrorCode::Validation, err.to_string()),
            OcrError::Internal(_) => {
                tracing::error!(error = %err, "Internal error mapped to response");
                ApiError::new(ErrorCode::Internal, "An internal error occurred")
            }
        }
    }
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
