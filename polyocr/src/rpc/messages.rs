//! Typed RPC messages.
//!
//! Recognition results carry both scores, the orientation label and a
//! `text_lines` list per result, with the same box serialization as HTTP.

use rmcp::ErrorData as McpError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::OcrError;
use crate::ocr::{ContextResolution, OcrResponse, Quad};
use crate::presets::SettingsUpdate;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RecognizeBase64Request {
    #[serde(default)]
    pub id: String,
    pub base64_image: String,
    pub language_code: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RecognizeBytesRequest {
    #[serde(default)]
    pub id: String,
    /// Raw encoded image file contents.
    pub image_bytes: Vec<u8>,
    pub language_code: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SupportedLanguagesRequest {}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub preset_name: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub inference_backend: Option<String>,
    #[serde(default)]
    pub cpu_threads: Option<u32>,
    #[serde(default)]
    pub max_image_width: Option<u32>,
    #[serde(default)]
    pub det_db_thresh: Option<f64>,
    #[serde(default)]
    pub det_db_box_thresh: Option<f64>,
    #[serde(default)]
    pub det_db_unclip_ratio: Option<f64>,
    #[serde(default)]
    pub det_db_score_mode: Option<String>,
    #[serde(default)]
    pub use_dilation: Option<bool>,
    #[serde(default)]
    pub cls_thresh: Option<f64>,
}

impl From<UpdateSettingsRequest> for SettingsUpdate {
    fn from(req: UpdateSettingsRequest) -> Self {
        Self {
            preset_name: req.preset_name,
            language_code: req.language_code,
            inference_backend: req.inference_backend,
            cpu_threads: req.cpu_threads,
            max_image_width: req.max_image_width,
            det_db_thresh: req.det_db_thresh,
            det_db_box_thresh: req.det_db_box_thresh,
            det_db_unclip_ratio: req.det_db_unclip_ratio,
            det_db_score_mode: req.det_db_score_mode,
            use_dilation: req.use_dilation,
            cls_thresh: req.cls_thresh,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TextLineMessage {
    pub content: String,
    #[serde(rename = "box")]
    pub bbox: Quad,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecognitionResult {
    pub recognition_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification_label: Option<String>,
    #[serde(rename = "box")]
    pub bbox: Quad,
    pub text_lines: Vec<TextLineMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecognizeResponse {
    pub id: String,
    pub context_resolution: ContextResolution,
    pub results: Vec<RecognitionResult>,
}

impl From<&OcrResponse> for RecognizeResponse {
    fn from(response: &OcrResponse) -> Self {
        Self {
            id: response.id.clone(),
            context_resolution: response.context_resolution,
            results: response
                .results
                .iter()
                .map(|line| RecognitionResult {
                    recognition_score: line.recognition_score,
                    classification_score: line.classification_score,
                    classification_label: line.classification_label.clone(),
                    bbox: line.bbox,
                    text_lines: vec![TextLineMessage {
                        content: line.text.clone(),
                        bbox: line.bbox,
                    }],
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SupportedLanguagesResponse {
    pub language_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateSettingsResponse {
    pub success: bool,
}

/// Map a core error onto an RPC error: caller mistakes become
/// `invalid_params`, everything else `internal_error`.
pub fn to_mcp_error(err: &OcrError) -> McpError {
    if err.is_client_error() {
        return McpError::invalid_params(
            err.to_string(),
            Some(json!({ "kind": err.kind(), "detail": err.to_string() })),
        );
    }

    tracing::error!(error = %err, kind = err.kind(), "RPC request failed");
    let detail = match err {
        OcrError::Internal(_) => "An internal error occurred".to_string(),
        other => other.to_string(),
    };
    McpError::internal_error(
        detail.clone(),
        Some(json!({ "kind": err.kind(), "detail": detail })),
    )
}
