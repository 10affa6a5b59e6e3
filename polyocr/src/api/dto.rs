//! HTTP wire types.
//!
//! The HTTP surface serializes the canonical [`OcrResponse`] in its own
//! shape: one entry per text line with its recognition score and box.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ocr::{ContextResolution, OcrResponse, Quad};
use crate::presets::SettingsUpdate;

/// `POST /recognize` body.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RecognizeRequest {
    /// Echoed back in the response.
    #[serde(default)]
    pub id: String,
    pub language_code: String,
    /// Base64-encoded image; a `data:` URL is also accepted.
    #[serde(rename = "base64Image")]
    pub base64_image: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RecognizedText {
    pub text: String,
    /// Recognition confidence.
    pub score: f32,
    #[serde(rename = "box")]
    pub bbox: Quad,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RecognizeResponse {
    pub id: String,
    pub context_resolution: ContextResolution,
    pub results: Vec<RecognizedText>,
}

impl From<&OcrResponse> for RecognizeResponse {
    fn from(response: &OcrResponse) -> Self {
        Self {
            id: response.id.clone(),
            context_resolution: response.context_resolution,
            results: response
                .results
                .iter()
                .map(|line| RecognizedText {
                    text: line.text.clone(),
                    score: line.recognition_score,
                    bbox: line.bbox,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SupportedLanguagesResponse {
    pub language_codes: Vec<String>,
}

/// `POST /settings` body. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateSettingsRequest {
    /// Switch to another stored preset before applying the other fields.
    pub preset_name: Option<String>,
    pub language_code: Option<String>,
    /// One of `Paddle_CPU`, `Open_VINO`, `ONNX_CPU`, `Paddle_Lite`,
    /// `Paddle_GPU`, `Paddle_GPU_Tensor_RT`, `ONNX_GPU`, `Tensor_RT`.
    pub inference_backend: Option<String>,
    pub cpu_threads: Option<u32>,
    pub max_image_width: Option<u32>,
    pub det_db_thresh: Option<f64>,
    pub det_db_box_thresh: Option<f64>,
    pub det_db_unclip_ratio: Option<f64>,
    /// `slow` or `fast`.
    pub det_db_score_mode: Option<String>,
    pub use_dilation: Option<bool>,
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

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateSettingsResponse {
    pub success: bool,
}
