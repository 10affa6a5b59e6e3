use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::engine::{DetectionTuning, InferenceBackend};
use crate::error::{OcrError, Result};

/// Sentinel meaning "keep the stored value" for string overrides.
pub const DEFAULT_SENTINEL: &str = "default";

fn default_det_db_thresh() -> f64 {
    0.3
}

fn default_det_db_box_thresh() -> f64 {
    0.6
}

fn default_det_db_unclip_ratio() -> f64 {
    1.5
}

fn default_det_db_score_mode() -> String {
    "slow".to_string()
}

fn default_cls_thresh() -> f64 {
    0.9
}

fn validate_score_mode(mode: &str) -> std::result::Result<(), ValidationError> {
    match mode {
        "slow" | "fast" => Ok(()),
        _ => {
            let mut err = ValidationError::new("score_mode");
            err.message = Some("must be \"slow\" or \"fast\"".into());
            Err(err)
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Detection and classification post-processing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TuningParams {
    #[serde(default = "default_det_db_thresh")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub det_db_thresh: f64,

    #[serde(default = "default_det_db_box_thresh")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub det_db_box_thresh: f64,

    #[serde(default = "default_det_db_unclip_ratio")]
    #[validate(range(exclusive_min = 0.0))]
    pub det_db_unclip_ratio: f64,

    #[serde(default = "default_det_db_score_mode")]
    #[validate(custom(function = "validate_score_mode"))]
    pub det_db_score_mode: String,

    #[serde(default)]
    pub use_dilation: bool,

    #[serde(default = "default_cls_thresh")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub cls_thresh: f64,
}

impl Default for TuningParams {
    fn default() -> Self {
        Self {
            det_db_thresh: default_det_db_thresh(),
            det_db_box_thresh: default_det_db_box_thresh(),
            det_db_unclip_ratio: default_det_db_unclip_ratio(),
            det_db_score_mode: default_det_db_score_mode(),
            use_dilation: false,
            cls_thresh: default_cls_thresh(),
        }
    }
}

/// The active application settings, persisted as one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AppSettingsPreset {
    /// Document name. Always equal to the name the preset was loaded under.
    #[serde(rename = "name", default)]
    pub preset_name: String,

    /// language code -> language preset document name
    #[serde(default, deserialize_with = "null_as_empty")]
    pub language_presets: BTreeMap<String, String>,

    /// Default language.
    pub language_code: String,

    #[serde(default)]
    pub initialize_all_language_presets: bool,

    pub inference_backend: InferenceBackend,

    pub cpu_threads: u32,

    #[serde(rename = "port")]
    pub server_port: u16,

    #[validate(range(min = 1))]
    pub max_image_width: u32,

    #[serde(flatten)]
    #[validate(nested)]
    pub tuning: TuningParams,
}

impl AppSettingsPreset {
    /// Keys a stored document must carry; everything else has a default.
    pub const REQUIRED_KEYS: [&'static str; 5] = [
        "language_code",
        "inference_backend",
        "port",
        "cpu_threads",
        "max_image_width",
    ];

    pub fn detection_tuning(&self) -> DetectionTuning {
        DetectionTuning {
            max_side_len: self.max_image_width,
            db_thresh: self.tuning.det_db_thresh,
            db_box_thresh: self.tuning.det_db_box_thresh,
            unclip_ratio: self.tuning.det_db_unclip_ratio,
            score_mode: self.tuning.det_db_score_mode.clone(),
            use_dilation: self.tuning.use_dilation,
        }
    }

    /// Run the range checks and turn the first failures into one error.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| OcrError::Validation(e.to_string().replace('\n', "; ")))
    }

    /// Apply command-line/environment overrides on top of stored values.
    pub fn apply_overrides(&mut self, overrides: &AppOptions) {
        if let Some(code) = &overrides.language_code {
            self.language_code = code.clone();
        }
        if let Some(backend) = overrides.inference_backend {
            self.inference_backend = backend;
        }
        if let Some(port) = overrides.server_port {
            self.server_port = port;
        }
    }
}

/// Where one language's model files live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePreset {
    /// Document name the preset was loaded from.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub language_code: String,
    pub detection_model_dir: String,
    pub classification_model_dir: String,
    pub recognition_model_dir: String,
    pub recognition_label_file_dir: String,
}

impl LanguagePreset {
    pub const REQUIRED_KEYS: [&'static str; 4] = [
        "detection_model_dir",
        "classification_model_dir",
        "recognition_model_dir",
        "recognition_label_file_dir",
    ];
}

/// Process-level overrides from the command line.
///
/// `None` keeps the stored value. The raw sentinels (`"default"`, port `0`)
/// are folded into `None` by [`AppOptions::from_raw`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppOptions {
    pub preset_name: String,
    pub language_code: Option<String>,
    pub inference_backend: Option<InferenceBackend>,
    pub server_port: Option<u16>,
}

impl AppOptions {
    pub fn from_raw(
        preset_name: &str,
        language_code: &str,
        inference_backend: &str,
        server_port: u16,
    ) -> Result<Self> {
        let inference_backend = if inference_backend == DEFAULT_SENTINEL {
            None
        } else {
            Some(inference_backend.parse()?)
        };

        Ok(Self {
            preset_name: preset_name.to_string(),
            language_code: (language_code != DEFAULT_SENTINEL).then(|| language_code.to_string()),
            inference_backend,
            server_port: (server_port != 0).then_some(server_port),
        })
    }
}

/// Partial settings change. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
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

impl SettingsUpdate {
    /// Copy every present field except `preset_name` onto `preset`.
    pub fn apply_to(&self, preset: &mut AppSettingsPreset) -> Result<()> {
        if let Some(code) = &self.language_code {
            preset.language_code = code.clone();
        }
        if let Some(backend) = &self.inference_backend {
            preset.inference_backend = backend.parse()?;
        }
        if let Some(threads) = self.cpu_threads {
            preset.cpu_threads = threads;
        }
        if let Some(width) = self.max_image_width {
            preset.max_image_width = width;
        }
        if let Some(v) = self.det_db_thresh {
            preset.tuning.det_db_thresh = v;
        }
        if let Some(v) = self.det_db_box_thresh {
            preset.tuning.det_db_box_thresh = v;
        }
        if let Some(v) = self.det_db_unclip_ratio {
            preset.tuning.det_db_unclip_ratio = v;
        }
        if let Some(mode) = &self.det_db_score_mode {
            preset.tuning.det_db_score_mode = mode.clone();
        }
        if let Some(v) = self.use_dilation {
            preset.tuning.use_dilation = v;
        }
        if let Some(v) = self.cls_thresh {
            preset.tuning.cls_thresh = v;
        }
        Ok(())
    }
}
