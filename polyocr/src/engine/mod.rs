//! Inference engine boundary.
//!
//! The detection, orientation classification and recognition mathematics live
//! outside this crate. Everything the server needs from an engine goes through
//! the traits here:
//! - `InferenceEngine` constructs the three stages and composes them
//! - `StageHandle` is one constructed stage, tunable before composition
//! - `PipelineHandle` is the composed pipeline that answers `predict`
//!
//! Engine calls are synchronous and may be slow, so callers run them on the
//! blocking pool.

mod runtime;
mod unavailable;

use std::fmt;
use std::path::PathBuf;

use image::DynamicImage;
use thiserror::Error;

pub use runtime::{
    build as build_runtime, build_from_name as build_runtime_from_name, BackendLibrary, Device,
    InferenceBackend, RuntimeConfig, RuntimeFlags,
};
pub use unavailable::UnavailableEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Detection,
    Classification,
    Recognition,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detection => write!(f, "detection"),
            Self::Classification => write!(f, "classification"),
            Self::Recognition => write!(f, "recognition"),
        }
    }
}

/// Files backing one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageModelPaths {
    pub model_file: PathBuf,
    pub params_file: PathBuf,
    /// Only the recognition stage carries a label dictionary.
    pub label_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionTuning {
    pub max_side_len: u32,
    pub db_thresh: f64,
    pub db_box_thresh: f64,
    pub unclip_ratio: f64,
    pub score_mode: String,
    pub use_dilation: bool,
}

/// Post-processing parameters applied to a stage after construction.
#[derive(Debug, Clone, PartialEq)]
pub enum StageTuning {
    Detection(DetectionTuning),
    Classification { cls_thresh: f64 },
    Recognition,
}

/// Raw output of one `predict` call. All sequences are parallel to `texts`.
///
/// `cls_scores` and `cls_labels` are empty when the pipeline ran without a
/// classifier. Each box is eight integers, clockwise from the top-left corner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOcrResult {
    pub texts: Vec<String>,
    pub rec_scores: Vec<f32>,
    pub cls_scores: Vec<f32>,
    pub cls_labels: Vec<i32>,
    pub boxes: Vec<Vec<i32>>,
}

#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("Model files not usable: {0}")]
    Model(String),

    #[error("Runtime not supported: {0}")]
    Runtime(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Engine unavailable: {0}")]
    Unavailable(String),
}

pub trait StageHandle: Send {
    fn kind(&self) -> StageKind;

    fn is_initialized(&self) -> bool;

    fn apply_tuning(&mut self, tuning: &StageTuning);
}

pub trait PipelineHandle: Send + Sync {
    fn is_initialized(&self) -> bool;

    fn set_cls_batch_size(&mut self, size: usize);

    fn set_rec_batch_size(&mut self, size: usize);

    /// Whether `predict` may run on several threads at once for this handle.
    fn supports_concurrent_predict(&self) -> bool {
        false
    }

    fn predict(&self, image: &DynamicImage) -> Result<RawOcrResult, EngineError>;
}

pub trait InferenceEngine: Send + Sync {
    fn name(&self) -> &str;

    fn construct_stage(
        &self,
        kind: StageKind,
        paths: &StageModelPaths,
        runtime: &RuntimeConfig,
    ) -> Result<Box<dyn StageHandle>, EngineError>;

    fn compose_pipeline(
        &self,
        detection: Box<dyn StageHandle>,
        classification: Box<dyn StageHandle>,
        recognition: Box<dyn StageHandle>,
    ) -> Result<Box<dyn PipelineHandle>, EngineError>;
}
