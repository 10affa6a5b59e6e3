use std::fmt;

use thiserror::Error;

use crate::engine::StageKind;

/// Pipeline construction step that reported a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Detection,
    Classification,
    Recognition,
    Composite,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detection => write!(f, "detection"),
            Self::Classification => write!(f, "classification"),
            Self::Recognition => write!(f, "recognition"),
            Self::Composite => write!(f, "composite"),
        }
    }
}

impl From<StageKind> for PipelineStage {
    fn from(kind: StageKind) -> Self {
        match kind {
            StageKind::Detection => Self::Detection,
            StageKind::Classification => Self::Classification,
            StageKind::Recognition => Self::Recognition,
        }
    }
}

/// Every failure the OCR core can report.
///
/// `Clone` is required: the outcome of a single pipeline build is handed to
/// every caller that waited on it.
#[derive(Error, Debug, Clone)]
pub enum OcrError {
    #[error("Config load error: {key}: {reason}")]
    ConfigLoad { key: String, reason: String },

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Unknown inference backend: {0}")]
    UnknownBackend(String),

    #[error("Pipeline init error for [{language}] at {stage} stage: {reason}")]
    PipelineInit {
        language: String,
        stage: PipelineStage,
        reason: String,
    },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Prediction error for [{language}]: {reason}")]
    Prediction { language: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl OcrError {
    pub fn config_load(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::ConfigLoad {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable machine-readable name of the error kind, shared by both transports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigLoad { .. } => "config_load",
            Self::UnknownLanguage(_) => "unknown_language",
            Self::UnknownBackend(_) => "unknown_backend",
            Self::PipelineInit { .. } => "pipeline_init",
            Self::Decode(_) => "decode",
            Self::Prediction { .. } => "prediction",
            Self::Validation(_) => "validation",
            Self::Internal(_) => "internal",
        }
    }

    /// True when the caller sent something the server cannot act on.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownLanguage(_)
                | Self::UnknownBackend(_)
                | Self::Decode(_)
                | Self::Validation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OcrError>;
