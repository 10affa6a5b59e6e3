use tracing::warn;

use super::{
    EngineError, InferenceEngine, PipelineHandle, RuntimeConfig, StageHandle, StageKind,
    StageModelPaths,
};

/// Engine used when no inference binding is linked in.
///
/// The server still starts and answers language and settings requests; every
/// pipeline build fails with the configured reason.
#[derive(Debug, Clone)]
pub struct UnavailableEngine {
    reason: String,
}

impl UnavailableEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!("Inference engine unavailable: {}", reason);
        Self { reason }
    }
}

impl Default for UnavailableEngine {
    fn default() -> Self {
        Self::new("no inference engine binding compiled into this build")
    }
}

impl InferenceEngine for UnavailableEngine {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn construct_stage(
        &self,
        kind: StageKind,
        _paths: &StageModelPaths,
        _runtime: &RuntimeConfig,
    ) -> Result<Box<dyn StageHandle>, EngineError> {
        Err(EngineError::Unavailable(format!(
            "cannot construct {kind} stage: {}",
            self.reason
        )))
    }

    fn compose_pipeline(
        &self,
        _detection: Box<dyn StageHandle>,
        _classification: Box<dyn StageHandle>,
        _recognition: Box<dyn StageHandle>,
    ) -> Result<Box<dyn PipelineHandle>, EngineError> {
        Err(EngineError::Unavailable(self.reason.clone()))
    }
}
