use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use super::CachedPipeline;
use crate::engine::{
    build_runtime, InferenceEngine, RuntimeConfig, StageHandle, StageKind, StageModelPaths,
    StageTuning,
};
use crate::error::{OcrError, PipelineStage, Result};
use crate::presets::{AppSettingsPreset, LanguagePreset};

pub const MODEL_FILE: &str = "inference.pdmodel";
pub const PARAMS_FILE: &str = "inference.pdiparams";
pub const CLS_BATCH_SIZE: usize = 1;
pub const REC_BATCH_SIZE: usize = 6;

/// Turns a language preset and the active settings into a ready pipeline.
pub struct PipelineBuilder {
    engine: Arc<dyn InferenceEngine>,
    models_root: PathBuf,
    labels_root: PathBuf,
}

impl PipelineBuilder {
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        models_root: impl Into<PathBuf>,
        labels_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            models_root: models_root.into(),
            labels_root: labels_root.into(),
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn models_root(&self) -> &Path {
        &self.models_root
    }

    /// Model, params and (for recognition) label file for one stage.
    pub fn stage_paths(&self, kind: StageKind, language: &LanguagePreset) -> StageModelPaths {
        let dir = match kind {
            StageKind::Detection => &language.detection_model_dir,
            StageKind::Classification => &language.classification_model_dir,
            StageKind::Recognition => &language.recognition_model_dir,
        };
        let model_dir = self.models_root.join(dir);
        let label_file = (kind == StageKind::Recognition)
            .then(|| self.labels_root.join(&language.recognition_label_file_dir));

        StageModelPaths {
            model_file: model_dir.join(MODEL_FILE),
            params_file: model_dir.join(PARAMS_FILE),
            label_file,
        }
    }

    fn construct_stage(
        &self,
        kind: StageKind,
        language: &LanguagePreset,
        runtime: &RuntimeConfig,
        tuning: &StageTuning,
    ) -> Result<Box<dyn StageHandle>> {
        let paths = self.stage_paths(kind, language);
        debug!(
            language = %language.language_code,
            stage = %kind,
            model = %paths.model_file.display(),
            "Constructing stage"
        );

        let init_error = |reason: String| OcrError::PipelineInit {
            language: language.language_code.clone(),
            stage: kind.into(),
            reason,
        };

        let mut stage = self
            .engine
            .construct_stage(kind, &paths, runtime)
            .map_err(|e| init_error(e.to_string()))?;

        if !stage.is_initialized() {
            return Err(init_error(format!(
                "stage not initialized from {}",
                paths.model_file.display()
            )));
        }

        stage.apply_tuning(tuning);
        Ok(stage)
    }

    /// Build the three stages and compose them.
    ///
    /// Blocking. Every failure names the stage and language it happened in.
    pub fn build(
        &self,
        language: &LanguagePreset,
        settings: &AppSettingsPreset,
    ) -> Result<CachedPipeline> {
        let started = Instant::now();
        let runtime = build_runtime(settings.inference_backend, settings.cpu_threads);

        let detection = self.construct_stage(
            StageKind::Detection,
            language,
            &runtime.for_detection(),
            &StageTuning::Detection(settings.detection_tuning()),
        )?;
        let classification = self.construct_stage(
            StageKind::Classification,
            language,
            &runtime,
            &StageTuning::Classification {
                cls_thresh: settings.tuning.cls_thresh,
            },
        )?;
        let recognition = self.construct_stage(
            StageKind::Recognition,
            language,
            &runtime,
            &StageTuning::Recognition,
        )?;

        let composite_error = |reason: String| OcrError::PipelineInit {
            language: language.language_code.clone(),
            stage: PipelineStage::Composite,
            reason,
        };

        let mut handle = self
            .engine
            .compose_pipeline(detection, classification, recognition)
            .map_err(|e| composite_error(e.to_string()))?;

        handle.set_cls_batch_size(CLS_BATCH_SIZE);
        handle.set_rec_batch_size(REC_BATCH_SIZE);

        if !handle.is_initialized() {
            return Err(composite_error("composed pipeline not initialized".to_string()));
        }

        let elapsed = started.elapsed();
        info!(
            language = %language.language_code,
            backend = %settings.inference_backend,
            engine = %self.engine.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Pipeline built"
        );

        Ok(CachedPipeline::new(
            language.clone(),
            settings.inference_backend,
            handle,
            elapsed,
        ))
    }
}
