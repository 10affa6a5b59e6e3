//! Pipeline construction and the language-keyed pipeline cache.

mod builder;
mod cache;

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use image::DynamicImage;

pub use builder::{PipelineBuilder, CLS_BATCH_SIZE, MODEL_FILE, PARAMS_FILE, REC_BATCH_SIZE};
pub use cache::PipelineCache;

use crate::engine::{InferenceBackend, PipelineHandle, RawOcrResult};
use crate::error::{OcrError, Result};
use crate::presets::LanguagePreset;

/// A ready pipeline for one language.
///
/// Never mutated after construction. Settings changed later do not reach an
/// existing pipeline; it has to be invalidated and rebuilt.
pub struct CachedPipeline {
    /// The language preset this pipeline was built from.
    language: LanguagePreset,
    backend: InferenceBackend,
    handle: Box<dyn PipelineHandle>,
    /// Present when the engine handle cannot run `predict` concurrently.
    predict_gate: Option<Mutex<()>>,
    build_duration: Duration,
}

impl CachedPipeline {
    pub fn new(
        language: LanguagePreset,
        backend: InferenceBackend,
        handle: Box<dyn PipelineHandle>,
        build_duration: Duration,
    ) -> Self {
        let predict_gate = (!handle.supports_concurrent_predict()).then(|| Mutex::new(()));
        Self {
            language,
            backend,
            handle,
            predict_gate,
            build_duration,
        }
    }

    pub fn language_code(&self) -> &str {
        &self.language.language_code
    }

    pub fn language_preset(&self) -> &LanguagePreset {
        &self.language
    }

    pub fn backend(&self) -> InferenceBackend {
        self.backend
    }

    pub fn build_duration(&self) -> Duration {
        self.build_duration
    }

    /// Run inference. Blocking; call from the blocking pool.
    pub fn predict(&self, image: &DynamicImage) -> Result<RawOcrResult> {
        let _guard = self
            .predict_gate
            .as_ref()
            .map(|gate| gate.lock().unwrap_or_else(PoisonError::into_inner));

        self.handle
            .predict(image)
            .map_err(|e| OcrError::Prediction {
                language: self.language.language_code.clone(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Debug for CachedPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedPipeline")
            .field("language_code", &self.language.language_code)
            .field("preset", &self.language.name)
            .field("backend", &self.backend)
            .field("serialized_predict", &self.predict_gate.is_some())
            .field("build_duration", &self.build_duration)
            .finish()
    }
}
