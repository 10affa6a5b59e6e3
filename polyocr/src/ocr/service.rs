use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info, warn};

use super::codec::{context_resolution, decode_base64, decode_image};
use super::result::{normalize, OcrResponse};
use crate::error::{OcrError, Result};
use crate::pipeline::PipelineCache;
use crate::presets::{AppSettingsPreset, SettingsManager, SettingsUpdate};

/// Request-level orchestration shared by the HTTP and RPC surfaces.
#[derive(Clone)]
pub struct RecognitionService {
    settings: Arc<SettingsManager>,
    cache: PipelineCache,
}

impl RecognitionService {
    pub fn new(settings: Arc<SettingsManager>, cache: PipelineCache) -> Self {
        Self { settings, cache }
    }

    pub fn settings(&self) -> &SettingsManager {
        &self.settings
    }

    pub fn cache(&self) -> &PipelineCache {
        &self.cache
    }

    /// Recognize text in an already decoded image.
    pub async fn infer(
        &self,
        id: &str,
        image: DynamicImage,
        language_code: &str,
    ) -> Result<OcrResponse> {
        let pipeline = self.cache.get_or_build(language_code).await?;
        let resolution = context_resolution(&image);
        let started = Instant::now();

        let raw = tokio::task::spawn_blocking(move || pipeline.predict(&image))
            .await
            .map_err(|e| OcrError::Internal(format!("prediction task panicked: {e}")))??;

        let response = normalize(id, &raw, resolution)?;
        debug!(
            language = %language_code,
            width = resolution.width,
            height = resolution.height,
            lines = response.results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Recognition finished"
        );
        Ok(response)
    }

    /// Decode image bytes, then recognize. Decode failures never touch the cache.
    pub async fn infer_encoded(
        &self,
        id: &str,
        bytes: Vec<u8>,
        language_code: &str,
    ) -> Result<OcrResponse> {
        let image = tokio::task::spawn_blocking(move || decode_image(&bytes))
            .await
            .map_err(|e| OcrError::Internal(format!("decode task panicked: {e}")))??;
        self.infer(id, image, language_code).await
    }

    pub async fn infer_base64(
        &self,
        id: &str,
        payload: &str,
        language_code: &str,
    ) -> Result<OcrResponse> {
        let bytes = decode_base64(payload)?;
        self.infer_encoded(id, bytes, language_code).await
    }

    pub fn supported_languages(&self) -> Vec<String> {
        self.settings.available_languages()
    }

    /// Apply a settings change.
    ///
    /// Pipelines whose language preset is unchanged keep the tuning they were
    /// built with; the next build picks up the new one. Pipelines whose
    /// language preset was replaced or removed (for example by switching the
    /// active preset) are evicted.
    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<AppSettingsPreset> {
        let settings = Arc::clone(&self.settings);
        let preset = tokio::task::spawn_blocking(move || settings.update(&update))
            .await
            .map_err(|e| OcrError::Internal(format!("settings update task panicked: {e}")))??;

        self.cache.evict_stale();
        Ok(preset)
    }

    /// Build pipelines ahead of the first request.
    ///
    /// Failures are logged and reported, never fatal: the failed language is
    /// retried on its first request.
    pub async fn warm_up(&self, init_all: bool) -> Vec<(String, Result<()>)> {
        let outcomes = if init_all {
            self.cache.init_all().await
        } else {
            let code = self.settings.default_language();
            let outcome = self.cache.init_single().await.map(|_| ());
            vec![(code, outcome)]
        };

        for (code, outcome) in &outcomes {
            match outcome {
                Ok(()) => info!(language = %code, "Pipeline ready"),
                Err(e) => warn!(language = %code, error = %e, "Pipeline warm-up failed"),
            }
        }
        outcomes
    }
}
