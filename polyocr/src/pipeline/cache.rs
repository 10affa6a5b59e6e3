use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{CachedPipeline, PipelineBuilder};
use crate::error::{OcrError, Result};
use crate::presets::SettingsManager;

/// `None` until the build finishes.
type BuildOutcome = Option<Result<Arc<CachedPipeline>>>;

enum Slot {
    Ready(Arc<CachedPipeline>),
    Building(watch::Receiver<BuildOutcome>),
}

/// Built pipelines keyed by language code.
///
/// At most one build runs per key. Callers arriving while a build is in
/// flight wait for it and receive the same outcome. The map lock is only held
/// to look up or swap slots, never across a build, so keys never block each
/// other.
#[derive(Clone)]
pub struct PipelineCache {
    settings: Arc<SettingsManager>,
    builder: Arc<PipelineBuilder>,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl PipelineCache {
    pub fn new(settings: Arc<SettingsManager>, builder: Arc<PipelineBuilder>) -> Self {
        Self {
            settings,
            builder,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn engine_name(&self) -> &str {
        self.builder.engine_name()
    }

    /// Return the pipeline for `language_code`, building it on first use.
    pub async fn get_or_build(&self, language_code: &str) -> Result<Arc<CachedPipeline>> {
        if !self.settings.contains_language(language_code) {
            return Err(OcrError::UnknownLanguage(language_code.to_string()));
        }

        let mut rx = {
            let mut slots = self.lock();
            match slots.get(language_code) {
                Some(Slot::Ready(pipeline)) => return Ok(Arc::clone(pipeline)),
                Some(Slot::Building(rx)) => {
                    debug!(language = %language_code, "Waiting for in-flight pipeline build");
                    rx.clone()
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    slots.insert(language_code.to_string(), Slot::Building(rx.clone()));
                    self.spawn_build(language_code.to_string(), tx);
                    rx
                }
            }
        };

        let no_result = || {
            OcrError::Internal(format!(
                "pipeline build for [{language_code}] ended without a result"
            ))
        };

        let outcome = rx.wait_for(Option::is_some).await.map_err(|_| no_result())?;
        outcome.clone().unwrap_or_else(|| Err(no_result()))
    }

    /// Run the build detached from the caller, so a dropped request cannot
    /// strand other waiters or leave a stale `Building` slot.
    fn spawn_build(&self, language_code: String, tx: watch::Sender<BuildOutcome>) {
        let cache = self.clone();
        tokio::spawn(async move {
            info!(language = %language_code, "Building pipeline");
            let outcome = cache.run_build(&language_code).await;

            {
                let mut slots = cache.lock();
                match &outcome {
                    Ok(pipeline) if cache.is_current(&language_code, pipeline) => {
                        slots.insert(language_code.clone(), Slot::Ready(Arc::clone(pipeline)));
                    }
                    Ok(_) => {
                        // The preset changed while building; serve this caller but do not cache.
                        debug!(language = %language_code, "Discarding pipeline built from a replaced preset");
                        slots.remove(&language_code);
                    }
                    Err(e) => {
                        warn!(language = %language_code, error = %e, "Pipeline build failed");
                        slots.remove(&language_code);
                    }
                }
            }

            let _ = tx.send(Some(outcome));
        });
    }

    async fn run_build(&self, language_code: &str) -> Result<Arc<CachedPipeline>> {
        // Snapshot at build start; later settings changes do not affect this build.
        let (language, settings) = self.settings.build_inputs(language_code)?;
        let builder = Arc::clone(&self.builder);

        tokio::task::spawn_blocking(move || builder.build(&language, &settings))
            .await
            .map_err(|e| OcrError::Internal(format!("pipeline build task panicked: {e}")))?
            .map(Arc::new)
    }

    /// Whether `pipeline` was built from the language preset currently
    /// active for `language_code`.
    fn is_current(&self, language_code: &str, pipeline: &CachedPipeline) -> bool {
        self.settings.snapshot().languages.get(language_code) == Some(pipeline.language_preset())
    }

    /// Drop built pipelines whose language preset is gone or has changed.
    ///
    /// Called after a settings update. Pipelines built from an unchanged
    /// language preset are kept. Returns the dropped codes, sorted.
    pub fn evict_stale(&self) -> Vec<String> {
        let snapshot = self.settings.snapshot();
        let mut slots = self.lock();
        let mut evicted = Vec::new();

        slots.retain(|code, slot| match slot {
            Slot::Ready(pipeline)
                if snapshot.languages.get(code) != Some(pipeline.language_preset()) =>
            {
                evicted.push(code.clone());
                false
            }
            _ => true,
        });

        evicted.sort();
        if !evicted.is_empty() {
            info!(languages = ?evicted, "Stale pipelines evicted");
        }
        evicted
    }

    /// Drop a built pipeline. In-flight builds are left alone.
    pub fn invalidate(&self, language_code: &str) -> bool {
        let mut slots = self.lock();
        if matches!(slots.get(language_code), Some(Slot::Ready(_))) {
            slots.remove(language_code);
            info!(language = %language_code, "Pipeline invalidated");
            true
        } else {
            false
        }
    }

    /// Drop every built pipeline; returns how many were dropped.
    pub fn invalidate_all(&self) -> usize {
        let mut slots = self.lock();
        let before = slots.len();
        slots.retain(|_, slot| matches!(slot, Slot::Building(_)));
        let dropped = before - slots.len();
        info!(dropped, "All pipelines invalidated");
        dropped
    }

    /// Language codes with a built pipeline, sorted.
    pub fn cached_languages(&self) -> Vec<String> {
        let slots = self.lock();
        let mut codes: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Ready(_)))
            .map(|(code, _)| code.clone())
            .collect();
        codes.sort();
        codes
    }

    /// Build every known language concurrently and report each outcome.
    pub async fn init_all(&self) -> Vec<(String, Result<()>)> {
        let codes = self.settings.available_languages();
        info!(languages = ?codes, "Initializing all language pipelines");

        let outcomes = join_all(codes.iter().map(|code| self.get_or_build(code))).await;

        codes
            .into_iter()
            .zip(outcomes)
            .map(|(code, outcome)| (code, outcome.map(|_| ())))
            .collect()
    }

    /// Build only the default language's pipeline.
    pub async fn init_single(&self) -> Result<Arc<CachedPipeline>> {
        let code = self.settings.default_language();
        info!(language = %code, "Initializing default language pipeline");
        self.get_or_build(&code).await
    }
}
