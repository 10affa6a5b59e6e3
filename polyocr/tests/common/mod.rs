#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine as _;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::json;
use tempfile::TempDir;

use polyocr::engine::{
    EngineError, InferenceBackend, InferenceEngine, PipelineHandle, RawOcrResult, RuntimeConfig,
    StageHandle, StageKind, StageModelPaths, StageTuning,
};
use polyocr::ocr::RecognitionService;
use polyocr::pipeline::{PipelineBuilder, PipelineCache};
use polyocr::presets::{AppOptions, DocumentId, DocumentStore, FileDocumentStore, SettingsManager};

// ── Scripted engine ───────────────────────────────────────────────────────

/// Everything the engine saw, for assertions.
#[derive(Default)]
pub struct EngineLog {
    pub stages: Mutex<Vec<(StageKind, StageModelPaths, RuntimeConfig)>>,
    pub tunings: Mutex<Vec<StageTuning>>,
    pub batch_sizes: Mutex<Vec<(&'static str, usize)>>,
}

/// In-memory engine with counters and failure injection.
#[derive(Default)]
pub struct ScriptedEngine {
    pub constructs: AtomicUsize,
    pub composes: AtomicUsize,
    pub predicts: Arc<AtomicUsize>,
    /// Predict calls currently running, and the highest count seen.
    pub in_flight: Arc<AtomicUsize>,
    pub peak_in_flight: Arc<AtomicUsize>,
    pub log: Arc<EngineLog>,
    /// Sleep inside every stage construction.
    pub build_delay: Duration,
    /// Stage construction fails for this backend.
    pub fail_backend: Mutex<Option<InferenceBackend>>,
    /// Stage construction fails when the model path contains this text.
    pub fail_model_dir: Option<String>,
    /// The composed pipeline reports itself uninitialized.
    pub uninitialized_pipeline: bool,
    /// Sleep inside every `predict`.
    pub predict_delay: Duration,
    /// `predict` fails with this message.
    pub predict_error: Option<String>,
    pub concurrent_predict: bool,
    pub result: RawOcrResult,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            result: two_line_result(),
            ..Default::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            build_delay: delay,
            ..Self::new()
        }
    }

    pub fn construct_count(&self) -> usize {
        self.constructs.load(Ordering::SeqCst)
    }

    pub fn compose_count(&self) -> usize {
        self.composes.load(Ordering::SeqCst)
    }

    pub fn predict_count(&self) -> usize {
        self.predicts.load(Ordering::SeqCst)
    }

    pub fn peak_predicts(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn set_fail_backend(&self, backend: Option<InferenceBackend>) {
        *self.fail_backend.lock().unwrap() = backend;
    }
}

struct ScriptedStage {
    kind: StageKind,
    log: Arc<EngineLog>,
}

impl StageHandle for ScriptedStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn apply_tuning(&mut self, tuning: &StageTuning) {
        self.log.tunings.lock().unwrap().push(tuning.clone());
    }
}

struct ScriptedPipeline {
    log: Arc<EngineLog>,
    predicts: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    delay: Duration,
    initialized: bool,
    concurrent: bool,
    error: Option<String>,
    result: RawOcrResult,
}

impl PipelineHandle for ScriptedPipeline {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn set_cls_batch_size(&mut self, size: usize) {
        self.log.batch_sizes.lock().unwrap().push(("cls", size));
    }

    fn set_rec_batch_size(&mut self, size: usize) {
        self.log.batch_sizes.lock().unwrap().push(("rec", size));
    }

    fn supports_concurrent_predict(&self) -> bool {
        self.concurrent
    }

    fn predict(&self, _image: &DynamicImage) -> Result<RawOcrResult, EngineError> {
        self.predicts.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.error {
            Some(reason) => Err(EngineError::Inference(reason.clone())),
            None => Ok(self.result.clone()),
        }
    }
}

impl InferenceEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn construct_stage(
        &self,
        kind: StageKind,
        paths: &StageModelPaths,
        runtime: &RuntimeConfig,
    ) -> Result<Box<dyn StageHandle>, EngineError> {
        self.constructs.fetch_add(1, Ordering::SeqCst);
        if !self.build_delay.is_zero() {
            std::thread::sleep(self.build_delay);
        }

        if *self.fail_backend.lock().unwrap() == Some(runtime.backend) {
            return Err(EngineError::Runtime(format!("{} rejected", runtime.backend)));
        }
        if let Some(needle) = &self.fail_model_dir {
            if paths.model_file.to_string_lossy().contains(needle.as_str()) {
                return Err(EngineError::Model(format!(
                    "cannot open {}",
                    paths.model_file.display()
                )));
            }
        }

        self.log
            .stages
            .lock()
            .unwrap()
            .push((kind, paths.clone(), runtime.clone()));
        Ok(Box::new(ScriptedStage {
            kind,
            log: Arc::clone(&self.log),
        }))
    }

    fn compose_pipeline(
        &self,
        _detection: Box<dyn StageHandle>,
        _classification: Box<dyn StageHandle>,
        _recognition: Box<dyn StageHandle>,
    ) -> Result<Box<dyn PipelineHandle>, EngineError> {
        self.composes.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedPipeline {
            log: Arc::clone(&self.log),
            predicts: Arc::clone(&self.predicts),
            in_flight: Arc::clone(&self.in_flight),
            peak_in_flight: Arc::clone(&self.peak_in_flight),
            delay: self.predict_delay,
            initialized: !self.uninitialized_pipeline,
            concurrent: self.concurrent_predict,
            error: self.predict_error.clone(),
            result: self.result.clone(),
        }))
    }
}

/// Two detected lines with classifier output.
pub fn two_line_result() -> RawOcrResult {
    RawOcrResult {
        texts: vec!["hello".into(), "world".into()],
        rec_scores: vec![0.98, 0.87],
        cls_scores: vec![0.99, 0.95],
        cls_labels: vec![0, 1],
        boxes: vec![
            vec![10, 20, 110, 20, 110, 40, 10, 40],
            vec![12, 50, 90, 52, 89, 70, 11, 68],
        ],
    }
}

// ── Preset fixtures ───────────────────────────────────────────────────────

/// Write a `default` settings preset with English and Japanese presets,
/// a `gpu` preset with only Chinese, and an `alt` preset that maps `en` to
/// the Chinese models and keeps `ja` as is.
pub fn seed_presets(store: &FileDocumentStore) {
    store
        .write(
            &DocumentId::AppSettings("default".into()),
            &json!({
                "language_presets": { "en": "english", "ja": "japanese" },
                "language_code": "en",
                "inference_backend": "Paddle_CPU",
                "cpu_threads": 4,
                "port": 8080,
                "max_image_width": 1280,
                "det_db_thresh": 0.25,
                "cls_thresh": 0.8
            }),
        )
        .unwrap();
    store
        .write(
            &DocumentId::AppSettings("gpu".into()),
            &json!({
                "language_presets": { "ch": "chinese" },
                "language_code": "ch",
                "inference_backend": "Paddle_GPU",
                "cpu_threads": 0,
                "port": 9090,
                "max_image_width": 960
            }),
        )
        .unwrap();
    store
        .write(
            &DocumentId::AppSettings("alt".into()),
            &json!({
                "language_presets": { "en": "chinese", "ja": "japanese" },
                "language_code": "en",
                "inference_backend": "Paddle_CPU",
                "cpu_threads": 4,
                "port": 8080,
                "max_image_width": 1280
            }),
        )
        .unwrap();
    for (name, dir) in [("english", "en"), ("japanese", "ja"), ("chinese", "ch")] {
        store
            .write(
                &DocumentId::LanguagePreset(name.into()),
                &json!({
                    "detection_model_dir": format!("{dir}_det"),
                    "classification_model_dir": format!("{dir}_cls"),
                    "recognition_model_dir": format!("{dir}_rec"),
                    "recognition_label_file_dir": format!("{dir}_dict.txt")
                }),
            )
            .unwrap();
    }
}

/// Temp preset directory plus everything wired around one engine.
pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<FileDocumentStore>,
    pub engine: Arc<ScriptedEngine>,
    pub settings: Arc<SettingsManager>,
    pub builder: Arc<PipelineBuilder>,
    pub cache: PipelineCache,
    pub service: RecognitionService,
}

impl Harness {
    pub fn new(engine: ScriptedEngine) -> Self {
        Self::with_options(
            engine,
            AppOptions {
                preset_name: "default".into(),
                ..Default::default()
            },
        )
    }

    pub fn with_options(engine: ScriptedEngine, options: AppOptions) -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileDocumentStore::new(dir.path().join("presets")));
        seed_presets(&store);

        let engine = Arc::new(engine);
        let settings = Arc::new(SettingsManager::load(store.clone(), options).unwrap());
        let builder = Arc::new(PipelineBuilder::new(
            engine.clone(),
            dir.path().join("models"),
            dir.path().join("labels"),
        ));
        let cache = PipelineCache::new(Arc::clone(&settings), Arc::clone(&builder));
        let service = RecognitionService::new(Arc::clone(&settings), cache.clone());

        Self {
            dir,
            store,
            engine,
            settings,
            builder,
            cache,
            service,
        }
    }
}

// ── Images ────────────────────────────────────────────────────────────────

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::new(width, height)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn png_base64(width: u32, height: u32) -> String {
    base64::engine::general_purpose::STANDARD.encode(png_bytes(width, height))
}
