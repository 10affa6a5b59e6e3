use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{info, warn};

use super::loader::{load_app_settings_preset, load_language_presets, save_app_settings_preset};
use super::store::DocumentStore;
use super::types::{AppOptions, AppSettingsPreset, LanguagePreset, SettingsUpdate};
use crate::error::{OcrError, Result};

/// Active settings plus the language table they reference.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSnapshot {
    pub preset: AppSettingsPreset,
    pub languages: BTreeMap<String, LanguagePreset>,
}

/// Owner of the one process-wide settings instance.
///
/// Readers take cheap `Arc` snapshots. Updates are serialized, validated and
/// persisted before the new snapshot becomes visible.
pub struct SettingsManager {
    store: Arc<dyn DocumentStore>,
    overrides: AppOptions,
    state: RwLock<Arc<SettingsSnapshot>>,
    update_gate: Mutex<()>,
}

impl SettingsManager {
    pub fn load(store: Arc<dyn DocumentStore>, overrides: AppOptions) -> Result<Self> {
        let snapshot = Self::read_snapshot(store.as_ref(), &overrides.preset_name, &overrides)?;

        info!(
            preset = %snapshot.preset.preset_name,
            backend = %snapshot.preset.inference_backend,
            port = snapshot.preset.server_port,
            default_language = %snapshot.preset.language_code,
            "Settings loaded"
        );
        if !snapshot.languages.contains_key(&snapshot.preset.language_code) {
            warn!(
                language = %snapshot.preset.language_code,
                "Default language has no language preset"
            );
        }

        Ok(Self {
            store,
            overrides,
            state: RwLock::new(Arc::new(snapshot)),
            update_gate: Mutex::new(()),
        })
    }

    fn read_snapshot(
        store: &dyn DocumentStore,
        preset_name: &str,
        overrides: &AppOptions,
    ) -> Result<SettingsSnapshot> {
        let mut preset = load_app_settings_preset(store, preset_name)?;
        preset.apply_overrides(overrides);
        let languages = load_language_presets(store, &preset.language_presets)?;
        Ok(SettingsSnapshot { preset, languages })
    }

    pub fn snapshot(&self) -> Arc<SettingsSnapshot> {
        Arc::clone(&*self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn current(&self) -> AppSettingsPreset {
        self.snapshot().preset.clone()
    }

    pub fn contains_language(&self, language_code: &str) -> bool {
        self.snapshot().languages.contains_key(language_code)
    }

    /// Everything a pipeline build for `language_code` needs, read at one instant.
    pub fn build_inputs(&self, language_code: &str) -> Result<(LanguagePreset, AppSettingsPreset)> {
        let snapshot = self.snapshot();
        let language = snapshot
            .languages
            .get(language_code)
            .cloned()
            .ok_or_else(|| OcrError::UnknownLanguage(language_code.to_string()))?;
        Ok((language, snapshot.preset.clone()))
    }

    /// Language codes with a preset, sorted.
    pub fn available_languages(&self) -> Vec<String> {
        self.snapshot().languages.keys().cloned().collect()
    }

    pub fn default_language(&self) -> String {
        self.snapshot().preset.language_code.clone()
    }

    /// Apply a partial update, persist it, then publish it.
    ///
    /// On any failure the previous settings stay active and the stored
    /// document is left as it was.
    pub fn update(&self, update: &SettingsUpdate) -> Result<AppSettingsPreset> {
        let _gate = self.update_gate.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();

        let mut candidate = match &update.preset_name {
            Some(name) if *name != current.preset.preset_name => {
                info!(from = %current.preset.preset_name, to = %name, "Switching settings preset");
                Self::read_snapshot(self.store.as_ref(), name, &self.overrides)?
            }
            _ => current.as_ref().clone(),
        };

        update.apply_to(&mut candidate.preset)?;
        candidate.preset.check()?;

        if update.language_code.is_some()
            && !candidate.languages.contains_key(&candidate.preset.language_code)
        {
            return Err(OcrError::Validation(format!(
                "language_code '{}' has no language preset",
                candidate.preset.language_code
            )));
        }

        save_app_settings_preset(self.store.as_ref(), &candidate.preset)?;

        let preset = candidate.preset.clone();
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(candidate);

        info!(
            preset = %preset.preset_name,
            backend = %preset.inference_backend,
            cpu_threads = preset.cpu_threads,
            max_image_width = preset.max_image_width,
            "Settings updated"
        );
        Ok(preset)
    }

    /// Persist the current in-memory preset.
    pub fn save(&self) -> Result<()> {
        save_app_settings_preset(self.store.as_ref(), &self.snapshot().preset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InferenceBackend;
    use crate::presets::store::{DocumentId, FileDocumentStore};
    use serde_json::json;
    use tempfile::TempDir;

    fn seeded_store() -> (TempDir, Arc<FileDocumentStore>) {
        let dir = TempDir::new().unwrap();
        let store = FileDocumentStore::new(dir.path());
        store
            .write(
                &DocumentId::AppSettings("default".into()),
                &json!({
                    "language_presets": { "ja": "japanese", "en": "english" },
                    "language_code": "en",
                    "inference_backend": "Paddle_CPU",
                    "cpu_threads": 0,
                    "port": 8080,
                    "max_image_width": 1920
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
        for (name, dir_name) in [("english", "en"), ("japanese", "ja"), ("chinese", "ch")] {
            store
                .write(
                    &DocumentId::LanguagePreset(name.into()),
                    &json!({
                        "detection_model_dir": format!("{dir_name}/det"),
                        "classification_model_dir": format!("{dir_name}/cls"),
                        "recognition_model_dir": format!("{dir_name}/rec"),
                        "recognition_label_file_dir": format!("{dir_name}.txt")
                    }),
                )
                .unwrap();
        }
        (dir, Arc::new(store))
    }

    fn options() -> AppOptions {
        AppOptions {
            preset_name: "default".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_available_languages_sorted() {
        let (_dir, store) = seeded_store();
        let manager = SettingsManager::load(store, options()).unwrap();
        assert_eq!(manager.available_languages(), vec!["en", "ja"]);
        assert!(manager.contains_language("ja"));
        assert!(!manager.contains_language("ch"));
    }

    #[test]
    fn test_build_inputs_unknown_language() {
        let (_dir, store) = seeded_store();
        let manager = SettingsManager::load(store, options()).unwrap();
        let err = manager.build_inputs("xx").unwrap_err();
        assert!(matches!(err, OcrError::UnknownLanguage(ref c) if c == "xx"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let (_dir, store) = seeded_store();
        let overrides = AppOptions {
            preset_name: "default".into(),
            language_code: Some("ja".into()),
            inference_backend: Some(InferenceBackend::OnnxCpu),
            server_port: Some(7000),
        };
        let manager = SettingsManager::load(store, overrides).unwrap();
        let preset = manager.current();
        assert_eq!(preset.language_code, "ja");
        assert_eq!(preset.inference_backend, InferenceBackend::OnnxCpu);
        assert_eq!(preset.server_port, 7000);
    }

    #[test]
    fn test_update_persists_and_publishes() {
        let (_dir, store) = seeded_store();
        let manager = SettingsManager::load(store.clone(), options()).unwrap();

        let update = SettingsUpdate {
            cpu_threads: Some(6),
            det_db_thresh: Some(0.4),
            ..Default::default()
        };
        manager.update(&update).unwrap();

        assert_eq!(manager.current().cpu_threads, 6);
        let stored = store.read(&DocumentId::AppSettings("default".into())).unwrap();
        assert_eq!(stored["cpu_threads"], json!(6));
        assert_eq!(stored["det_db_thresh"], json!(0.4));
    }

    #[test]
    fn test_rejected_update_keeps_prior_settings_and_document() {
        let (_dir, store) = seeded_store();
        let manager = SettingsManager::load(store.clone(), options()).unwrap();
        let before = manager.current();
        let stored_before = store.read(&DocumentId::AppSettings("default".into())).unwrap();

        let bad_threshold = SettingsUpdate {
            cpu_threads: Some(12),
            cls_thresh: Some(4.0),
            ..Default::default()
        };
        assert_eq!(manager.update(&bad_threshold).unwrap_err().kind(), "validation");

        let bad_backend = SettingsUpdate {
            inference_backend: Some("Metal".into()),
            ..Default::default()
        };
        assert_eq!(manager.update(&bad_backend).unwrap_err().kind(), "unknown_backend");

        assert_eq!(manager.current(), before);
        let stored_after = store.read(&DocumentId::AppSettings("default".into())).unwrap();
        assert_eq!(stored_after, stored_before);
    }

    #[test]
    fn test_switching_preset_reloads_language_table() {
        let (_dir, store) = seeded_store();
        let manager = SettingsManager::load(store, options()).unwrap();

        let update = SettingsUpdate {
            preset_name: Some("gpu".into()),
            ..Default::default()
        };
        let preset = manager.update(&update).unwrap();

        assert_eq!(preset.preset_name, "gpu");
        assert_eq!(preset.inference_backend, InferenceBackend::PaddleGpu);
        assert_eq!(manager.available_languages(), vec!["ch"]);
    }

    #[test]
    fn test_switching_to_missing_preset_fails_cleanly() {
        let (_dir, store) = seeded_store();
        let manager = SettingsManager::load(store, options()).unwrap();

        let update = SettingsUpdate {
            preset_name: Some("nope".into()),
            ..Default::default()
        };
        assert_eq!(manager.update(&update).unwrap_err().kind(), "config_load");
        assert_eq!(manager.current().preset_name, "default");
    }

    #[test]
    fn test_update_to_language_without_preset_is_rejected() {
        let (_dir, store) = seeded_store();
        let manager = SettingsManager::load(store, options()).unwrap();

        let update = SettingsUpdate {
            language_code: Some("ko".into()),
            ..Default::default()
        };
        assert_eq!(manager.update(&update).unwrap_err().kind(), "validation");
        assert_eq!(manager.default_language(), "en");
    }
}
