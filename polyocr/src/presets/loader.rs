use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use super::store::{DocumentId, DocumentStore};
use super::types::{AppSettingsPreset, LanguagePreset};
use crate::engine::InferenceBackend;
use crate::error::{OcrError, Result};

/// Report every required key that is absent or `null`, in one error.
fn check_required_keys(id: &DocumentId, doc: &Value, required: &[&str]) -> Result<()> {
    let Some(object) = doc.as_object() else {
        return Err(OcrError::config_load(id.to_string(), "document is not a JSON object"));
    };

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|key| object.get(*key).map_or(true, Value::is_null))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(OcrError::config_load(
            missing.join(", "),
            format!("missing required field(s) in {id}"),
        ))
    }
}

fn decode<T: DeserializeOwned>(id: &DocumentId, doc: Value) -> Result<T> {
    serde_json::from_value(doc).map_err(|e| OcrError::config_load(id.to_string(), e))
}

/// Load and validate the named app-settings preset.
pub fn load_app_settings_preset(store: &dyn DocumentStore, name: &str) -> Result<AppSettingsPreset> {
    let id = DocumentId::AppSettings(name.to_string());
    let doc = store.read(&id)?;

    check_required_keys(&id, &doc, &AppSettingsPreset::REQUIRED_KEYS)?;

    // Surface a bad backend name as its own error kind rather than a generic decode failure.
    match doc.get("inference_backend") {
        Some(Value::String(backend)) => {
            backend.parse::<InferenceBackend>()?;
        }
        Some(other) => {
            return Err(OcrError::config_load(
                "inference_backend",
                format!("expected a string, found {other}"),
            ))
        }
        None => {}
    }

    let mut preset: AppSettingsPreset = decode(&id, doc)?;
    preset.preset_name = name.to_string();
    preset.check()?;

    info!(
        preset = %preset.preset_name,
        backend = %preset.inference_backend,
        language = %preset.language_code,
        languages = preset.language_presets.len(),
        "App settings preset loaded"
    );
    Ok(preset)
}

/// Load one language preset per `language code -> document name` entry.
pub fn load_language_presets(
    store: &dyn DocumentStore,
    preset_map: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, LanguagePreset>> {
    let mut presets = BTreeMap::new();

    for (language_code, preset_name) in preset_map {
        let id = DocumentId::LanguagePreset(preset_name.clone());
        let doc = store.read(&id)?;
        check_required_keys(&id, &doc, &LanguagePreset::REQUIRED_KEYS)?;

        let mut preset: LanguagePreset = decode(&id, doc)?;
        preset.name = preset_name.clone();
        preset.language_code = language_code.clone();

        info!(language = %language_code, preset = %preset_name, "Language preset loaded");
        presets.insert(language_code.clone(), preset);
    }

    Ok(presets)
}

/// Persist the whole preset under its own name.
pub fn save_app_settings_preset(store: &dyn DocumentStore, preset: &AppSettingsPreset) -> Result<()> {
    let id = DocumentId::AppSettings(preset.preset_name.clone());
    let doc = serde_json::to_value(preset)
        .map_err(|e| OcrError::Internal(format!("failed to serialize preset {id}: {e}")))?;
    store.write(&id, &doc)
}
