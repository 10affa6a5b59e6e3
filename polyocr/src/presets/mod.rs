//! Preset documents: the app-settings preset and the per-language model
//! locations it references.
//!
//! # Layout
//!
//! With the file store, documents live under one root:
//! - `<root>/<name>.json` for app-settings presets
//! - `<root>/language_presets/<name>.json` for language presets
//!
//! The active settings are owned by [`SettingsManager`]; everything else reads
//! snapshots from it.

mod loader;
mod manager;
mod store;
mod types;

pub use loader::{load_app_settings_preset, load_language_presets, save_app_settings_preset};
pub use manager::{SettingsManager, SettingsSnapshot};
pub use store::{DocumentId, DocumentStore, FileDocumentStore};
pub use types::{
    AppOptions, AppSettingsPreset, LanguagePreset, SettingsUpdate, TuningParams, DEFAULT_SENTINEL,
};
