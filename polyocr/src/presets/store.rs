use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{OcrError, Result};

const LANGUAGE_PRESETS_DIR: &str = "language_presets";

/// Address of one configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentId {
    AppSettings(String),
    LanguagePreset(String),
}

impl DocumentId {
    pub fn name(&self) -> &str {
        match self {
            Self::AppSettings(name) | Self::LanguagePreset(name) => name,
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppSettings(name) => write!(f, "{name}"),
            Self::LanguagePreset(name) => write!(f, "{LANGUAGE_PRESETS_DIR}/{name}"),
        }
    }
}

/// Key-value store of JSON configuration documents.
pub trait DocumentStore: Send + Sync {
    /// Missing documents fail with `ConfigLoad` naming the document.
    fn read(&self, id: &DocumentId) -> Result<Value>;

    /// Replace the whole document in one step.
    fn write(&self, id: &DocumentId, value: &Value) -> Result<()>;
}

/// Documents as pretty-printed JSON files under one root directory.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &DocumentId) -> Result<PathBuf> {
        let name = id.name();
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.contains('\0')
        {
            return Err(OcrError::config_load(
                id.to_string(),
                "document name must not be empty or contain path separators or '..'",
            ));
        }

        let file = format!("{name}.json");
        Ok(match id {
            DocumentId::AppSettings(_) => self.root.join(file),
            DocumentId::LanguagePreset(_) => self.root.join(LANGUAGE_PRESETS_DIR).join(file),
        })
    }
}

impl DocumentStore for FileDocumentStore {
    fn read(&self, id: &DocumentId) -> Result<Value> {
        let path = self.path_for(id)?;
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                OcrError::config_load(id.to_string(), format!("document not found at {}", path.display()))
            }
            _ => OcrError::config_load(id.to_string(), format!("failed to read {}: {e}", path.display())),
        })?;

        serde_json::from_str(&content)
            .map_err(|e| OcrError::config_load(id.to_string(), format!("invalid JSON: {e}")))
    }

    fn write(&self, id: &DocumentId, value: &Value) -> Result<()> {
        let path = self.path_for(id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                OcrError::config_load(id.to_string(), format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let content = serde_json::to_string_pretty(value)
            .map_err(|e| OcrError::config_load(id.to_string(), format!("failed to serialize: {e}")))?;

        // Write beside the target, then rename over it so readers never see a partial file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| {
            OcrError::config_load(id.to_string(), format!("failed to write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            OcrError::config_load(id.to_string(), format!("failed to replace {}: {e}", path.display()))
        })?;

        tracing::debug!(document = %id, path = %path.display(), "Document written");
        Ok(())
    }
}
