use crate::history::HistoryEntry;
use crate::provider::DEFAULT_SYSTEM_PROMPT;
use crate::templates::Template;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const KEY_URL: &str = "ollamaUrl";
pub const KEY_SYSTEM_PROMPT: &str = "systemPrompt";
pub const KEY_SELECTED_MODEL: &str = "selected_model";
pub const KEY_HISTORY: &str = "history";
pub const KEY_TEMPLATES: &str = "templates";

pub const DEFAULT_URL: &str = "http://localhost:11434";

/// Persistent key-value settings.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value);
    fn persist(&mut self) -> anyhow::Result<()>;
}

/// Settings kept in a JSON object on disk.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
    values: Map<String, Value>,
}

impl FileSettings {
    /// Load `path`, or start empty if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let values = match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("failed to read settings: {}", path.display()))
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn persist(&mut self) -> anyhow::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create settings directory: {}", dir.display()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let bytes = serde_json::to_vec_pretty(&self.values).context("failed to serialize settings")?;
        std::fs::write(&tmp, bytes)
            .with_context(|| format!("failed to write temp settings: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to move settings into place: {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "settings persisted");
        Ok(())
    }
}

/// In-memory store; `persist` only counts calls.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: Map<String, Value>,
    persisted: usize,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persist_count(&self) -> usize {
        self.persisted
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn persist(&mut self) -> anyhow::Result<()> {
        self.persisted += 1;
        Ok(())
    }
}

/// Fallbacks for keys the store does not hold.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub url: String,
    pub system_prompt: String,
    pub model: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            model: None,
        }
    }
}

/// Typed view over a [`SettingsStore`].
///
/// Read order: per-session override, then the store, then [`Defaults`].
#[derive(Debug, Clone)]
pub struct Settings<S> {
    store: S,
    defaults: Defaults,
    url_override: Option<String>,
    model_override: Option<String>,
}

impl<S: SettingsStore> Settings<S> {
    pub fn new(store: S, defaults: Defaults) -> Self {
        Self {
            store,
            defaults,
            url_override: None,
            model_override: None,
        }
    }

    /// Session-only values that are never written to the store.
    pub fn with_overrides(mut self, url: Option<String>, model: Option<String>) -> Self {
        self.url_override = url;
        self.model_override = model;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.store.get(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring malformed setting");
                None
            }
        }
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> anyhow::Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("failed to serialize setting {key}"))?;
        self.store.set(key, value);
        Ok(())
    }

    pub fn url(&self) -> String {
        self.url_override
            .clone()
            .or_else(|| self.read(KEY_URL))
            .unwrap_or_else(|| self.defaults.url.clone())
    }

    pub fn system_prompt(&self) -> String {
        self.read(KEY_SYSTEM_PROMPT)
            .unwrap_or_else(|| self.defaults.system_prompt.clone())
    }

    pub fn selected_model(&self) -> Option<String> {
        self.model_override
            .clone()
            .or_else(|| self.read::<String>(KEY_SELECTED_MODEL))
            .or_else(|| self.defaults.model.clone())
            .filter(|m| !m.trim().is_empty())
    }

    pub fn set_selected_model(&mut self, model: &str) -> anyhow::Result<()> {
        // An explicit choice replaces the session override.
        self.model_override = None;
        self.write(KEY_SELECTED_MODEL, &model)
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.read(KEY_HISTORY).unwrap_or_default()
    }

    pub fn set_history(&mut self, history: &[HistoryEntry]) -> anyhow::Result<()> {
        self.write(KEY_HISTORY, &history)
    }

    pub fn templates(&self) -> Vec<Template> {
        self.read(KEY_TEMPLATES).unwrap_or_default()
    }

    pub fn set_templates(&mut self, templates: &[Template]) -> anyhow::Result<()> {
        self.write(KEY_TEMPLATES, &templates)
    }

    pub fn persist(&mut self) -> anyhow::Result<()> {
        self.store.persist()
    }
}
