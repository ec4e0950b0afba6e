use anyhow::Context;
use ollama_assist::settings::Defaults;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Model server base URL (default: http://localhost:11434).
    pub ollama_url: Option<String>,

    /// System prompt sent with every request.
    pub system_prompt: Option<String>,

    /// Model used until one is selected.
    pub model: Option<String>,

    /// Provider identifier ("ollama" or "stub").
    pub provider: Option<String>,

    pub connect_timeout_secs: Option<u64>,
}

impl Config {
    /// Load config if the file exists, otherwise return Ok(None).
    pub fn load_optional(path: impl AsRef<Path>) -> anyhow::Result<Option<Self>> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("failed to read config: {}", path.display()))
            }
        };

        let s = String::from_utf8(bytes).context("config is not valid UTF-8")?;
        let cfg: Config = toml::from_str(&s)
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;
        Ok(Some(cfg))
    }

    pub fn defaults(&self) -> Defaults {
        let base = Defaults::default();
        Defaults {
            url: self.ollama_url.clone().unwrap_or(base.url),
            system_prompt: self.system_prompt.clone().unwrap_or(base.system_prompt),
            model: self.model.clone(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }
}
