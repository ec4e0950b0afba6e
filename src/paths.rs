use anyhow::Context;
use std::ffi::OsString;
use std::path::PathBuf;

const APP: &str = "ollama-assist";

/// Where config (read-only to us) and settings (written back) live.
///
/// `OLLAMA_ASSIST_HOME` puts both under one root; otherwise the XDG base
/// directories apply, falling back to `~/.config` and `~/.local/state`.
/// Nothing is created here: a missing config is fine and the settings store
/// creates its directory on first save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    pub config: PathBuf,
    pub state: PathBuf,
}

impl AppDirs {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::resolve(|key| std::env::var_os(key))
    }

    fn resolve(var: impl Fn(&str) -> Option<OsString>) -> anyhow::Result<Self> {
        if let Some(root) = var("OLLAMA_ASSIST_HOME").map(PathBuf::from) {
            return Ok(Self {
                config: root.join("config"),
                state: root.join("state"),
            });
        }

        let home = || {
            var("HOME")
                .map(PathBuf::from)
                .context("HOME is not set and no XDG directory was given")
        };
        let config = match var("XDG_CONFIG_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => home()?.join(".config"),
        };
        let state = match var("XDG_STATE_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => home()?.join(".local").join("state"),
        };

        Ok(Self {
            config: config.join(APP),
            state: state.join(APP),
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Selected model, history and templates.
    pub fn settings_file(&self) -> PathBuf {
        self.state.join("settings.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn dirs(vars: &[(&str, &str)]) -> anyhow::Result<AppDirs> {
        let env: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        AppDirs::resolve(|key| env.get(key).cloned())
    }

    #[test]
    fn app_home_wins() {
        let d = dirs(&[("OLLAMA_ASSIST_HOME", "/opt/oa"), ("XDG_CONFIG_HOME", "/x")]).unwrap();
        assert_eq!(d.config_file(), PathBuf::from("/opt/oa/config/config.toml"));
        assert_eq!(d.settings_file(), PathBuf::from("/opt/oa/state/settings.json"));
    }

    #[test]
    fn xdg_then_home() {
        let d = dirs(&[("XDG_CONFIG_HOME", "/xdg/cfg"), ("HOME", "/home/u")]).unwrap();
        assert_eq!(d.config, PathBuf::from("/xdg/cfg/ollama-assist"));
        assert_eq!(d.state, PathBuf::from("/home/u/.local/state/ollama-assist"));
    }

    #[test]
    fn no_home_is_an_error() {
        assert!(dirs(&[]).is_err());
        assert!(dirs(&[("XDG_CONFIG_HOME", "/a"), ("XDG_STATE_HOME", "/b")]).is_ok());
    }
}
