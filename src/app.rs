use crate::config;
use anyhow::Context;
use ollama_assist::provider::{self, Provider};
use std::sync::Arc;

pub fn build_http(cfg: Option<&config::Config>) -> anyhow::Result<reqwest::Client> {
    let timeout = cfg.map(|c| c.connect_timeout()).unwrap_or_else(|| {
        config::Config::default().connect_timeout()
    });
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(timeout)
        .build()
        .context("failed to build HTTP client")
}

pub fn build_provider(
    http: &reqwest::Client,
    provider_name: &str,
) -> anyhow::Result<Arc<dyn Provider>> {
    match provider_name {
        "ollama" => {
            #[cfg(feature = "ollama")]
            {
                Ok(Arc::new(provider::ollama::OllamaProvider::new(http.clone())))
            }
            #[cfg(not(feature = "ollama"))]
            {
                let _ = http;
                anyhow::bail!("ollama provider is not enabled in this build")
            }
        }
        "stub" => Ok(Arc::new(provider::stub::StubProvider::new())),
        other => anyhow::bail!("unknown provider: {other}"),
    }
}
