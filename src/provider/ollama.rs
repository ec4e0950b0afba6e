use super::ndjson::FragmentStream;
use super::{Fragments, GenerateError, GenerateRequest, Provider, ProviderFuture};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;

/// Ollama-compatible model server over HTTP.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    http: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// Prefer the server's `{"error": ...}` message over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, GenerateError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    Err(GenerateError::Status {
        status: status.as_u16(),
        message: error_message(&text),
    })
}

impl Provider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn list_models(&self, base_url: &str) -> ProviderFuture<Vec<String>> {
        let http = self.http.clone();
        let url = endpoint(base_url, "api/tags");

        Box::pin(async move {
            tracing::debug!(%url, "listing models");
            let resp = http.get(&url).send().await.map_err(GenerateError::Transport)?;
            let resp = check_status(resp).await?;
            let body = resp.bytes().await.map_err(GenerateError::Transport)?;

            let tags: TagsResponse =
                serde_json::from_slice(&body).map_err(|e| GenerateError::Protocol {
                    line: String::from_utf8_lossy(&body).into_owned(),
                    reason: e.to_string(),
                })?;
            Ok(tags.models.into_iter().map(|m| m.name).collect())
        })
    }

    fn generate(&self, req: GenerateRequest) -> ProviderFuture<Fragments> {
        let http = self.http.clone();

        Box::pin(async move {
            req.validate()?;

            let url = endpoint(&req.base_url, "api/generate");
            tracing::info!(%url, model = %req.model, "starting generation");

            let body = GenerateBody {
                model: &req.model,
                system: &req.system,
                prompt: req.prompt_body(),
                stream: true,
            };

            let resp = http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(GenerateError::Transport)?;
            let resp = check_status(resp).await?;

            let bytes = resp
                .bytes_stream()
                .map(|item| item.map(|b| b.to_vec()).map_err(GenerateError::Transport));

            Ok(Box::pin(FragmentStream::new(Box::pin(bytes))) as Fragments)
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    system: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}
