use futures_core::stream::BoxStream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// One call to the model server's generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Server base URL, e.g. `http://localhost:11434`.
    pub base_url: String,
    pub model: String,
    pub system: String,
    pub prompt: String,

    /// Editor text sent ahead of the prompt. May be empty.
    pub context: String,
}

impl GenerateRequest {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        system: impl Into<String>,
        prompt: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        let system = system.into();
        Self {
            base_url: base_url.into(),
            model: model.into(),
            system: if system.is_empty() {
                DEFAULT_SYSTEM_PROMPT.to_string()
            } else {
                system
            },
            prompt: prompt.into(),
            context: context.into(),
        }
    }

    /// Text sent as the `prompt` field: context, a blank line, then the prompt.
    pub fn prompt_body(&self) -> String {
        format!("{}\n\n{}", self.context, self.prompt)
    }

    /// Checked before any network traffic.
    pub fn validate(&self) -> Result<(), GenerateError> {
        if self.model.trim().is_empty() {
            return Err(GenerateError::MissingModel);
        }
        Ok(())
    }
}

/// Coarse classification used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Precondition,
    Transport,
    Protocol,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("no model selected")]
    MissingModel,

    #[error("failed to reach model server: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("model server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response line ({reason}): {line}")]
    Protocol { line: String, reason: String },

    #[error("model server error: {0}")]
    Server(String),

    #[error("{0}")]
    Provider(String),
}

impl GenerateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerateError::MissingModel => ErrorKind::Precondition,
            GenerateError::Transport(_)
            | GenerateError::Status { .. }
            | GenerateError::Server(_)
            | GenerateError::Provider(_) => ErrorKind::Transport,
            GenerateError::Protocol { .. } => ErrorKind::Protocol,
        }
    }
}

/// Decoded text fragments, in server order.
pub type Fragments = BoxStream<'static, Result<String, GenerateError>>;

pub type ProviderFuture<T> = Pin<Box<dyn Future<Output = Result<T, GenerateError>> + Send>>;

/// Model server interface.
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Names of the models the server can run.
    fn list_models(&self, base_url: &str) -> ProviderFuture<Vec<String>>;

    /// Open a generation stream. Every call opens a new stream; dropping the
    /// returned stream closes the underlying connection.
    fn generate(&self, req: GenerateRequest) -> ProviderFuture<Fragments>;
}
