use super::{Fragments, GenerateError, GenerateRequest, Provider, ProviderFuture};
use futures_core::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// One step of a scripted response.
#[derive(Debug, Clone)]
pub enum StubStep {
    Chunk(String),
    Delay(Duration),
    Fail(String),
}

/// Offline provider: replays a script, or echoes the prompt when none is set.
#[derive(Debug, Clone)]
pub struct StubProvider {
    models: Vec<String>,
    script: Option<Vec<StubStep>>,
    connect_error: Option<String>,
    releases: Arc<AtomicUsize>,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            models: vec!["stub".to_string()],
            script: None,
            connect_error: None,
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn scripted(steps: Vec<StubStep>) -> Self {
        Self {
            script: Some(steps),
            ..Self::new()
        }
    }

    /// Every `generate` call fails before a stream is opened.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            connect_error: Some(message.into()),
            ..Self::new()
        }
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Number of response streams that have been dropped so far.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    fn echo_script(req: &GenerateRequest) -> Vec<StubStep> {
        let pause = StubStep::Delay(Duration::from_millis(120));
        vec![
            StubStep::Chunk(format!("[stub provider]\nmodel: {}\n\n", req.model)),
            pause.clone(),
            StubStep::Chunk("You said: ".to_string()),
            pause.clone(),
            StubStep::Chunk(req.prompt.clone()),
            pause,
            StubStep::Chunk("\n".to_string()),
        ]
    }
}

impl Provider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn list_models(&self, _base_url: &str) -> ProviderFuture<Vec<String>> {
        let models = self.models.clone();
        Box::pin(async move { Ok(models) })
    }

    fn generate(&self, req: GenerateRequest) -> ProviderFuture<Fragments> {
        let this = self.clone();

        Box::pin(async move {
            req.validate()?;
            if let Some(msg) = this.connect_error {
                return Err(GenerateError::Provider(msg));
            }

            let steps = this.script.unwrap_or_else(|| Self::echo_script(&req));
            let (tx, rx) = mpsc::channel::<Result<String, GenerateError>>(32);

            tokio::spawn(async move {
                for step in steps {
                    let item = match step {
                        StubStep::Delay(d) => {
                            tokio::time::sleep(d).await;
                            continue;
                        }
                        StubStep::Chunk(text) => Ok(text),
                        StubStep::Fail(msg) => Err(GenerateError::Provider(msg)),
                    };
                    let failed = item.is_err();
                    if tx.send(item).await.is_err() || failed {
                        return;
                    }
                }
            });

            let stream = Released {
                inner: ReceiverStream::new(rx),
                releases: this.releases,
            };
            Ok(Box::pin(stream) as Fragments)
        })
    }
}

/// Counts its own drop so tests can check the stream was let go.
struct Released {
    inner: ReceiverStream<Result<String, GenerateError>>,
    releases: Arc<AtomicUsize>,
}

impl Stream for Released {
    type Item = Result<String, GenerateError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for Released {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}
