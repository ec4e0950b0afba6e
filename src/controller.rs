use crate::host::DocumentId;
use crate::provider::{ErrorKind, GenerateError, GenerateRequest, Provider};
use crate::registry::RequestRegistry;
use crate::request::{self, RequestHandle, RequestId, RequestState, StateReporter};
use crate::ui::{Outcome, UiEvent, UiQueue};
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

/// Drives generation requests from submit to a terminal state.
///
/// Each request gets one background task that does the network I/O and
/// decoding; anything visible goes through the [`UiQueue`].
#[derive(Clone)]
pub struct Controller {
    provider: Arc<dyn Provider>,
    registry: Arc<RequestRegistry>,
    ui: UiQueue,
    runtime: tokio::runtime::Handle,
}

impl Controller {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<RequestRegistry>,
        ui: UiQueue,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            provider,
            registry,
            ui,
            runtime,
        }
    }

    pub fn registry(&self) -> &Arc<RequestRegistry> {
        &self.registry
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Register `req` as the current request and start streaming it into
    /// `document`.
    pub fn submit(&self, req: GenerateRequest, document: DocumentId) -> RequestHandle {
        let (handle, reporter) = request::track(&req.model);
        self.registry.register(handle.clone());

        self.ui.post(UiEvent::Started {
            request: handle.id(),
            status: format!(
                "Ollama: Generating response with {}... (Press Ctrl+K to cancel)",
                req.model
            ),
        });

        let finish = Finish {
            id: handle.id(),
            ui: self.ui.clone(),
            registry: self.registry.clone(),
            reporter,
            cancel: handle.token(),
            outcome: None,
        };
        let worker = Worker {
            provider: self.provider.clone(),
            ui: self.ui.clone(),
            id: handle.id(),
            document,
            cancel: handle.token(),
        };

        self.runtime.spawn(worker.run(req, finish));
        handle
    }
}

struct Worker {
    provider: Arc<dyn Provider>,
    ui: UiQueue,
    id: RequestId,
    document: DocumentId,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self, req: GenerateRequest, mut finish: Finish) {
        finish.outcome = Some(self.stream(req, &finish.reporter).await);
    }

    async fn stream(&self, req: GenerateRequest, reporter: &StateReporter) -> Outcome {
        let connect = self.provider.generate(req);
        let mut fragments = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Outcome::Cancelled,
            opened = connect => match opened {
                Ok(stream) => stream,
                Err(e) => return self.failure(e),
            },
        };
        reporter.set(RequestState::Streaming);

        let mut delivered = 0usize;
        loop {
            // Dropping `fragments` on return closes the connection.
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Outcome::Cancelled,
                next = fragments.next() => next,
            };

            match next {
                Some(Ok(text)) => {
                    if self.cancel.is_cancelled() {
                        return Outcome::Cancelled;
                    }
                    self.ui.post(UiEvent::Fragment {
                        request: self.id,
                        document: self.document,
                        text,
                        cancel: self.cancel.clone(),
                    });
                    delivered += 1;
                }
                Some(Err(e)) => return self.failure(e),
                None => {
                    tracing::debug!(request = %self.id, delivered, "generation stream finished");
                    return Outcome::Completed;
                }
            }
        }
    }

    /// Errors that show up after cancellation are the cancellation itself.
    fn failure(&self, err: GenerateError) -> Outcome {
        if self.cancel.is_cancelled() {
            tracing::debug!(request = %self.id, error = %err, "error after cancellation ignored");
            return Outcome::Cancelled;
        }
        tracing::debug!(request = %self.id, error = %err, "generation failed");
        Outcome::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

const WORKER_ABORTED: &str = "worker aborted";

/// Terminal bookkeeping for one request, run exactly once on drop.
///
/// `outcome` is only set when the worker returns normally. A worker that
/// panicked or was torn down without one counts as failed, unless the user
/// had already cancelled it.
struct Finish {
    id: RequestId,
    ui: UiQueue,
    registry: Arc<RequestRegistry>,
    reporter: StateReporter,
    cancel: CancellationToken,
    outcome: Option<Outcome>,
}

impl Finish {
    fn take_outcome(&mut self) -> Outcome {
        match self.outcome.take() {
            Some(outcome) => outcome,
            None if self.cancel.is_cancelled() => Outcome::Cancelled,
            None => {
                tracing::error!(request = %self.id, "generation worker ended without an outcome");
                Outcome::Failed {
                    kind: ErrorKind::Transport,
                    message: WORKER_ABORTED.to_string(),
                }
            }
        }
    }
}

impl Drop for Finish {
    fn drop(&mut self) {
        let outcome = self.take_outcome();
        self.registry.release(self.id);
        self.ui.post(UiEvent::Finished {
            request: self.id,
            outcome: outcome.clone(),
        });
        self.reporter.set(outcome.into());
    }
}
