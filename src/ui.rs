//! Queue between request workers and the host's UI context.
//!
//! Workers only post events. The UI context drains them and is the sole place
//! where documents, the output panel and the status bar are touched.

use crate::host::{DocumentId, UiHost};
use crate::provider::ErrorKind;
use crate::request::{RequestId, RequestState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How a request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
    Failed { kind: ErrorKind, message: String },
}

impl From<Outcome> for RequestState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Completed => RequestState::Completed,
            Outcome::Cancelled => RequestState::Cancelled,
            Outcome::Failed { message, .. } => RequestState::Failed(message),
        }
    }
}

#[derive(Debug)]
pub enum UiEvent {
    Started {
        request: RequestId,
        status: String,
    },
    Fragment {
        request: RequestId,
        document: DocumentId,
        text: String,
        cancel: CancellationToken,
    },
    Finished {
        request: RequestId,
        outcome: Outcome,
    },
}

/// Posting side; cloned into every worker.
#[derive(Debug, Clone)]
pub struct UiQueue {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl UiQueue {
    pub fn channel() -> (UiQueue, UiContext) {
        let (tx, rx) = mpsc::unbounded_channel();
        (UiQueue { tx }, UiContext { rx })
    }

    /// Fire and forget. Events posted after the host went away are dropped.
    pub fn post(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("ui context closed; event dropped");
        }
    }
}

/// Receiving side, owned by the UI loop.
#[derive(Debug)]
pub struct UiContext {
    rx: mpsc::UnboundedReceiver<UiEvent>,
}

impl UiContext {
    pub async fn next(&mut self) -> Option<UiEvent> {
        self.rx.recv().await
    }

    /// Apply every event already queued. Returns how many were applied.
    pub fn drain<H: UiHost + ?Sized>(&mut self, host: &mut H) -> usize {
        let mut n = 0;
        while let Ok(event) = self.rx.try_recv() {
            dispatch(host, event);
            n += 1;
        }
        n
    }

    /// Apply events until `request` finishes.
    ///
    /// Returns `None` if the queue closed first.
    pub async fn run_until_finished<H: UiHost + ?Sized>(
        &mut self,
        host: &mut H,
        request: RequestId,
    ) -> Option<Outcome> {
        while let Some(event) = self.rx.recv().await {
            let finished = match &event {
                UiEvent::Finished { request: id, outcome } if *id == request => {
                    Some(outcome.clone())
                }
                _ => None,
            };
            dispatch(host, event);
            if finished.is_some() {
                return finished;
            }
        }
        None
    }
}

pub fn dispatch<H: UiHost + ?Sized>(host: &mut H, event: UiEvent) {
    match event {
        UiEvent::Started { request, status } => {
            tracing::debug!(%request, "request started");
            host.set_status(&status);
        }
        UiEvent::Fragment {
            request,
            document,
            text,
            cancel,
        } => {
            if cancel.is_cancelled() {
                tracing::trace!(%request, "fragment dropped after cancellation");
                return;
            }
            if host.is_panel_visible() {
                host.write_to_panel(&text);
            } else {
                host.insert_at_cursor(document, &text);
            }
        }
        UiEvent::Finished { request, outcome } => {
            host.erase_status();
            match outcome {
                Outcome::Failed { kind, message } => {
                    tracing::warn!(%request, ?kind, %message, "request failed");
                    host.error(&format!("Error making request: {message}"));
                }
                Outcome::Cancelled => tracing::info!(%request, "request cancelled"),
                Outcome::Completed => tracing::debug!(%request, "request completed"),
            }
        }
    }
}
