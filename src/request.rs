use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    Registered,
    Streaming,
    Completed,
    Cancelled,
    Failed(String),
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Completed | RequestState::Cancelled | RequestState::Failed(_)
        )
    }
}

/// Shared view of an in-flight request: identity, cancellation, state.
///
/// Cloning is cheap. The network stream itself is never reachable from here;
/// it stays owned by the worker driving the request.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    id: RequestId,
    model: String,
    cancel: CancellationToken,
    state: watch::Receiver<RequestState>,
}

/// Worker half: the only writer of a request's state.
#[derive(Debug)]
pub(crate) struct StateReporter {
    state: watch::Sender<RequestState>,
}

impl StateReporter {
    pub(crate) fn set(&self, state: RequestState) {
        self.state.send_replace(state);
    }
}

pub(crate) fn track(model: &str) -> (RequestHandle, StateReporter) {
    let (tx, rx) = watch::channel(RequestState::Registered);
    let handle = RequestHandle {
        id: RequestId::next(),
        model: model.to_string(),
        cancel: CancellationToken::new(),
        state: rx,
    };
    (handle, StateReporter { state: tx })
}

impl RequestHandle {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Signal cancellation. Idempotent; the flag never resets.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> RequestState {
        self.state.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        !self.state.borrow().is_terminal()
    }

    /// Resolve once the request reaches a terminal state.
    pub async fn wait(&self) -> RequestState {
        let mut rx = self.state.clone();
        let result = rx.wait_for(RequestState::is_terminal).await.map(|s| s.clone());
        match result {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }
}
