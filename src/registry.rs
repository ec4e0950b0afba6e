use crate::request::{RequestHandle, RequestId};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled(RequestId),
    NothingToCancel,
}

/// Single slot holding the request the user can currently cancel.
///
/// One instance per running plugin, shared by the submit path, the cancel
/// command and the workers.
#[derive(Debug, Default)]
pub struct RequestRegistry {
    current: Mutex<Option<RequestHandle>>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<RequestHandle>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track `handle` as current. Returns the request it replaced.
    ///
    /// The replaced request keeps running; it just can no longer be reached
    /// through `cancel_current`.
    pub fn register(&self, handle: RequestHandle) -> Option<RequestHandle> {
        let previous = self.slot().replace(handle);
        if let Some(prev) = previous.as_ref().filter(|p| p.is_active()) {
            tracing::warn!(request = %prev.id(), "request superseded while still running");
        }
        previous
    }

    pub fn current(&self) -> Option<RequestHandle> {
        self.slot().clone()
    }

    pub fn cancel_current(&self) -> CancelOutcome {
        let slot = self.slot();
        match slot.as_ref() {
            Some(handle) if handle.is_active() => {
                handle.cancel();
                tracing::info!(request = %handle.id(), "cancellation requested");
                CancelOutcome::Cancelled(handle.id())
            }
            _ => CancelOutcome::NothingToCancel,
        }
    }

    /// Clear the slot if it still tracks `id`.
    pub fn release(&self, id: RequestId) -> bool {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|h| h.id() == id) {
            *slot = None;
            true
        } else {
            false
        }
    }
}
