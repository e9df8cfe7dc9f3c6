use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Coarse guard shared by sibling sessions on one adapter.
///
/// Held from Initializing until a session is Connected, so at most one
/// session at a time registers services and waits for a console.
#[derive(Debug, Clone, Default)]
pub struct AdapterLock {
    inner: Arc<Mutex<()>>,
}

impl AdapterLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> MutexGuard<'_, ()> {
        debug!("Waiting for adapter lock");
        // A sibling that panicked while connecting leaves nothing to repair.
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        debug!("Adapter lock acquired");
        guard
    }
}
