//! Per-session write locks.

use folio_core::SessionId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Hands out one async mutex per session.
///
/// The outer map is only held long enough to clone an `Arc`, so sessions
/// never wait on each other; writers of the same session queue on the
/// inner lock. `T` is whatever per-session state the backend caches.
pub(crate) struct SessionLocks<T> {
    inner: Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<T>>>>,
}

impl<T: Default> SessionLocks<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn for_session(&self, session_id: &SessionId) -> Arc<tokio::sync::Mutex<T>> {
        let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(session_id.clone()).or_default().clone()
    }
}
