//! Per-tab session identity.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::application::ports::KeyValueStore;
use crate::domain::events::SESSION_ID_KEY;

/// Issues and persists the session identifier for the lifetime of the
/// session store (a browser tab's session storage, or an in-memory analog).
///
/// The id is created lazily on first access and reused for every event until
/// the store is cleared. Construction without a store models a non-browser
/// context: every lookup yields `None`.
#[derive(Clone)]
pub struct SessionIdentity {
    store: Option<Arc<dyn KeyValueStore>>,
}

impl SessionIdentity {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn detached() -> Self {
        Self { store: None }
    }

    /// The current session id, creating and persisting one if absent.
    /// At most one write happens per store lifetime; storage errors degrade
    /// to `None` and never propagate.
    pub fn session_id(&self) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.get(SESSION_ID_KEY) {
            Ok(Some(id)) => Some(id),
            Ok(None) => {
                let id = Uuid::new_v4().to_string();
                if let Err(error) = store.set(SESSION_ID_KEY, &id) {
                    warn!(error = %error, "Failed to persist new session id");
                    return None;
                }
                Some(id)
            }
            Err(error) => {
                warn!(error = %error, "Failed to read session id");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::store::MemoryKeyValueStore;

    #[test]
    fn creates_lazily_and_stays_stable() {
        let store = Arc::new(MemoryKeyValueStore::new());
        assert_eq!(store.get(SESSION_ID_KEY).expect("read"), None);

        let session = SessionIdentity::new(store.clone());
        let first = session.session_id().expect("session id");
        let second = session.session_id().expect("session id");

        assert_eq!(first, second);
        assert_eq!(store.get(SESSION_ID_KEY).expect("read"), Some(first));
    }

    #[test]
    fn reuses_an_existing_stored_id() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.set(SESSION_ID_KEY, "existing").expect("seed");

        let session = SessionIdentity::new(store);
        assert_eq!(session.session_id().as_deref(), Some("existing"));
    }

    #[test]
    fn detached_context_yields_none() {
        assert_eq!(SessionIdentity::detached().session_id(), None);
    }
}
