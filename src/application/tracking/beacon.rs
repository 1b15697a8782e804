//! Unload-safe, fire-and-forget event delivery.
//!
//! Used where the caller's execution context may be torn down immediately
//! after the call (page hide/unload); the retry queue cannot be trusted to
//! survive that, so this path bypasses it entirely.

use std::sync::Arc;

use bytes::Bytes;
use tracing::warn;

use crate::application::ports::BeaconTransport;
use crate::application::session::SessionIdentity;
use crate::domain::events::EventDraft;

#[derive(Clone)]
pub struct BeaconSender {
    transport: Option<Arc<dyn BeaconTransport>>,
    session: SessionIdentity,
}

impl BeaconSender {
    pub fn new(transport: Arc<dyn BeaconTransport>, session: SessionIdentity) -> Self {
        Self {
            transport: Some(transport),
            session,
        }
    }

    /// Sender for a context without a beacon transport; `send` is a no-op.
    pub fn detached() -> Self {
        Self {
            transport: None,
            session: SessionIdentity::detached(),
        }
    }

    /// Attach the session id, serialize to a compact JSON payload, and hand
    /// it off. Best-effort: no retry, no acknowledgment, no failure signal.
    pub fn send(&self, draft: EventDraft) {
        let Some(transport) = self.transport.as_ref() else {
            return;
        };
        let event = draft.into_event(self.session.session_id());
        match serde_json::to_vec(&event) {
            Ok(payload) => transport.send(Bytes::from(payload)),
            Err(error) => warn!(error = %error, "Failed to serialize beacon event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::application::ports::KeyValueStore;
    use crate::domain::events::{EventName, SESSION_ID_KEY};
    use crate::infra::store::MemoryKeyValueStore;

    #[derive(Default)]
    struct RecordingBeacon {
        payloads: Mutex<Vec<Bytes>>,
    }

    impl BeaconTransport for RecordingBeacon {
        fn send(&self, payload: Bytes) {
            self.payloads.lock().expect("payloads lock").push(payload);
        }
    }

    #[test]
    fn sends_the_full_event_with_session_id() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.set(SESSION_ID_KEY, "tab-1").expect("seed");
        let beacon = Arc::new(RecordingBeacon::default());
        let sender = BeaconSender::new(beacon.clone(), SessionIdentity::new(store));

        sender.send(EventDraft::new("post", EventName::TimeOnPage).with_data("timeSpent", 12.5));

        let payloads = beacon.payloads.lock().expect("payloads lock");
        let body: serde_json::Value =
            serde_json::from_slice(&payloads[0]).expect("payload is json");
        assert_eq!(body["sessionId"], "tab-1");
        assert_eq!(body["eventName"], "time_on_page");
        assert_eq!(body["data"]["timeSpent"], 12.5);
    }

    #[test]
    fn detached_sender_is_a_no_op() {
        BeaconSender::detached().send(EventDraft::new("post", EventName::TimeOnPage));
    }
}
