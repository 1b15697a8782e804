//! Event queue and dispatcher.
//!
//! Events are buffered in memory, flushed in coalesced batches, retried with
//! exponential backoff, and parked in a durable fallback store once the
//! retry budget is exhausted. The dispatcher is an explicit context object
//! (constructed once per page session, cheap to clone) rather than ambient
//! global state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use metrics::{counter, gauge};
use time::OffsetDateTime;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::application::ports::{EventTransport, KeyValueStore};
use crate::application::session::SessionIdentity;
use crate::config::TrackingSettings;
use crate::domain::events::{
    EventDraft, FAILED_EVENTS_KEY, FAILED_EVENT_CAP, FailedEventRecord, TrackingEvent,
};
use crate::util::lock::mutex_lock;

const SOURCE: &str = "tracking::dispatcher";

const METRIC_EVENTS_DELIVERED: &str = "brezza_events_delivered_total";
const METRIC_EVENTS_RETRIED: &str = "brezza_events_retried_total";
const METRIC_EVENTS_DROPPED: &str = "brezza_events_dropped_total";
const METRIC_EVENTS_REPLAYED: &str = "brezza_events_replayed_total";
const METRIC_QUEUE_LEN: &str = "brezza_event_queue_len";

/// Timing and retry policy for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Delay before a scheduled flush runs; enqueues inside the window
    /// coalesce into one flush.
    pub flush_delay: Duration,
    /// Total delivery attempts per event, including the first.
    pub max_retries: u32,
    /// Wait before the second attempt; doubles for each further attempt.
    pub backoff_base: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            flush_delay: Duration::from_millis(100),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl From<&TrackingSettings> for DispatcherConfig {
    fn from(settings: &TrackingSettings) -> Self {
        Self {
            flush_delay: settings.flush_delay,
            max_retries: settings.max_retries,
            backoff_base: settings.backoff_base,
        }
    }
}

/// Bounded durable store for events that exhausted their retry budget.
///
/// Records are kept oldest-first under a single storage key, capped at
/// [`FAILED_EVENT_CAP`]; appending past the cap evicts from the front.
#[derive(Clone)]
pub struct FallbackStore {
    store: Option<Arc<dyn KeyValueStore>>,
}

impl FallbackStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn detached() -> Self {
        Self { store: None }
    }

    /// All parked records, oldest first. Unreadable stored JSON is treated
    /// as an empty store.
    pub fn records(&self) -> Vec<FailedEventRecord> {
        let Some(store) = self.store.as_ref() else {
            return Vec::new();
        };
        match store.get(FAILED_EVENTS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(error = %err, "Discarding unreadable fallback store contents");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(error) => {
                warn!(error = %error, "Failed to read fallback store");
                Vec::new()
            }
        }
    }

    /// Park one event, stamping the capture time and enforcing the cap.
    pub fn append(&self, event: TrackingEvent) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let mut records = self.records();
        records.push(FailedEventRecord {
            event,
            captured_at: OffsetDateTime::now_utc(),
        });
        if records.len() > FAILED_EVENT_CAP {
            let excess = records.len() - FAILED_EVENT_CAP;
            records.drain(..excess);
        }
        match serde_json::to_string(&records) {
            Ok(raw) => {
                if let Err(error) = store.set(FAILED_EVENTS_KEY, &raw) {
                    warn!(error = %error, "Failed to persist fallback store");
                }
            }
            Err(error) => warn!(error = %error, "Failed to serialize fallback store"),
        }
    }

    pub fn clear(&self) {
        if let Some(store) = self.store.as_ref() {
            if let Err(error) = store.remove(FAILED_EVENTS_KEY) {
                warn!(error = %error, "Failed to clear fallback store");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

struct DispatcherInner {
    transport: Option<Arc<dyn EventTransport>>,
    session: SessionIdentity,
    fallback: FallbackStore,
    config: DispatcherConfig,
    queue: Mutex<Vec<TrackingEvent>>,
    flush_scheduled: AtomicBool,
    flushing: AtomicBool,
}

/// Handle to the tracking pipeline. Clones share one queue and one fallback
/// store.
///
/// Per-event lifecycle: `Queued -> Sending -> {Delivered | Retrying ->
/// Sending ... | Dropped (persisted)}`. Must be used inside a tokio runtime;
/// scheduled flushes run as spawned tasks.
#[derive(Clone)]
pub struct EventDispatcher {
    inner: Arc<DispatcherInner>,
}

impl EventDispatcher {
    pub fn new(
        transport: Arc<dyn EventTransport>,
        session: SessionIdentity,
        fallback: FallbackStore,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                transport: Some(transport),
                session,
                fallback,
                config,
                queue: Mutex::new(Vec::new()),
                flush_scheduled: AtomicBool::new(false),
                flushing: AtomicBool::new(false),
            }),
        }
    }

    /// Dispatcher for a context with no delivery transport; every operation
    /// is a no-op.
    pub fn detached() -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                transport: None,
                session: SessionIdentity::detached(),
                fallback: FallbackStore::detached(),
                config: DispatcherConfig::default(),
                queue: Mutex::new(Vec::new()),
                flush_scheduled: AtomicBool::new(false),
                flushing: AtomicBool::new(false),
            }),
        }
    }

    /// Queue an event for delivery, attaching the current session id, and
    /// schedule a coalesced flush. Bursts of enqueues within one flush
    /// window share a single scheduled flush.
    pub fn enqueue(&self, draft: EventDraft) {
        if self.inner.transport.is_none() {
            return;
        }
        if draft.event_name.is_none() {
            warn!(
                slug = draft.slug.as_deref().unwrap_or(""),
                "Tracking event submitted without an event name"
            );
        }
        let event = draft.into_event(self.inner.session.session_id());
        let queue_len = {
            let mut queue = mutex_lock(&self.inner.queue, SOURCE, "enqueue");
            queue.push(event);
            queue.len()
        };
        gauge!(METRIC_QUEUE_LEN).set(queue_len as f64);
        self.schedule_flush();
    }

    fn schedule_flush(&self) {
        if self.inner.flush_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        let dispatcher = self.clone();
        tokio::spawn(async move {
            sleep(dispatcher.inner.config.flush_delay).await;
            dispatcher.inner.flush_scheduled.store(false, Ordering::SeqCst);
            dispatcher.flush().await;
        });
    }

    /// Deliver everything queued so far. Exactly one flush runs at a time; a
    /// call while one is in progress is a no-op, and events enqueued during
    /// a flush are picked up by the next one.
    pub async fn flush(&self) {
        if self.inner.flushing.swap(true, Ordering::SeqCst) {
            return;
        }
        let batch: Vec<TrackingEvent> = {
            let mut queue = mutex_lock(&self.inner.queue, SOURCE, "flush");
            std::mem::take(&mut *queue)
        };
        gauge!(METRIC_QUEUE_LEN).set(0.0);
        if !batch.is_empty() {
            debug!(batch_len = batch.len(), "Flushing tracking events");
            join_all(batch.into_iter().map(|event| self.deliver_with_retry(event))).await;
        }
        self.inner.flushing.store(false, Ordering::SeqCst);

        let pending = !mutex_lock(&self.inner.queue, SOURCE, "flush_recheck").is_empty();
        if pending {
            self.schedule_flush();
        }
    }

    async fn deliver_with_retry(&self, event: TrackingEvent) {
        let Some(transport) = self.inner.transport.as_ref() else {
            return;
        };
        let attempts = self.inner.config.max_retries.max(1);
        for attempt in 1..=attempts {
            match transport.deliver(&event).await {
                Ok(()) => {
                    counter!(METRIC_EVENTS_DELIVERED).increment(1);
                    debug!(event = event.label(), attempt, "Tracking event delivered");
                    return;
                }
                Err(error) if attempt < attempts => {
                    counter!(METRIC_EVENTS_RETRIED).increment(1);
                    warn!(
                        event = event.label(),
                        attempt,
                        error = %error,
                        "Tracking event delivery failed; backing off"
                    );
                    sleep(self.inner.config.backoff_base * 2u32.pow(attempt - 1)).await;
                }
                Err(error) => {
                    counter!(METRIC_EVENTS_DROPPED).increment(1);
                    error!(
                        event = event.label(),
                        attempts,
                        error = %error,
                        "Tracking event dropped after exhausting retries"
                    );
                    self.inner.fallback.append(event);
                    return;
                }
            }
        }
    }

    /// Replay the fallback store: one single-shot delivery attempt per
    /// record, then the store is cleared regardless of outcome. Records that
    /// fail the replay are discarded, not re-persisted.
    pub async fn retry_failed_events(&self) {
        let Some(transport) = self.inner.transport.as_ref() else {
            return;
        };
        let records = self.inner.fallback.records();
        if records.is_empty() {
            return;
        }
        info!(count = records.len(), "Replaying failed tracking events");
        for record in &records {
            match transport.deliver(&record.event).await {
                Ok(()) => {
                    counter!(METRIC_EVENTS_REPLAYED).increment(1);
                }
                Err(error) => warn!(
                    event = record.event.label(),
                    error = %error,
                    "Replay attempt failed; record will be discarded"
                ),
            }
        }
        self.inner.fallback.clear();
    }

    pub fn queue_len(&self) -> usize {
        mutex_lock(&self.inner.queue, SOURCE, "queue_len").len()
    }

    pub fn fallback(&self) -> &FallbackStore {
        &self.inner.fallback
    }
}
