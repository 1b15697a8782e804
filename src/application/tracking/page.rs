//! Page-lifecycle instrumentation.
//!
//! Translates mount, scroll, teardown, and end-of-content visibility into
//! tracking events, with one-shot guards so no signal is emitted twice for
//! the same page lifetime.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::time::Instant;
use tracing::warn;

use crate::application::ports::KeyValueStore;
use crate::application::tracking::beacon::BeaconSender;
use crate::application::tracking::dispatcher::EventDispatcher;
use crate::domain::events::{EventDraft, EventName, ScrollMetrics, TRACKING_DISABLED_KEY};
use crate::util::lock::mutex_lock;

const SOURCE: &str = "tracking::page";

/// Scroll-depth thresholds that each fire one engagement event per page
/// lifetime.
pub const SCROLL_MILESTONES: [u32; 4] = [25, 50, 75, 100];
/// Fraction of the end-of-content marker that must be visible to count as
/// completion.
pub const COMPLETION_VISIBILITY: f64 = 0.1;

/// Viewport dimensions captured at mount time.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Instrumentation for a single page view.
///
/// Scroll-depth and teardown events go through the batched dispatcher;
/// session-end events go through the beacon path because the page context
/// may vanish immediately afterward.
pub struct PageTracker {
    slug: String,
    dispatcher: EventDispatcher,
    beacon: BeaconSender,
    viewport: Viewport,
    enabled: bool,
    mounted_at: Instant,
    fired_milestones: Mutex<BTreeSet<u32>>,
    session_ended: AtomicBool,
    completed: AtomicBool,
}

impl PageTracker {
    /// Create a tracker for one page view. The kill switch is read from the
    /// preference store exactly once, here; when set, every emission for
    /// this page lifetime is a no-op.
    pub fn new(
        slug: impl Into<String>,
        dispatcher: EventDispatcher,
        beacon: BeaconSender,
        preferences: Option<Arc<dyn KeyValueStore>>,
        viewport: Viewport,
    ) -> Self {
        Self {
            slug: slug.into(),
            dispatcher,
            beacon,
            viewport,
            enabled: !tracking_disabled(preferences.as_deref()),
            mounted_at: Instant::now(),
            fired_milestones: Mutex::new(BTreeSet::new()),
            session_ended: AtomicBool::new(false),
            completed: AtomicBool::new(false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Emit the page-view event, carrying the URL, referrer, and the
    /// viewport dimensions captured at mount.
    pub fn track_page_view(&self, url: &str, referrer: &str) {
        if !self.enabled {
            return;
        }
        self.dispatcher.enqueue(
            EventDraft::new(&self.slug, EventName::PageView)
                .with_data("url", url)
                .with_data("referrer", referrer)
                .with_data("width", self.viewport.width)
                .with_data("height", self.viewport.height),
        );
    }

    /// Record a scroll sample. Each milestone in [`SCROLL_MILESTONES`] fires
    /// at most once per page lifetime and never re-arms, regardless of later
    /// scrolling.
    pub fn record_scroll(&self, metrics: ScrollMetrics) {
        if !self.enabled {
            return;
        }
        let percentage = metrics.percentage();
        for milestone in SCROLL_MILESTONES {
            if percentage < f64::from(milestone) {
                continue;
            }
            let newly_fired =
                mutex_lock(&self.fired_milestones, SOURCE, "record_scroll").insert(milestone);
            if newly_fired {
                self.dispatcher.enqueue(
                    EventDraft::new(&self.slug, EventName::ScrollDepth)
                        .with_data("milestone", milestone)
                        .with_data("scrollPercentage", percentage),
                );
            }
        }
    }

    /// Called on page hide or unload, whichever fires first; browsers may
    /// fire both in one teardown and only the first call counts. Emits
    /// time-on-page and drop-position via the beacon path.
    pub fn session_end(&self, metrics: ScrollMetrics) {
        if !self.enabled {
            return;
        }
        if self.session_ended.swap(true, Ordering::SeqCst) {
            return;
        }
        let time_spent = self.mounted_at.elapsed().as_secs_f64();
        self.beacon.send(
            EventDraft::new(&self.slug, EventName::TimeOnPage).with_data("timeSpent", time_spent),
        );
        self.beacon.send(
            EventDraft::new(&self.slug, EventName::DropPosition)
                .with_data("scrollPercentage", metrics.percentage()),
        );
    }

    /// Report visibility of the end-of-content marker. The first sighting at
    /// or above [`COMPLETION_VISIBILITY`] emits one completion event; the
    /// tracker then stops observing for good.
    pub fn marker_visible(&self, visible_ratio: f64) {
        if !self.enabled {
            return;
        }
        if visible_ratio < COMPLETION_VISIBILITY {
            return;
        }
        if self.completed.swap(true, Ordering::SeqCst) {
            return;
        }
        let now = OffsetDateTime::now_utc();
        let completed_at = now.format(&Rfc3339).unwrap_or_else(|_| now.to_string());
        self.dispatcher.enqueue(
            EventDraft::new(&self.slug, EventName::BlogCompleted)
                .with_data("completedAt", completed_at),
        );
    }
}

fn tracking_disabled(store: Option<&dyn KeyValueStore>) -> bool {
    let Some(store) = store else {
        return false;
    };
    match store.get(TRACKING_DISABLED_KEY) {
        Ok(value) => value.as_deref() == Some("true"),
        Err(error) => {
            warn!(error = %error, "Failed to read tracking preference; tracking stays on");
            false
        }
    }
}
