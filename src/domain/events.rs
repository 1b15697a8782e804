//! Tracking event model.
//!
//! Events are immutable once constructed; ownership transfers to the
//! dispatcher (or beacon sender) on submission. Wire names are camelCase to
//! match the tracking endpoint contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Storage key holding the per-tab session identifier.
pub const SESSION_ID_KEY: &str = "sessionId";
/// Storage key holding the bounded failed-event array.
pub const FAILED_EVENTS_KEY: &str = "failedTrackingEvents";
/// Storage key for the user-level tracking kill switch.
pub const TRACKING_DISABLED_KEY: &str = "trackingDisabled";
/// Maximum number of records retained in the fallback store; insertion past
/// the cap evicts the oldest record.
pub const FAILED_EVENT_CAP: usize = 50;

/// Engagement event kinds emitted by page instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    PageView,
    TimeOnPage,
    ScrollDepth,
    BlogCompleted,
    DropPosition,
    SessionEnd,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::PageView => "page_view",
            EventName::TimeOnPage => "time_on_page",
            EventName::ScrollDepth => "scroll_depth",
            EventName::BlogCompleted => "blog_completed",
            EventName::DropPosition => "drop_position",
            EventName::SessionEnd => "session_end",
        }
    }
}

/// A tracking event as produced by instrumentation, before the session id is
/// attached.
///
/// `event_name` stays optional: a draft without a name is logged as invalid
/// at submission but still delivered best-effort. `slug` is absent for
/// site-level events that belong to no particular page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<EventName>,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl EventDraft {
    pub fn new(slug: impl Into<String>, event_name: EventName) -> Self {
        Self {
            slug: Some(slug.into()),
            event_name: Some(event_name),
            data: BTreeMap::new(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Draft for a site-level event with no page slug.
    pub fn site(event_name: EventName) -> Self {
        Self {
            slug: None,
            event_name: Some(event_name),
            data: BTreeMap::new(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Attach one payload entry; chainable.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Finalize the draft into a wire-ready event.
    pub fn into_event(self, session_id: Option<String>) -> TrackingEvent {
        TrackingEvent {
            session_id,
            slug: self.slug,
            event_name: self.event_name,
            data: self.data,
            timestamp: self.timestamp,
        }
    }
}

/// Wire-ready tracking event: `{sessionId, slug, eventName, data, timestamp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<EventName>,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl TrackingEvent {
    /// Event name for log lines; drafts without a name show as `unknown`.
    pub fn label(&self) -> &'static str {
        self.event_name.map(|name| name.as_str()).unwrap_or("unknown")
    }
}

/// A tracking event that exhausted its live retry budget, plus the moment it
/// was parked in the fallback store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedEventRecord {
    #[serde(flatten)]
    pub event: TrackingEvent,
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
}

/// A scroll position sample, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub document_height: f64,
}

impl ScrollMetrics {
    /// Percentage of the scrollable distance covered; 0 when the document
    /// fits inside the viewport.
    pub fn percentage(&self) -> f64 {
        if self.document_height > self.viewport_height {
            self.scroll_top / (self.document_height - self.viewport_height) * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn event_serializes_with_camel_case_wire_names() {
        let draft = EventDraft {
            slug: Some("rust-basics".to_string()),
            event_name: Some(EventName::ScrollDepth),
            data: BTreeMap::from([("milestone".to_string(), Value::from(25))]),
            timestamp: datetime!(2026-01-02 03:04:05 UTC),
        };
        let event = draft.into_event(Some("abc".to_string()));
        let json = serde_json::to_value(&event).expect("serialize event");

        assert_eq!(json["sessionId"], "abc");
        assert_eq!(json["slug"], "rust-basics");
        assert_eq!(json["eventName"], "scroll_depth");
        assert_eq!(json["data"]["milestone"], 25);
        assert_eq!(json["timestamp"], "2026-01-02T03:04:05Z");
    }

    #[test]
    fn absent_session_and_name_are_omitted_from_the_wire() {
        let draft = EventDraft {
            slug: Some("x".to_string()),
            event_name: None,
            data: BTreeMap::new(),
            timestamp: datetime!(2026-01-02 03:04:05 UTC),
        };
        let json = serde_json::to_value(draft.into_event(None)).expect("serialize event");

        assert!(json.get("sessionId").is_none());
        assert!(json.get("eventName").is_none());
    }

    #[test]
    fn site_level_events_carry_no_slug() {
        let json = serde_json::to_value(EventDraft::site(EventName::SessionEnd).into_event(None))
            .expect("serialize event");

        assert!(json.get("slug").is_none());
        assert_eq!(json["eventName"], "session_end");
    }

    #[test]
    fn failed_record_flattens_the_event() {
        let record = FailedEventRecord {
            event: EventDraft::new("x", EventName::PageView).into_event(Some("s".to_string())),
            captured_at: datetime!(2026-01-02 03:04:05 UTC),
        };
        let json = serde_json::to_value(&record).expect("serialize record");

        assert_eq!(json["slug"], "x");
        assert_eq!(json["capturedAt"], "2026-01-02T03:04:05Z");

        let back: FailedEventRecord = serde_json::from_value(json).expect("deserialize record");
        assert_eq!(back.event.slug.as_deref(), Some("x"));
    }

    #[test]
    fn scroll_percentage_clamps_short_documents_to_zero() {
        let fits = ScrollMetrics {
            scroll_top: 10.0,
            viewport_height: 800.0,
            document_height: 600.0,
        };
        assert_eq!(fits.percentage(), 0.0);

        let halfway = ScrollMetrics {
            scroll_top: 600.0,
            viewport_height: 800.0,
            document_height: 2000.0,
        };
        assert!((halfway.percentage() - 50.0).abs() < f64::EPSILON);
    }
}
