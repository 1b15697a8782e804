//! Site-level session lifecycle.
//!
//! One instance per site visit, mounted alongside the per-page trackers. It
//! establishes the session id eagerly so the first page event already
//! carries it, and marks the end of the visit with a site-level
//! `SessionEnd` beacon when the page is hidden.

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::application::session::SessionIdentity;
use crate::application::tracking::beacon::BeaconSender;
use crate::domain::events::{EventDraft, EventName};

pub struct SessionManager {
    session: SessionIdentity,
    beacon: BeaconSender,
}

impl SessionManager {
    pub fn new(session: SessionIdentity, beacon: BeaconSender) -> Self {
        Self { session, beacon }
    }

    /// Establish the session id up front instead of on the first event.
    pub fn start(&self) {
        let _ = self.session.session_id();
    }

    /// Called on page hide. Emits a site-level `SessionEnd` carrying the
    /// wall-clock timestamp via the beacon path; a visit that bounces
    /// between pages emits one per hide, matching the per-hide semantics of
    /// the underlying signal.
    pub fn page_hide(&self) {
        let now = OffsetDateTime::now_utc();
        let timestamp = now.format(&Rfc3339).unwrap_or_else(|_| now.to_string());
        self.beacon
            .send(EventDraft::site(EventName::SessionEnd).with_data("timestamp", timestamp));
    }
}
