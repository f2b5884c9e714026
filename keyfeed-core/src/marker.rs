//! Resume marker for the live notification stream.
//!
//! The marker is the id of the newest notification the client has observed.
//! It is sent as `Last-Event-ID` so the server can replay what was missed.
//! Live events always move it; the first history page may seed it, but only
//! until a live event has been seen, so history can never rewind it.

use keyfeed_types::EventId;

/// Tracks the resume marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeMarker {
    current: Option<EventId>,
    live_seen: bool,
}

impl ResumeMarker {
    /// A tracker with no marker.
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker resuming from a persisted marker.
    pub fn with_stored(stored: Option<EventId>) -> Self {
        Self {
            current: stored,
            live_seen: false,
        }
    }

    /// Seed from the newest history item.
    ///
    /// Returns the marker to persist, or `None` when a live event already
    /// set it.
    pub fn seed_from_history(&mut self, newest: EventId) -> Option<EventId> {
        if self.live_seen {
            return None;
        }
        self.current = Some(newest.clone());
        Some(newest)
    }

    /// Record a live event. The returned marker should be persisted.
    pub fn record_live(&mut self, id: EventId) -> EventId {
        self.live_seen = true;
        self.current = Some(id.clone());
        id
    }

    /// The marker to resume from.
    pub fn current(&self) -> Option<&EventId> {
        self.current.as_ref()
    }

    /// Whether any live event has been recorded.
    pub fn live_seen(&self) -> bool {
        self.live_seen
    }
}
