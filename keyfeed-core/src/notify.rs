//! Notification feed: history pages plus live events.
//!
//! The feed enforces the ordering the client relies on. History loads first,
//! and the live subscription may only open after that settles (success or
//! failure). Only one subscription is open at a time. Live items go to the
//! front. The resume marker follows the newest observed event.

use chrono::{DateTime, Utc};
use keyfeed_types::dto::{CursorPage, NotificationDto};
use keyfeed_types::{json, EventId};

use crate::display::{parse_timestamp, relative_time};
use crate::loader::Keyed;
use crate::marker::ResumeMarker;
use crate::sse::{SseEvent, DEFAULT_EVENT_TYPE};

/// Error shown when the live stream degrades.
pub const LIVE_DEGRADED_MESSAGE: &str = "Live notifications connection is unstable.";

/// Error shown when history fails without a message of its own.
pub const HISTORY_FAILED_MESSAGE: &str = "Could not load notifications.";

/// Title used when a notification has neither title nor type.
pub const DEFAULT_TITLE: &str = "New notification";

/// Description used when a notification has no text at all.
pub const DEFAULT_DESCRIPTION: &str = "A new notification has arrived.";

/// Live event type carrying notifications.
pub const NOTIFICATION_EVENT_TYPE: &str = "notification";

/// Category of a notification, derived from its `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Service announcements.
    System,
    /// A keyword matched new content.
    Keyword,
    /// Anything else.
    Article,
}

impl NotificationKind {
    /// Classify a payload `type` (case-insensitive substring match).
    pub fn from_type(kind: Option<&str>) -> Self {
        let Some(kind) = kind else {
            return Self::Article;
        };
        let normalized = kind.to_lowercase();
        if normalized.contains("system") {
            Self::System
        } else if normalized.contains("keyword") || normalized.contains("match") {
            Self::Keyword
        } else {
            Self::Article
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Keyword => "keyword",
            Self::Article => "article",
        }
    }
}

/// A notification ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationItem {
    /// Stable id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Body text.
    pub description: String,
    /// Relative time.
    pub time: String,
    /// `#keyword`, when a keyword matched.
    pub tag: Option<String>,
    /// Category.
    pub kind: NotificationKind,
    /// Link to the matched content.
    pub link: Option<String>,
    /// Arrived over the live stream.
    pub is_live: bool,
}

impl NotificationItem {
    /// Map a payload, filling gaps with fallbacks.
    ///
    /// The id falls back to `contentId`, then `transport_id`, then the
    /// current epoch milliseconds. A missing `createdAt` means `now`.
    pub fn from_dto(
        dto: &NotificationDto,
        transport_id: Option<&EventId>,
        is_live: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let id = dto
            .id
            .as_ref()
            .or(dto.content_id.as_ref())
            .or(transport_id)
            .map(|id| id.as_str().to_string())
            .unwrap_or_else(|| now.timestamp_millis().to_string());

        let created_at = match dto.created_at.as_deref() {
            Some(raw) => parse_timestamp(raw),
            None => Some(now),
        };

        Self {
            id,
            title: first_present(&[&dto.title, &dto.kind]).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            description: first_present(&[&dto.content, &dto.message, &dto.original_url])
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            time: relative_time(created_at, now),
            tag: dto
                .keyword
                .as_deref()
                .filter(|k| !k.is_empty())
                .map(|k| format!("#{}", k)),
            kind: NotificationKind::from_type(dto.kind.as_deref()),
            link: dto.original_url.clone().filter(|u| !u.is_empty()),
            is_live,
        }
    }
}

impl Keyed for NotificationItem {
    fn key(&self) -> &str {
        &self.id
    }
}

fn first_present(candidates: &[&Option<String>]) -> Option<String> {
    candidates.iter().find_map(|c| (*c).clone())
}

/// How a live frame should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveMessage {
    /// The server's `connected` handshake; discard.
    Handshake,
    /// An event type the feed does not consume.
    Ignored {
        /// The event type.
        event_type: String,
    },
    /// A notification to apply.
    Notification {
        /// Parsed payload.
        dto: NotificationDto,
        /// Transport `id:` field, else the payload id.
        event_id: Option<EventId>,
    },
    /// The payload could not be parsed.
    Malformed {
        /// Parse error.
        error: String,
    },
}

/// Classify a decoded live frame.
pub fn classify_live(event: &SseEvent) -> LiveMessage {
    let data = event.data.trim();
    if data == "connected" || data == "\"connected\"" {
        return LiveMessage::Handshake;
    }
    if event.event != NOTIFICATION_EVENT_TYPE && event.event != DEFAULT_EVENT_TYPE {
        return LiveMessage::Ignored {
            event_type: event.event.clone(),
        };
    }
    match json::from_str_lenient::<NotificationDto>(data) {
        Ok(dto) => {
            let event_id = event.id.clone().or_else(|| dto.id.clone());
            LiveMessage::Notification { dto, event_id }
        }
        Err(err) => LiveMessage::Malformed {
            error: err.to_string(),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryPhase {
    NotStarted,
    Loading,
    Settled,
}

/// Permission to open the live subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeTicket {
    /// Marker to send as `Last-Event-ID`.
    pub resume_from: Option<EventId>,
}

/// Notification list state.
#[derive(Debug, Clone)]
pub struct NotificationFeed {
    items: Vec<NotificationItem>,
    phase: HistoryPhase,
    next_cursor: Option<EventId>,
    has_next: bool,
    fetching_next: bool,
    subscribed: bool,
    marker: ResumeMarker,
    error: Option<String>,
}

impl NotificationFeed {
    /// An empty feed resuming from a persisted marker.
    pub fn new(stored_marker: Option<EventId>) -> Self {
        Self {
            items: Vec::new(),
            phase: HistoryPhase::NotStarted,
            next_cursor: None,
            has_next: false,
            fetching_next: false,
            subscribed: false,
            marker: ResumeMarker::with_stored(stored_marker),
            error: None,
        }
    }

    /// Start the first history fetch. Returns `false` if it already started.
    pub fn begin_history(&mut self) -> bool {
        if self.phase != HistoryPhase::NotStarted {
            return false;
        }
        self.phase = HistoryPhase::Loading;
        self.error = None;
        true
    }

    /// Apply the first history page.
    ///
    /// Returns the marker to persist when the page seeds it.
    pub fn apply_history(
        &mut self,
        page: CursorPage<NotificationDto, EventId>,
        now: DateTime<Utc>,
    ) -> Option<EventId> {
        self.phase = HistoryPhase::Settled;
        self.has_next = page.has_next();
        self.next_cursor = page.next_cursor_id;
        let seed = page
            .content
            .first()
            .and_then(|dto| dto.id.clone().or_else(|| dto.content_id.clone()));
        self.items = page
            .content
            .iter()
            .map(|dto| NotificationItem::from_dto(dto, None, false, now))
            .collect();
        seed.and_then(|id| self.marker.seed_from_history(id))
    }

    /// Record a failed first history fetch. The subscription may still open.
    pub fn history_failed(&mut self, message: impl Into<String>) {
        self.phase = HistoryPhase::Settled;
        let message = message.into();
        self.error = Some(if message.trim().is_empty() {
            HISTORY_FAILED_MESSAGE.to_string()
        } else {
            message
        });
    }

    /// Whether the first history fetch finished.
    pub fn history_settled(&self) -> bool {
        self.phase == HistoryPhase::Settled
    }

    /// Claim the next history page.
    ///
    /// `None` while another page is loading, once exhausted, or before a
    /// cursor is known.
    pub fn begin_next_page(&mut self) -> Option<EventId> {
        if self.fetching_next || !self.has_next {
            return None;
        }
        let cursor = self.next_cursor.clone()?;
        self.fetching_next = true;
        Some(cursor)
    }

    /// Append a further history page.
    pub fn apply_next_page(&mut self, page: CursorPage<NotificationDto, EventId>, now: DateTime<Utc>) {
        self.fetching_next = false;
        self.has_next = page.has_next();
        self.next_cursor = page.next_cursor_id;
        self.items.extend(
            page.content
                .iter()
                .map(|dto| NotificationItem::from_dto(dto, None, false, now)),
        );
    }

    /// Release the next-page guard after a failure. Items are untouched.
    pub fn next_page_failed(&mut self) {
        self.fetching_next = false;
    }

    /// Claim the single live subscription.
    ///
    /// `None` before history settles or while a subscription is open.
    pub fn try_subscribe(&mut self) -> Option<SubscribeTicket> {
        if !self.history_settled() || self.subscribed {
            return None;
        }
        self.subscribed = true;
        Some(SubscribeTicket {
            resume_from: self.marker.current().cloned(),
        })
    }

    /// The subscription was torn down.
    pub fn unsubscribed(&mut self) {
        self.subscribed = false;
    }

    /// Prepend a live notification.
    ///
    /// Returns the marker to persist.
    pub fn apply_live(
        &mut self,
        dto: &NotificationDto,
        event_id: Option<EventId>,
        now: DateTime<Utc>,
    ) -> Option<EventId> {
        let item = NotificationItem::from_dto(dto, event_id.as_ref(), true, now);
        self.items.insert(0, item);
        event_id.map(|id| self.marker.record_live(id))
    }

    /// The live stream failed; history stays.
    pub fn stream_degraded(&mut self) {
        self.error = Some(LIVE_DEGRADED_MESSAGE.to_string());
    }

    /// Items, most recent first.
    pub fn items(&self) -> &[NotificationItem] {
        &self.items
    }

    /// Current error message.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the first history fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.phase == HistoryPhase::Loading
    }

    /// Whether more history exists.
    pub fn has_next(&self) -> bool {
        self.has_next
    }

    /// Whether a next-page fetch is in flight.
    pub fn is_fetching_next(&self) -> bool {
        self.fetching_next
    }

    /// Whether a live subscription is open.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Current resume marker.
    pub fn marker(&self) -> Option<&EventId> {
        self.marker.current()
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
    }

    fn id(s: &str) -> EventId {
        EventId::new(s).unwrap()
    }

    fn dto(id_value: u64) -> NotificationDto {
        NotificationDto {
            id: EventId::new(id_value.to_string()),
            title: Some(format!("n{}", id_value)),
            ..Default::default()
        }
    }

    fn page(ids: &[u64], next: Option<&str>) -> CursorPage<NotificationDto, EventId> {
        CursorPage {
            content: ids.iter().map(|&i| dto(i)).collect(),
            next_cursor_id: next.map(id),
            has_next: None,
        }
    }

    fn sse(event: &str, data: &str, event_id: Option<&str>) -> SseEvent {
        SseEvent {
            event: event.into(),
            data: data.into(),
            id: event_id.map(id),
        }
    }

    // ===========================================
    // Mapping
    // ===========================================

    #[test]
    fn mapping_fallbacks() {
        let item = NotificationItem::from_dto(&NotificationDto::default(), None, false, now());
        assert_eq!(item.id, now().timestamp_millis().to_string());
        assert_eq!(item.title, DEFAULT_TITLE);
        assert_eq!(item.description, DEFAULT_DESCRIPTION);
        assert_eq!(item.time, "just now");
        assert_eq!(item.kind, NotificationKind::Article);
        assert_eq!(item.tag, None);
    }

    #[test]
    fn mapping_prefers_fields_in_order() {
        let dto = NotificationDto {
            content_id: Some(id("77")),
            kind: Some("KEYWORD_MATCH".into()),
            message: Some("msg".into()),
            original_url: Some("https://x.test".into()),
            keyword: Some("rust".into()),
            created_at: Some("2026-10-17T11:00:00Z".into()),
            ..Default::default()
        };
        let item = NotificationItem::from_dto(&dto, Some(&id("99")), true, now());
        assert_eq!(item.id, "77");
        assert_eq!(item.title, "KEYWORD_MATCH");
        assert_eq!(item.description, "msg");
        assert_eq!(item.tag.as_deref(), Some("#rust"));
        assert_eq!(item.kind, NotificationKind::Keyword);
        assert_eq!(item.link.as_deref(), Some("https://x.test"));
        assert_eq!(item.time, "1h ago");
        assert!(item.is_live);
    }

    #[test]
    fn transport_id_used_when_payload_has_none() {
        let item = NotificationItem::from_dto(&NotificationDto::default(), Some(&id("e-5")), true, now());
        assert_eq!(item.id, "e-5");
    }

    #[test]
    fn kind_classification() {
        assert_eq!(NotificationKind::from_type(Some("SYSTEM_NOTICE")), NotificationKind::System);
        assert_eq!(NotificationKind::from_type(Some("keyword")), NotificationKind::Keyword);
        assert_eq!(NotificationKind::from_type(Some("NEW_ARTICLE")), NotificationKind::Article);
        assert_eq!(NotificationKind::from_type(None), NotificationKind::Article);
    }

    // ===========================================
    // Live classification
    // ===========================================

    #[test]
    fn handshake_is_discarded() {
        assert_eq!(classify_live(&sse("message", "connected", None)), LiveMessage::Handshake);
        assert_eq!(classify_live(&sse("connect", "\"connected\"", None)), LiveMessage::Handshake);
    }

    #[test]
    fn other_event_types_are_ignored() {
        assert!(matches!(
            classify_live(&sse("heartbeat", "{}", None)),
            LiveMessage::Ignored { event_type } if event_type == "heartbeat"
        ));
    }

    #[test]
    fn notification_uses_transport_id_first() {
        match classify_live(&sse("notification", r#"{"id": 3, "title": "t"}"#, Some("31"))) {
            LiveMessage::Notification { event_id, dto } => {
                assert_eq!(event_id, Some(id("31")));
                assert_eq!(dto.title.as_deref(), Some("t"));
            }
            other => panic!("unexpected {:?}", other),
        }
        match classify_live(&sse("message", r#"{"id": 12345678901234567}"#, None)) {
            LiveMessage::Notification { event_id, .. } => {
                assert_eq!(event_id, Some(id("12345678901234567")));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn malformed_payload_is_reported() {
        assert!(matches!(
            classify_live(&sse("message", "{not json", None)),
            LiveMessage::Malformed { .. }
        ));
    }

    // ===========================================
    // Feed
    // ===========================================

    #[test]
    fn history_runs_once() {
        let mut feed = NotificationFeed::default();
        assert!(feed.begin_history());
        assert!(!feed.begin_history());
        assert!(feed.is_loading());
    }

    #[test]
    fn subscription_waits_for_history() {
        let mut feed = NotificationFeed::default();
        assert!(feed.try_subscribe().is_none());
        feed.begin_history();
        assert!(feed.try_subscribe().is_none());
        feed.apply_history(page(&[3, 2, 1], None), now());
        assert!(feed.try_subscribe().is_some());
    }

    #[test]
    fn subscription_opens_after_failed_history() {
        let mut feed = NotificationFeed::default();
        feed.begin_history();
        feed.history_failed("boom");
        assert_eq!(feed.error(), Some("boom"));
        assert!(feed.try_subscribe().is_some());
    }

    #[test]
    fn single_subscription() {
        let mut feed = NotificationFeed::default();
        feed.begin_history();
        feed.history_failed("");
        assert_eq!(feed.error(), Some(HISTORY_FAILED_MESSAGE));
        assert!(feed.try_subscribe().is_some());
        assert!(feed.try_subscribe().is_none());
        feed.unsubscribed();
        assert!(feed.try_subscribe().is_some());
    }

    #[test]
    fn history_seeds_marker_used_for_subscription() {
        let mut feed = NotificationFeed::new(Some(id("1")));
        feed.begin_history();
        let persisted = feed.apply_history(page(&[9, 8], Some("8")), now());
        assert_eq!(persisted, Some(id("9")));
        assert_eq!(feed.try_subscribe().unwrap().resume_from, Some(id("9")));
    }

    #[test]
    fn empty_history_keeps_stored_marker() {
        let mut feed = NotificationFeed::new(Some(id("4")));
        feed.begin_history();
        assert_eq!(feed.apply_history(page(&[], None), now()), None);
        assert_eq!(feed.try_subscribe().unwrap().resume_from, Some(id("4")));
    }

    #[test]
    fn live_items_are_prepended_and_move_marker() {
        let mut feed = NotificationFeed::default();
        feed.begin_history();
        feed.apply_history(page(&[2, 1], None), now());

        let persisted = feed.apply_live(&dto(3), Some(id("3")), now());
        assert_eq!(persisted, Some(id("3")));
        assert_eq!(feed.items()[0].id, "3");
        assert!(feed.items()[0].is_live);
        assert_eq!(feed.items().len(), 3);
        assert_eq!(feed.marker(), Some(&id("3")));
    }

    #[test]
    fn marker_is_last_live_id_with_interleaved_pages() {
        let mut feed = NotificationFeed::default();
        feed.begin_history();
        feed.apply_history(page(&[10, 9], Some("9")), now());
        feed.apply_live(&dto(11), Some(id("11")), now());

        let cursor = feed.begin_next_page().unwrap();
        assert_eq!(cursor, id("9"));
        feed.apply_live(&dto(12), Some(id("12")), now());
        feed.apply_next_page(page(&[8, 7], None), now());

        assert_eq!(feed.marker(), Some(&id("12")));
        let ids: Vec<_> = feed.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["12", "11", "10", "9", "8", "7"]);
    }

    #[test]
    fn next_page_guarded_and_exhaustible() {
        let mut feed = NotificationFeed::default();
        feed.begin_history();
        feed.apply_history(page(&[5], Some("5")), now());
        assert!(feed.has_next());

        assert!(feed.begin_next_page().is_some());
        assert!(feed.begin_next_page().is_none(), "guarded while in flight");
        feed.next_page_failed();
        assert!(!feed.is_fetching_next());

        assert!(feed.begin_next_page().is_some());
        feed.apply_next_page(page(&[4], None), now());
        assert!(!feed.has_next());
        assert!(feed.begin_next_page().is_none());
    }

    #[test]
    fn stream_degradation_keeps_history() {
        let mut feed = NotificationFeed::default();
        feed.begin_history();
        feed.apply_history(page(&[2, 1], None), now());
        feed.stream_degraded();
        assert_eq!(feed.error(), Some(LIVE_DEGRADED_MESSAGE));
        assert_eq!(feed.items().len(), 2);
    }
}
