//! NotificationSync - notification history plus the live stream.
//!
//! # Architecture
//!
//! ```text
//! start() ── history page ──► NotificationFeed ◄── live driver task
//!                                   │                    │
//!                              MarkerStore        StreamSession + SseDecoder
//!                                                        │
//!                                                 HttpTransport::open_stream
//! ```
//!
//! The first history page always settles before the subscription opens, so
//! the resume marker it seeds is the one sent as `Last-Event-ID`. The live
//! driver is a tokio task owned by [`NotificationSync`]; closing or dropping
//! it aborts the task and no further updates are applied.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use chrono::Utc;
use futures_util::StreamExt;
use keyfeed_core::{
    classify_live, failure_message, LiveMessage, NotificationFeed, NotificationItem,
    ReconnectPolicy, SseDecoder, SseFrame, StreamAction, StreamEvent, StreamNotice,
    StreamSession, SubscribeTicket,
};
use keyfeed_types::{ApiError, EventId};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::endpoints::SUBSCRIBE_PATH;
use crate::session::MarkerStore;
use crate::sync::LoadOutcome;
use crate::transport::{ByteStream, HttpTransport, TransportError};

/// Capacity of the update channel; slow receivers skip older updates.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Something observers of [`NotificationSync::updates`] should know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveUpdate {
    /// A live notification was prepended.
    Notification(NotificationItem),
    /// The stream's connection status changed.
    Stream(StreamNotice),
}

/// A copy of the notification state for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSnapshot {
    /// Notifications, most recent first.
    pub items: Vec<NotificationItem>,
    /// Current error message.
    pub error: Option<String>,
    /// First history fetch in flight.
    pub is_loading: bool,
    /// More history exists.
    pub has_next: bool,
    /// A next-page fetch is in flight.
    pub is_fetching_next: bool,
}

/// State shared with the live driver task.
struct Shared<T: HttpTransport> {
    client: ApiClient<T>,
    markers: MarkerStore,
    feed: Mutex<NotificationFeed>,
    updates: broadcast::Sender<LiveUpdate>,
}

impl<T: HttpTransport> Shared<T> {
    fn persist_marker(&self, id: Option<EventId>) {
        if let Some(id) = id {
            if let Err(e) = self.markers.save(&id) {
                tracing::warn!("Failed to persist resume marker: {}", e);
            }
        }
    }

    fn publish(&self, update: LiveUpdate) {
        // No receivers is fine.
        let _ = self.updates.send(update);
    }
}

/// Notification history and live subscription for the signed-in user.
pub struct NotificationSync<T: HttpTransport> {
    shared: Arc<Shared<T>>,
    live: StdMutex<Option<JoinHandle<()>>>,
}

impl<T: HttpTransport> std::fmt::Debug for NotificationSync<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSync").finish_non_exhaustive()
    }
}

impl<T: HttpTransport> NotificationSync<T> {
    /// Create the feed, resuming from the marker persisted in `markers`.
    pub fn new(client: ApiClient<T>, markers: MarkerStore) -> Self {
        let feed = NotificationFeed::new(markers.load());
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                client,
                markers,
                feed: Mutex::new(feed),
                updates,
            }),
            live: StdMutex::new(None),
        }
    }

    /// Load the first history page, then open the live subscription.
    ///
    /// A failed history fetch is recorded and the subscription still opens.
    pub async fn start(&self) {
        self.load_history().await;
        self.subscribe().await;
    }

    /// Fetch the first history page. A no-op once it has started.
    pub async fn load_history(&self) -> LoadOutcome {
        if !self.shared.feed.lock().await.begin_history() {
            return LoadOutcome::Skipped;
        }

        let result = self.shared.client.notification_page(None).await;

        let mut feed = self.shared.feed.lock().await;
        match result {
            Ok(page) => {
                tracing::debug!(
                    "Notification history loaded ({} items, next cursor {:?})",
                    page.content.len(),
                    page.next_cursor_id
                );
                let seeded = feed.apply_history(page, Utc::now());
                self.shared.persist_marker(seeded);
            }
            Err(e) => {
                tracing::warn!("Notification history failed: {}", e);
                feed.history_failed(failure_message(&e));
            }
        }
        LoadOutcome::Applied
    }

    /// Fetch the next history page. A no-op while one is loading, once
    /// history is exhausted, or before a cursor is known.
    pub async fn fetch_next_page(&self) -> LoadOutcome {
        let Some(cursor) = self.shared.feed.lock().await.begin_next_page() else {
            return LoadOutcome::Skipped;
        };

        let result = self.shared.client.notification_page(Some(&cursor)).await;

        let mut feed = self.shared.feed.lock().await;
        match result {
            Ok(page) => feed.apply_next_page(page, Utc::now()),
            Err(e) => {
                tracing::warn!("Loading older notifications failed: {}", e);
                feed.next_page_failed();
            }
        }
        LoadOutcome::Applied
    }

    /// Open the live subscription.
    ///
    /// Returns `false` before history settles or while a subscription is
    /// already open.
    pub async fn subscribe(&self) -> bool {
        let Some(ticket) = self.shared.feed.lock().await.try_subscribe() else {
            return false;
        };
        tracing::info!(
            "Opening notification stream (resume from {:?})",
            ticket.resume_from
        );
        let task = tokio::spawn(drive_live(Arc::clone(&self.shared), ticket));
        if let Some(previous) = self.live_slot().replace(task) {
            previous.abort();
        }
        true
    }

    /// Close the live subscription. History stays.
    pub async fn close(&self) {
        let task = self.live_slot().take();
        if let Some(task) = task {
            task.abort();
            tracing::info!("Notification stream closed");
            self.shared.publish(LiveUpdate::Stream(StreamNotice::Closed));
        }
        self.shared.feed.lock().await.unsubscribed();
    }

    /// Observe live notifications and connection changes.
    pub fn updates(&self) -> broadcast::Receiver<LiveUpdate> {
        self.shared.updates.subscribe()
    }

    /// Notifications, most recent first.
    pub async fn items(&self) -> Vec<NotificationItem> {
        self.shared.feed.lock().await.items().to_vec()
    }

    /// Current error message.
    pub async fn error(&self) -> Option<String> {
        self.shared.feed.lock().await.error().map(str::to_string)
    }

    /// Current resume marker.
    pub async fn marker(&self) -> Option<EventId> {
        self.shared.feed.lock().await.marker().cloned()
    }

    /// Whether a live subscription is open.
    pub async fn is_subscribed(&self) -> bool {
        self.shared.feed.lock().await.is_subscribed()
    }

    /// Copy of the whole state.
    pub async fn snapshot(&self) -> NotificationSnapshot {
        let feed = self.shared.feed.lock().await;
        NotificationSnapshot {
            items: feed.items().to_vec(),
            error: feed.error().map(str::to_string),
            is_loading: feed.is_loading(),
            has_next: feed.has_next(),
            is_fetching_next: feed.is_fetching_next(),
        }
    }

    fn live_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: HttpTransport> Drop for NotificationSync<T> {
    fn drop(&mut self) {
        if let Some(task) = self.live_slot().take() {
            task.abort();
        }
    }
}

/// Run the live stream until the task is aborted.
async fn drive_live<T: HttpTransport>(shared: Arc<Shared<T>>, ticket: SubscribeTicket) {
    let policy = ReconnectPolicy::with_max_delay(shared.client.config().stream_retry_max);
    let mut session = StreamSession::new(ticket.resume_from, policy);
    let mut actions: VecDeque<StreamAction> = session.on_event(StreamEvent::OpenRequested).into();
    let mut stream: Option<ByteStream> = None;
    let mut decoder = SseDecoder::new();

    loop {
        while let Some(action) = actions.pop_front() {
            match action {
                StreamAction::Connect { last_event_id } => {
                    match open_stream(&shared.client, last_event_id.as_ref()).await {
                        Ok(opened) => {
                            stream = Some(opened);
                            decoder = SseDecoder::with_last_event_id(session.last_event_id().cloned());
                            actions.extend(session.on_event(StreamEvent::Connected));
                        }
                        Err(ApiError::Unauthorized { .. })
                            if shared.client.session().current().is_none() =>
                        {
                            tracing::info!("Session ended, stopping notification stream");
                            actions.extend(session.on_event(StreamEvent::SessionEnded));
                        }
                        Err(e) => {
                            actions.extend(session.on_event(StreamEvent::ConnectFailed {
                                error: e.to_string(),
                            }));
                        }
                    }
                }
                StreamAction::Disconnect => stream = None,
                StreamAction::StartReconnectTimer { delay } => {
                    tracing::debug!("Reconnecting notification stream in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    actions.extend(session.on_event(StreamEvent::ReconnectTimer));
                }
                StreamAction::CancelReconnect => {}
                StreamAction::Emit(notice) => {
                    match &notice {
                        StreamNotice::Degraded { error, attempt } => {
                            tracing::warn!("Notification stream degraded (attempt {}): {}", attempt, error);
                            shared.feed.lock().await.stream_degraded();
                        }
                        StreamNotice::SignedOut => shared.feed.lock().await.unsubscribed(),
                        StreamNotice::Opened | StreamNotice::Closed => {}
                    }
                    shared.publish(LiveUpdate::Stream(notice));
                }
            }
        }

        let Some(open) = stream.as_mut() else {
            return;
        };
        let event = match open.next().await {
            Some(Ok(chunk)) => {
                for frame in decoder.feed(&chunk) {
                    apply_frame(&shared, &mut session, frame).await;
                }
                continue;
            }
            Some(Err(e)) => StreamEvent::Disconnected {
                reason: e.to_string(),
            },
            None => StreamEvent::Disconnected {
                reason: "stream ended".into(),
            },
        };
        actions.extend(session.on_event(event));
    }
}

async fn apply_frame<T: HttpTransport>(shared: &Shared<T>, session: &mut StreamSession, frame: SseFrame) {
    let event = match frame {
        SseFrame::Retry(hint) => {
            session.set_retry_hint(hint);
            return;
        }
        SseFrame::Event(event) => event,
    };

    match classify_live(&event) {
        LiveMessage::Handshake => tracing::debug!("Notification stream handshake"),
        LiveMessage::Ignored { event_type } => {
            tracing::debug!("Ignoring live event of type {}", event_type);
        }
        LiveMessage::Malformed { error } => {
            tracing::warn!("Skipping malformed live notification: {}", error);
        }
        LiveMessage::Notification { dto, event_id } => {
            let item = {
                let mut feed = shared.feed.lock().await;
                let marker = feed.apply_live(&dto, event_id, Utc::now());
                if let Some(id) = &marker {
                    session.record_event_id(id.clone());
                }
                shared.persist_marker(marker);
                feed.items().first().cloned()
            };
            if let Some(item) = item {
                shared.publish(LiveUpdate::Notification(item));
            }
        }
    }
}

/// Open the stream, refreshing the token once if the server rejects it.
async fn open_stream<T: HttpTransport>(
    client: &ApiClient<T>,
    last_event_id: Option<&EventId>,
) -> Result<ByteStream, ApiError> {
    let resume = last_event_id.map(EventId::as_str);
    let round = client.refresh_round();
    let token = client.session().token();
    let request = client.stream_request(SUBSCRIBE_PATH, resume)?;

    match client.transport().open_stream(request).await {
        Ok(stream) => Ok(stream),
        Err(TransportError::StreamRejected { status: 401 }) => {
            let refreshed = match &token {
                Some(stale) => client.refresh_after(stale, round).await,
                None => false,
            };
            if !refreshed {
                return Err(ApiError::Unauthorized {
                    message: "notification stream rejected the session".into(),
                });
            }
            let request = client.stream_request(SUBSCRIBE_PATH, resume)?;
            client
                .transport()
                .open_stream(request)
                .await
                .map_err(|e| ApiError::Stream(e.to_string()))
        }
        Err(e) => Err(ApiError::Stream(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::test_support::signed_in_client;
    use crate::session::LAST_EVENT_ID_KEY;
    use crate::storage::{KeyValueStore, MemoryStore};
    use crate::transport::{Method, MockStream, MockTransport};
    use keyfeed_core::LIVE_DEGRADED_MESSAGE;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn history(ids: std::ops::Range<u64>, next: Option<u64>, has_next: bool) -> Value {
        let content: Vec<Value> = ids
            .rev()
            .map(|id| json!({"id": id, "title": format!("n{}", id), "message": "m", "type": "KEYWORD_MATCH"}))
            .collect();
        json!({"content": content, "nextCursorId": next, "hasNext": has_next})
    }

    fn setup(transport: &MockTransport) -> (MemoryStore, NotificationSync<MockTransport>) {
        let durable = MemoryStore::new();
        let sync = setup_with(transport, &durable);
        (durable, sync)
    }

    fn setup_with(transport: &MockTransport, durable: &MemoryStore) -> NotificationSync<MockTransport> {
        let client = signed_in_client(transport);
        NotificationSync::new(client, MarkerStore::new(Arc::new(durable.clone())))
    }

    async fn next_notification(rx: &mut broadcast::Receiver<LiveUpdate>) -> NotificationItem {
        loop {
            if let LiveUpdate::Notification(item) = rx.recv().await.unwrap() {
                return item;
            }
        }
    }

    async fn next_notice(rx: &mut broadcast::Receiver<LiveUpdate>) -> StreamNotice {
        loop {
            if let LiveUpdate::Stream(notice) = rx.recv().await.unwrap() {
                return notice;
            }
        }
    }

    fn stream_requests(transport: &MockTransport) -> Vec<crate::transport::HttpRequest> {
        transport.requests_to(Method::Get, SUBSCRIBE_PATH)
    }

    // ===========================================
    // History
    // ===========================================

    #[tokio::test]
    async fn history_seeds_marker_and_next_page_appends() {
        let transport = MockTransport::new();
        transport.respond_data(Method::Get, "/notifications", history(117..137, Some(117), true));
        transport.respond_data(Method::Get, "/notifications", history(100..105, None, false));
        let (durable, sync) = setup(&transport);

        sync.load_history().await;
        assert_eq!(sync.items().await.len(), 20);
        assert_eq!(durable.get(LAST_EVENT_ID_KEY).unwrap().as_deref(), Some("136"));

        assert_eq!(sync.fetch_next_page().await, LoadOutcome::Applied);
        let request = transport.last_request().unwrap();
        assert!(request.url.ends_with("lastId=117"));

        let items = sync.items().await;
        assert_eq!(items.len(), 25);
        assert_eq!(items[19].id, "117");
        assert_eq!(items[20].id, "104");
        assert!(!sync.snapshot().await.has_next);

        assert_eq!(sync.fetch_next_page().await, LoadOutcome::Skipped);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_next_page_is_guarded() {
        let transport = MockTransport::new();
        transport.respond_data(Method::Get, "/notifications", history(10..12, Some(10), true));
        transport.respond_data(Method::Get, "/notifications", history(1..3, None, false));
        let (_, sync) = setup(&transport);
        sync.load_history().await;

        let (a, b) = tokio::join!(sync.fetch_next_page(), sync.fetch_next_page());
        assert_eq!((a, b), (LoadOutcome::Applied, LoadOutcome::Skipped));
        assert_eq!(sync.items().await.len(), 4);
    }

    #[tokio::test]
    async fn failed_next_page_keeps_items_and_allows_retry() {
        let transport = MockTransport::new();
        transport.respond_data(Method::Get, "/notifications", history(10..12, Some(10), true));
        transport.respond_json(Method::Get, "/notifications", 500, json!({}));
        transport.respond_data(Method::Get, "/notifications", history(1..3, None, false));
        let (_, sync) = setup(&transport);
        sync.load_history().await;

        sync.fetch_next_page().await;
        assert_eq!(sync.items().await.len(), 2);
        assert!(!sync.snapshot().await.is_fetching_next);

        sync.fetch_next_page().await;
        assert_eq!(sync.items().await.len(), 4);
    }

    // ===========================================
    // Live subscription
    // ===========================================

    #[tokio::test]
    async fn subscription_waits_for_history() {
        let transport = MockTransport::new();
        let (_, sync) = setup(&transport);
        assert!(!sync.subscribe().await);
        assert!(stream_requests(&transport).is_empty());
    }

    #[tokio::test]
    async fn live_events_prepend_and_move_marker() {
        let transport = MockTransport::new();
        transport.respond_data(Method::Get, "/notifications", history(40..42, None, false));
        let live = transport.push_stream(SUBSCRIBE_PATH);
        let (durable, sync) = setup(&transport);
        let mut rx = sync.updates();

        sync.start().await;
        assert_eq!(next_notice(&mut rx).await, StreamNotice::Opened);

        let request = &stream_requests(&transport)[0];
        assert_eq!(request.header("Last-Event-ID"), Some("41"));
        assert_eq!(request.header("Authorization"), Some("Bearer tok"));
        assert_eq!(request.header("Accept"), Some("text/event-stream"));

        live.send_event(None, None, "connected");
        live.send_event(Some("heartbeat"), Some("x"), "{}");
        live.send_event(Some("notification"), Some("77"), r#"{"id": 9, "title": "Rust 2.0", "message": "m"}"#);
        live.send_event(None, None, "{not json");
        live.send_event(None, None, r#"{"id": 78, "title": "Tokio 2.0"}"#);

        let first = next_notification(&mut rx).await;
        assert_eq!(first.title, "Rust 2.0");
        assert!(first.is_live);
        let second = next_notification(&mut rx).await;
        assert_eq!(second.title, "Tokio 2.0");

        let items = sync.items().await;
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].title, "Tokio 2.0");
        assert_eq!(items[1].title, "Rust 2.0");

        // The transport id persists across events, so it wins over payload ids.
        assert_eq!(sync.marker().await, EventId::new("77"));
        assert_eq!(durable.get(LAST_EVENT_ID_KEY).unwrap().as_deref(), Some("77"));
    }

    #[tokio::test]
    async fn payload_id_is_marker_without_transport_id() {
        let transport = MockTransport::new();
        transport.respond_data(Method::Get, "/notifications", history(0..0, None, false));
        let live = transport.push_stream(SUBSCRIBE_PATH);
        let (durable, sync) = setup(&transport);
        let mut rx = sync.updates();

        sync.start().await;
        assert_eq!(next_notice(&mut rx).await, StreamNotice::Opened);

        live.send_event(None, None, r#"{"id": 5, "title": "t"}"#);
        next_notification(&mut rx).await;
        assert_eq!(durable.get(LAST_EVENT_ID_KEY).unwrap().as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn history_does_not_override_live_marker() {
        let transport = MockTransport::new();
        transport.respond_data(Method::Get, "/notifications", history(40..42, Some(40), true));
        transport.respond_data(Method::Get, "/notifications", history(30..32, None, false));
        let live = transport.push_stream(SUBSCRIBE_PATH);
        let (durable, sync) = setup(&transport);
        let mut rx = sync.updates();

        sync.start().await;
        live.send_event(None, Some("90"), r#"{"id": 90, "title": "live"}"#);
        next_notification(&mut rx).await;

        sync.fetch_next_page().await;
        assert_eq!(sync.marker().await, EventId::new("90"));
        assert_eq!(durable.get(LAST_EVENT_ID_KEY).unwrap().as_deref(), Some("90"));
        assert_eq!(sync.items().await.len(), 5);
    }

    #[tokio::test]
    async fn subscription_opens_after_failed_history() {
        let transport = MockTransport::new();
        transport.respond_json(Method::Get, "/notifications", 500, json!({"message": "history down"}));
        let _live = transport.push_stream(SUBSCRIBE_PATH);
        let durable = MemoryStore::new();
        durable.set(LAST_EVENT_ID_KEY, "12").unwrap();
        let sync = setup_with(&transport, &durable);
        let mut rx = sync.updates();

        sync.start().await;
        assert_eq!(next_notice(&mut rx).await, StreamNotice::Opened);
        assert_eq!(sync.error().await.as_deref(), Some("history down"));
        assert_eq!(stream_requests(&transport)[0].header("Last-Event-ID"), Some("12"));
        assert!(sync.is_subscribed().await);
    }

    #[tokio::test]
    async fn only_one_subscription() {
        let transport = MockTransport::new();
        transport.respond_data(Method::Get, "/notifications", history(0..0, None, false));
        let _live = transport.push_stream(SUBSCRIBE_PATH);
        let (_, sync) = setup(&transport);

        sync.start().await;
        assert!(!sync.subscribe().await);

        sync.close().await;
        assert!(!sync.is_subscribed().await);
        let _again = transport.push_stream(SUBSCRIBE_PATH);
        assert!(sync.subscribe().await);
    }

    #[tokio::test]
    async fn closed_subscription_applies_nothing() {
        let transport = MockTransport::new();
        transport.respond_data(Method::Get, "/notifications", history(0..0, None, false));
        let live = transport.push_stream(SUBSCRIBE_PATH);
        let (_, sync) = setup(&transport);
        let mut rx = sync.updates();

        sync.start().await;
        assert_eq!(next_notice(&mut rx).await, StreamNotice::Opened);
        sync.close().await;
        assert_eq!(next_notice(&mut rx).await, StreamNotice::Closed);

        live.send_event(None, Some("1"), r#"{"id": 1, "title": "late"}"#);
        tokio::task::yield_now().await;
        assert!(sync.items().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_degrades_then_reconnects_with_marker() {
        let transport = MockTransport::new();
        transport.respond_data(Method::Get, "/notifications", history(40..42, None, false));
        let first: MockStream = transport.push_stream(SUBSCRIBE_PATH);
        let second: MockStream = transport.push_stream(SUBSCRIBE_PATH);
        let (_, sync) = setup(&transport);
        let mut rx = sync.updates();

        sync.start().await;
        assert_eq!(next_notice(&mut rx).await, StreamNotice::Opened);
        first.send_event(None, Some("50"), r#"{"id": 50, "title": "before"}"#);
        next_notification(&mut rx).await;

        first.fail("connection reset");
        assert!(matches!(next_notice(&mut rx).await, StreamNotice::Degraded { attempt: 1, .. }));
        assert_eq!(sync.error().await.as_deref(), Some(LIVE_DEGRADED_MESSAGE));
        assert_eq!(sync.items().await.len(), 3);

        // Paused time jumps over the backoff.
        assert_eq!(next_notice(&mut rx).await, StreamNotice::Opened);
        let requests = stream_requests(&transport);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].header("Last-Event-ID"), Some("50"));

        second.send_event(None, Some("51"), r#"{"id": 51, "title": "after"}"#);
        assert_eq!(next_notification(&mut rx).await.title, "after");
    }

    #[tokio::test(start_paused = true)]
    async fn event_id_carries_over_reconnect() {
        let transport = MockTransport::new();
        transport.respond_data(Method::Get, "/notifications", history(0..0, None, false));
        let first = transport.push_stream(SUBSCRIBE_PATH);
        let second = transport.push_stream(SUBSCRIBE_PATH);
        let (durable, sync) = setup(&transport);
        let mut rx = sync.updates();

        sync.start().await;
        assert_eq!(next_notice(&mut rx).await, StreamNotice::Opened);
        first.send_event(None, Some("50"), r#"{"title": "before"}"#);
        assert_eq!(next_notification(&mut rx).await.id, "50");

        first.fail("connection reset");
        assert!(matches!(next_notice(&mut rx).await, StreamNotice::Degraded { .. }));
        assert_eq!(next_notice(&mut rx).await, StreamNotice::Opened);

        // No id on the wire or in the payload: the last event id still applies.
        second.send_event(None, None, r#"{"title": "after"}"#);
        let item = next_notification(&mut rx).await;
        assert_eq!(item.id, "50");
        assert_eq!(durable.get(LAST_EVENT_ID_KEY).unwrap().as_deref(), Some("50"));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_stream_stops_after_sign_out() {
        let transport = MockTransport::new();
        transport.respond_data(Method::Get, "/notifications", history(0..0, None, false));
        transport.respond_json(Method::Post, "/auth/refresh", 401, json!({}));
        transport.fail_next_stream(TransportError::StreamRejected { status: 401 });
        let (_, sync) = setup(&transport);
        let mut rx = sync.updates();

        sync.start().await;
        assert_eq!(next_notice(&mut rx).await, StreamNotice::SignedOut);
        assert!(!sync.is_subscribed().await);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(stream_requests(&transport).len(), 1);
        assert_eq!(transport.requests_to(Method::Post, "/auth/refresh").len(), 1);
    }

    #[tokio::test]
    async fn rejected_stream_refreshes_token() {
        let transport = MockTransport::new();
        transport.respond_data(Method::Get, "/notifications", history(0..0, None, false));
        transport.respond_json(Method::Post, "/auth/refresh", 200, json!({"data": "fresh"}));
        transport.fail_next_stream(TransportError::StreamRejected { status: 401 });
        let _live = transport.push_stream(SUBSCRIBE_PATH);
        let (_, sync) = setup(&transport);
        let mut rx = sync.updates();

        sync.start().await;
        assert_eq!(next_notice(&mut rx).await, StreamNotice::Opened);
        let requests = stream_requests(&transport);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].header("Authorization"), Some("Bearer fresh"));
    }
}
