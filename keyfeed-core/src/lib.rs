//! # keyfeed-core
//!
//! Pure client logic for KeyFeed (no I/O, instant tests).
//!
//! This crate implements the state machines behind the KeyFeed client
//! without any network or disk I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure**: they take input and produce output
//! without side effects. Where time matters, `now` is a parameter.
//!
//! The actual I/O (HTTP, the live stream, storage) is performed by
//! `keyfeed-client`, which asks these types what to do and reports back:
//! - [`PagedList`] hands out [`LoadTicket`]s and drops stale completions
//! - [`PendingToggle`] plans an optimistic bookmark change and its rollback
//! - [`NotificationFeed`] orders history before the live subscription
//! - [`StreamSession`] decides when to (re)connect and from which event id
//! - [`SseDecoder`] turns stream bytes into events

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bookmark;
pub mod display;
pub mod item;
pub mod loader;
pub mod marker;
pub mod notify;
pub mod sse;
pub mod stream;

pub use bookmark::{BookmarkCommand, BookmarkState, Bookmarkable, InFlightToggles, PendingToggle};
pub use item::{BookmarkedItem, FeedItem, DEFAULT_THUMBNAIL};
pub use loader::{
    failure_message, Keyed, LoadEvent, LoadPhase, LoadTicket, Page, PagedList, Settled,
    TransitionError, LOAD_FAILED_MESSAGE, SERVICE_BUSY_MESSAGE,
};
pub use marker::ResumeMarker;
pub use notify::{
    classify_live, LiveMessage, NotificationFeed, NotificationItem, NotificationKind,
    SubscribeTicket, LIVE_DEGRADED_MESSAGE,
};
pub use sse::{SseDecoder, SseEvent, SseFrame};
pub use stream::{
    ReconnectPolicy, StreamAction, StreamEvent, StreamNotice, StreamSession, StreamState,
};
