//! # keyfeed-client
//!
//! Client library for the KeyFeed API.
//!
//! This is the library that front ends use to talk to the KeyFeed backend.
//!
//! ## Features
//!
//! - **Session handling**: bearer token attach, single-flight token refresh,
//!   durable or process-scoped sessions with change notification
//! - **Paginated lists**: the feed and bookmarks with race-safe loading
//! - **Optimistic bookmarks**: instant toggles with exact rollback
//! - **Live notifications**: history first, then a reconnecting SSE stream
//!   that resumes from the last seen event
//! - **Transport Abstraction**: pluggable HTTP layer (reqwest, mock)
//!
//! ## Example
//!
//! ```ignore
//! use keyfeed_client::{ApiClient, ClientConfig, FeedSource, ListSync, ReqwestTransport};
//!
//! let transport = ReqwestTransport::new(config.request_timeout)?;
//! let client = ApiClient::new(config, transport, session);
//! client.login("kim@example.com", "password", true).await?;
//!
//! let feed = ListSync::new(FeedSource::new(client.clone()));
//! feed.load().await;
//! feed.load_next_page().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod endpoints;
pub mod notifications;
pub mod session;
pub mod storage;
pub mod sync;
pub mod transport;

pub use api::{ApiClient, ApiRequest, ResponseBody, REFRESH_PATH};
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use endpoints::SUBSCRIBE_PATH;
pub use notifications::{LiveUpdate, NotificationSnapshot, NotificationSync};
pub use session::{FollowGuard, MarkerStore, SessionStore, AUTH_KEY, LAST_EVENT_ID_KEY};
pub use storage::{
    FileStore, KeyValueStore, MemoryStore, NoopWatcher, PollingWatcher, StorageChange,
    StorageError, StorageWatcher,
};
pub use sync::{
    BookmarkBackend, BookmarkSource, BookmarkSync, FeedSource, FeedSync, ListSnapshot, ListSync,
    LoadOutcome, PageSource, ToggleError,
};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, MockStream, MockTransport, RequestBody,
    ReqwestTransport, TransportError,
};
