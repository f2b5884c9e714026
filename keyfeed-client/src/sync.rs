//! ListSync - drives a [`PagedList`] against the API.
//!
//! # Architecture
//!
//! ```text
//! Application → ListSync → PageSource (FeedSource / BookmarkSource) → ApiClient
//!                  ↓
//!        keyfeed-core PagedList + PendingToggle (pure state)
//! ```
//!
//! The list state lives behind a tokio mutex that is only held to start or
//! settle a load, never across the request itself. Overlapping loads are
//! resolved by the list's generation tickets.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use keyfeed_core::{
    failure_message, BookmarkCommand, BookmarkState, Bookmarkable, BookmarkedItem, FeedItem,
    InFlightToggles, LoadPhase, LoadTicket, Page, PagedList, PendingToggle, Settled,
};
use keyfeed_types::{ApiError, BookmarkId, ContentId, Cursor, FolderId};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::api::ApiClient;
use crate::transport::HttpTransport;

/// Something that serves pages of a list.
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    /// Display item.
    type Item: Send;
    /// Page cursor.
    type Cursor: Clone + Send + Sync;

    /// Fetch the page after `cursor` (`None` for the first page).
    async fn fetch(
        &self,
        cursor: Option<Self::Cursor>,
    ) -> Result<Page<Self::Item, Self::Cursor>, ApiError>;
}

/// The personalised feed.
#[derive(Debug, Clone)]
pub struct FeedSource<T: HttpTransport> {
    client: ApiClient<T>,
}

impl<T: HttpTransport> FeedSource<T> {
    /// Feed served by `client`.
    pub fn new(client: ApiClient<T>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<T: HttpTransport> PageSource for FeedSource<T> {
    type Item = FeedItem;
    type Cursor = Cursor;

    async fn fetch(&self, cursor: Option<Cursor>) -> Result<Page<FeedItem, Cursor>, ApiError> {
        let page = self.client.feed_page(cursor).await?;
        let now = Utc::now();
        let has_next = page.has_next();
        Ok(Page {
            items: page
                .content
                .into_iter()
                .map(|content| FeedItem::from_content(content, now))
                .collect(),
            next_cursor: page.next_cursor_id,
            has_next,
        })
    }
}

/// Saved bookmarks, optionally limited to one folder.
#[derive(Debug, Clone)]
pub struct BookmarkSource<T: HttpTransport> {
    client: ApiClient<T>,
    folder: Option<FolderId>,
}

impl<T: HttpTransport> BookmarkSource<T> {
    /// Bookmarks in `folder`, or in every folder.
    pub fn new(client: ApiClient<T>, folder: Option<FolderId>) -> Self {
        Self { client, folder }
    }
}

#[async_trait]
impl<T: HttpTransport> PageSource for BookmarkSource<T> {
    type Item = BookmarkedItem;
    type Cursor = Cursor;

    async fn fetch(&self, cursor: Option<Cursor>) -> Result<Page<BookmarkedItem, Cursor>, ApiError> {
        let page = self.client.bookmark_page(self.folder, cursor).await?;
        let now = Utc::now();
        let has_next = page.has_next();
        Ok(Page {
            items: page
                .content
                .into_iter()
                .map(|entry| BookmarkedItem::from_entry(entry, now))
                .collect(),
            next_cursor: page.next_cursor_id,
            has_next,
        })
    }
}

/// Server side of a bookmark toggle.
#[async_trait]
pub trait BookmarkBackend: Send + Sync {
    /// Bookmark content; returns the new id.
    async fn create(&self, content_id: ContentId) -> Result<BookmarkId, ApiError>;
    /// Remove a bookmark.
    async fn delete(&self, bookmark_id: BookmarkId) -> Result<(), ApiError>;
}

#[async_trait]
impl<T: HttpTransport> BookmarkBackend for ApiClient<T> {
    async fn create(&self, content_id: ContentId) -> Result<BookmarkId, ApiError> {
        self.create_bookmark(content_id).await
    }

    async fn delete(&self, bookmark_id: BookmarkId) -> Result<(), ApiError> {
        self.delete_bookmark(bookmark_id).await
    }
}

/// Result of a load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The list's guards refused to start a load.
    Skipped,
    /// The result (page or error) was applied.
    Applied,
    /// A newer load superseded this one; its result was dropped.
    Stale,
}

impl From<Settled> for LoadOutcome {
    fn from(settled: Settled) -> Self {
        match settled {
            Settled::Applied => LoadOutcome::Applied,
            Settled::Stale => LoadOutcome::Stale,
        }
    }
}

/// Why a bookmark toggle did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToggleError {
    /// No loaded item has this id.
    #[error("unknown item: {0}")]
    UnknownItem(String),

    /// A toggle for this item is still in flight.
    #[error("a bookmark change for {0} is already in progress")]
    InFlight(String),

    /// The server rejected the change; the item was rolled back.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// A copy of the list state for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSnapshot<T> {
    /// Loaded items.
    pub items: Vec<T>,
    /// Loader phase.
    pub phase: LoadPhase,
    /// Message of the last failure.
    pub error: Option<String>,
    /// Whether more pages exist.
    pub has_next: bool,
}

struct SyncState<T, C> {
    list: PagedList<T, C>,
    toggles: InFlightToggles,
}

/// A paginated list kept in sync with a [`PageSource`].
///
/// Cloning shares the list.
pub struct ListSync<S: PageSource> {
    source: Arc<S>,
    state: Arc<Mutex<SyncState<S::Item, S::Cursor>>>,
}

impl<S: PageSource> Clone for ListSync<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: PageSource> std::fmt::Debug for ListSync<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListSync").finish_non_exhaustive()
    }
}

/// List of feed items.
pub type FeedSync<T> = ListSync<FeedSource<T>>;

/// List of bookmarks.
pub type BookmarkSync<T> = ListSync<BookmarkSource<T>>;

impl<S: PageSource> ListSync<S> {
    /// Empty list over `source`. Nothing is fetched until [`Self::load`].
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            state: Arc::new(Mutex::new(SyncState {
                list: PagedList::new(),
                toggles: InFlightToggles::new(),
            })),
        }
    }

    /// Load the first page, replacing the list.
    ///
    /// Skipped while another initial load is in flight; supersedes an
    /// in-flight pagination load.
    pub async fn load(&self) -> LoadOutcome {
        let ticket = {
            let mut state = self.state.lock().await;
            match state.list.begin_load() {
                Ok(ticket) => ticket,
                Err(e) => {
                    tracing::debug!("Load skipped: {}", e);
                    return LoadOutcome::Skipped;
                }
            }
        };
        self.run(ticket).await
    }

    /// Load the next page and append it.
    ///
    /// A no-op when the list failed, is exhausted, is already loading or has
    /// no cursor.
    pub async fn load_next_page(&self) -> LoadOutcome {
        let ticket = self.state.lock().await.list.begin_next();
        match ticket {
            Some(ticket) => self.run(ticket).await,
            None => LoadOutcome::Skipped,
        }
    }

    /// Recover after a failure.
    ///
    /// With nothing loaded this is [`Self::load`]; otherwise pagination
    /// resumes from the last cursor, or the list reloads when there is none.
    pub async fn retry(&self) -> LoadOutcome {
        let ticket = {
            let mut state = self.state.lock().await;
            match state.list.begin_retry() {
                Ok(ticket) => ticket,
                Err(e) => {
                    tracing::debug!("Retry skipped: {}", e);
                    return LoadOutcome::Skipped;
                }
            }
        };
        self.run(ticket).await
    }

    async fn run(&self, ticket: LoadTicket<S::Cursor>) -> LoadOutcome {
        let result = self.source.fetch(ticket.cursor().cloned()).await;

        let mut state = self.state.lock().await;
        let settled = match result {
            Ok(page) => state.list.complete(&ticket, page),
            Err(e) => {
                tracing::warn!("List load failed: {}", e);
                state.list.fail(&ticket, failure_message(&e))
            }
        };
        if settled == Settled::Stale {
            tracing::debug!("Dropping stale load result (generation {})", ticket.generation());
        }
        settled.into()
    }

    /// Current phase.
    pub async fn phase(&self) -> LoadPhase {
        self.state.lock().await.list.phase()
    }

    /// Message of the last failure.
    pub async fn error(&self) -> Option<String> {
        self.state.lock().await.list.error().map(str::to_string)
    }

    /// Whether more pages exist.
    pub async fn has_next(&self) -> bool {
        self.state.lock().await.list.has_next()
    }
}

impl<S> ListSync<S>
where
    S: PageSource,
    S::Item: Clone,
{
    /// Loaded items.
    pub async fn items(&self) -> Vec<S::Item> {
        self.state.lock().await.list.items().to_vec()
    }

    /// Copy of the whole list state.
    pub async fn snapshot(&self) -> ListSnapshot<S::Item> {
        let state = self.state.lock().await;
        ListSnapshot {
            items: state.list.items().to_vec(),
            phase: state.list.phase(),
            error: state.list.error().map(str::to_string),
            has_next: state.list.has_next(),
        }
    }
}

impl<S> ListSync<S>
where
    S: PageSource,
    S::Item: Bookmarkable,
{
    /// Bookmark state of one item.
    pub async fn bookmark_state(&self, item_id: &str) -> Option<BookmarkState> {
        self.state.lock().await.list.get(item_id).map(Bookmarkable::bookmark)
    }

    /// Flip an item's bookmark optimistically.
    ///
    /// The item changes at once; turning a bookmark on shows
    /// [`BookmarkId::PLACEHOLDER`] until the server answers. On failure the
    /// item returns to exactly the observed `currently_bookmarked` and
    /// `existing_id`.
    pub async fn toggle_bookmark<B: BookmarkBackend + ?Sized>(
        &self,
        backend: &B,
        item_id: &str,
        currently_bookmarked: bool,
        existing_id: Option<BookmarkId>,
    ) -> Result<BookmarkState, ToggleError> {
        let content_id: ContentId = item_id
            .parse()
            .map_err(|_| ToggleError::UnknownItem(item_id.to_string()))?;

        let toggle = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let Some(item) = state.list.get_mut(item_id) else {
                return Err(ToggleError::UnknownItem(item_id.to_string()));
            };
            if !state.toggles.try_begin(item_id) {
                return Err(ToggleError::InFlight(item_id.to_string()));
            }
            let toggle = PendingToggle::plan(currently_bookmarked, existing_id);
            item.set_bookmark(toggle.optimistic());
            toggle
        };

        let result = match toggle.command() {
            BookmarkCommand::Create => backend.create(content_id).await.map(Some),
            BookmarkCommand::Delete(id) => backend.delete(id).await.map(|()| None),
            BookmarkCommand::Skip => Ok(None),
        };

        let mut state = self.state.lock().await;
        state.toggles.finish(item_id);
        let settled = match &result {
            Ok(created) => toggle.confirm(*created),
            Err(e) => {
                tracing::warn!("Bookmark change for {} failed, rolling back: {}", item_id, e);
                toggle.rollback()
            }
        };
        if let Some(item) = state.list.get_mut(item_id) {
            item.set_bookmark(settled);
        }
        result.map(|_| settled).map_err(ToggleError::from)
    }
}
