//! Display models built from API payloads.

use chrono::{DateTime, Utc};
use keyfeed_types::dto::{BookmarkEntry, FeedContent};
use keyfeed_types::{BookmarkId, ContentId, FolderId};

use crate::bookmark::{BookmarkState, Bookmarkable};
use crate::display::{is_recent, parse_timestamp, relative_time, source_tag};
use crate::loader::Keyed;

/// Thumbnail used when content has none.
pub const DEFAULT_THUMBNAIL: &str = "https://placehold.co/600x400?text=KeyFeed";

/// A feed entry ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// String form of the content id.
    pub id: String,
    /// Content id.
    pub content_id: ContentId,
    /// Headline.
    pub title: String,
    /// Short summary.
    pub summary: String,
    /// Link to the original article.
    pub link: String,
    /// Source name.
    pub source: String,
    /// Relative timestamp, e.g. `3h ago`.
    pub time_ago: String,
    /// `#SourceName`.
    pub tag: String,
    /// Thumbnail URL.
    pub thumbnail: String,
    /// Published within the last 24 hours.
    pub is_new: bool,
    /// Parsed publication time.
    pub published_at: Option<DateTime<Utc>>,
    /// Bookmark state.
    pub bookmark: BookmarkState,
}

impl FeedItem {
    /// Build from a feed payload, relative to `now`.
    pub fn from_content(content: FeedContent, now: DateTime<Utc>) -> Self {
        let published_at = content.published_at.as_deref().and_then(parse_timestamp);
        Self {
            id: content.content_id.to_string(),
            content_id: content.content_id,
            tag: source_tag(&content.source_name),
            time_ago: relative_time(published_at, now),
            is_new: is_recent(published_at, now),
            thumbnail: non_blank(content.thumbnail_url)
                .unwrap_or_else(|| DEFAULT_THUMBNAIL.to_string()),
            bookmark: BookmarkState {
                bookmarked: content.bookmarked || content.bookmark_id.is_some(),
                bookmark_id: content.bookmark_id,
            },
            title: content.title,
            summary: content.summary,
            link: content.original_url,
            source: content.source_name,
            published_at,
        }
    }
}

impl Keyed for FeedItem {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Bookmarkable for FeedItem {
    fn bookmark(&self) -> BookmarkState {
        self.bookmark
    }

    fn set_bookmark(&mut self, state: BookmarkState) {
        self.bookmark = state;
    }
}

/// An entry of the bookmark list.
///
/// Keyed by content id, like feed items, so the same toggle applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkedItem {
    /// String form of the content id.
    pub id: String,
    /// Content id.
    pub content_id: ContentId,
    /// Folder, `None` for the default folder.
    pub folder_id: Option<FolderId>,
    /// Folder name.
    pub folder_name: Option<String>,
    /// Headline; empty when the server sent no content summary.
    pub title: String,
    /// Source name.
    pub source: String,
    /// Link to the original article.
    pub link: String,
    /// Relative creation time of the bookmark.
    pub saved_ago: String,
    /// Bookmark state.
    pub bookmark: BookmarkState,
}

impl BookmarkedItem {
    /// Build from a bookmark entry, relative to `now`.
    pub fn from_entry(entry: BookmarkEntry, now: DateTime<Utc>) -> Self {
        let created_at = entry.created_at.as_deref().and_then(parse_timestamp);
        let (title, source, link) = match entry.content {
            Some(c) => (c.title, c.source_name, c.original_url),
            None => Default::default(),
        };
        Self {
            id: entry.content_id.to_string(),
            content_id: entry.content_id,
            folder_id: entry.folder_id,
            folder_name: entry.folder_name,
            title,
            source,
            link,
            saved_ago: relative_time(created_at, now),
            bookmark: BookmarkState::saved(entry.bookmark_id),
        }
    }

    /// Server bookmark id, when the item is still bookmarked.
    pub fn bookmark_id(&self) -> Option<BookmarkId> {
        self.bookmark.bookmark_id
    }
}

impl Keyed for BookmarkedItem {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Bookmarkable for BookmarkedItem {
    fn bookmark(&self) -> BookmarkState {
        self.bookmark
    }

    fn set_bookmark(&mut self, state: BookmarkState) {
        self.bookmark = state;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
