//! # keyfeed-types
//!
//! Wire format types for the KeyFeed REST and notification APIs.
//!
//! This crate provides the foundational types used across all KeyFeed crates:
//! - [`ContentId`], [`BookmarkId`], [`Cursor`], [`EventId`] and friends - identity and paging types
//! - [`dto`] - request and response bodies, wrapped in [`Envelope`] / [`CursorPage`]
//! - [`AuthSession`] - the signed-in session and its persistence scope
//! - [`ApiError`] - the tagged error every API operation returns
//! - [`json`] - lenient decoding that keeps large identifiers exact

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dto;
mod error;
mod ids;
pub mod json;
mod session;

pub use dto::{CursorPage, Envelope};
pub use error::{ApiError, ErrorKind, STATUS_SERVICE_UNAVAILABLE};
pub use ids::{
    BookmarkId, ContentId, Cursor, EventId, FolderId, KeywordId, SourceId, UserId, UserSourceId,
};
pub use session::{AccessToken, AuthSession, Persistence, StoredSession, UserProfile};
