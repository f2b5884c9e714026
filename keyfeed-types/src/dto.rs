//! Request and response bodies of the KeyFeed REST API.
//!
//! Field names follow the backend's camelCase JSON. Every response is wrapped
//! in an [`Envelope`]; list endpoints put a [`CursorPage`] inside it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    BookmarkId, ContentId, EventId, FolderId, KeywordId, SourceId, UserId, UserSourceId,
};

/// Standard response wrapper: `{status, message, data}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope<T> {
    /// Application status code echoed by the server.
    #[serde(default)]
    pub status: Option<u16>,
    /// Human-readable status message.
    #[serde(default)]
    pub message: Option<String>,
    /// The payload.
    pub data: T,
}

/// One page of a cursor-paginated list: `{content, nextCursorId, hasNext}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: DeserializeOwned, C: DeserializeOwned"))]
pub struct CursorPage<T, C> {
    /// Items on this page, in server order.
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    /// Cursor to request the next page with.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub next_cursor_id: Option<C>,
    /// Whether another page exists. Some endpoints omit it.
    #[serde(default)]
    pub has_next: Option<bool>,
}

impl<T, C> CursorPage<T, C> {
    /// Whether another page exists.
    ///
    /// When the server omits `hasNext`, the presence of a cursor decides.
    pub fn has_next(&self) -> bool {
        self.has_next.unwrap_or(self.next_cursor_id.is_some())
    }
}

/// Treat `null`, a missing value and a blank string as `None`.
fn blank_as_none<'de, D, C>(deserializer: D) -> Result<Option<C>, D::Error>
where
    D: Deserializer<'de>,
    C: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => C::deserialize(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

// ===========================================
// Feed
// ===========================================

/// A piece of content in the personalised feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedContent {
    /// Content id.
    pub content_id: ContentId,
    /// Headline.
    pub title: String,
    /// Short summary.
    #[serde(default)]
    pub summary: String,
    /// Name of the source the content was crawled from.
    #[serde(default)]
    pub source_name: String,
    /// Link to the original article.
    #[serde(default)]
    pub original_url: String,
    /// Thumbnail image, if any.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Publication timestamp (ISO 8601).
    #[serde(default)]
    pub published_at: Option<String>,
    /// Whether the current user bookmarked this content.
    #[serde(default)]
    pub bookmarked: bool,
    /// The bookmark id, when bookmarked.
    #[serde(default)]
    pub bookmark_id: Option<BookmarkId>,
}

// ===========================================
// Bookmarks
// ===========================================

/// Icons a bookmark folder can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FolderIcon {
    /// Closed folder.
    Folder,
    /// Star.
    Star,
    /// Clock.
    Clock,
    /// Heart.
    Heart,
    /// Bookmark ribbon.
    Bookmark,
    /// Tag.
    Tag,
    /// Archive box.
    Archive,
    /// Open folder.
    FolderOpen,
}

impl FolderIcon {
    /// All icons in picker order.
    pub const ALL: [FolderIcon; 8] = [
        FolderIcon::Folder,
        FolderIcon::Star,
        FolderIcon::Clock,
        FolderIcon::Heart,
        FolderIcon::Bookmark,
        FolderIcon::Tag,
        FolderIcon::Archive,
        FolderIcon::FolderOpen,
    ];

    /// The wire name, e.g. `folder-open`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FolderIcon::Folder => "folder",
            FolderIcon::Star => "star",
            FolderIcon::Clock => "clock",
            FolderIcon::Heart => "heart",
            FolderIcon::Bookmark => "bookmark",
            FolderIcon::Tag => "tag",
            FolderIcon::Archive => "archive",
            FolderIcon::FolderOpen => "folder-open",
        }
    }

    /// Parse a wire name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|icon| icon.as_str() == name)
    }
}

/// Colours a bookmark folder can use.
pub const FOLDER_COLORS: [&str; 8] = [
    "#2b7fff", "#ad46ff", "#00c950", "#fb2c36", "#ff6900", "#f6339a", "#f0b100", "#6a7282",
];

/// A bookmark folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkFolder {
    /// Folder id.
    pub folder_id: FolderId,
    /// Display name.
    pub name: String,
    /// Icon name; unknown names from newer servers are kept as-is.
    #[serde(default)]
    pub icon: Option<String>,
    /// Colour as `#rrggbb`.
    #[serde(default)]
    pub color: Option<String>,
}

/// Body of `POST /bookmarks/folders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    /// Display name.
    pub name: String,
    /// Icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<FolderIcon>,
    /// Colour from [`FOLDER_COLORS`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Content embedded in a bookmark entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    /// Content id.
    pub content_id: ContentId,
    /// Headline.
    pub title: String,
    /// Short summary.
    #[serde(default)]
    pub summary: String,
    /// Source name.
    #[serde(default)]
    pub source_name: String,
    /// Link to the original article.
    #[serde(default)]
    pub original_url: String,
    /// Thumbnail image, if any.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Publication timestamp (ISO 8601).
    #[serde(default)]
    pub published_at: Option<String>,
}

/// A saved bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkEntry {
    /// Bookmark id.
    pub bookmark_id: BookmarkId,
    /// Folder the bookmark lives in; `None` for the default folder.
    #[serde(default)]
    pub folder_id: Option<FolderId>,
    /// Folder name.
    #[serde(default)]
    pub folder_name: Option<String>,
    /// Bookmarked content id.
    pub content_id: ContentId,
    /// Bookmarked content, when the server includes it.
    #[serde(default)]
    pub content: Option<ContentSummary>,
    /// When the bookmark was created (ISO 8601).
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST /bookmarks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookmarkRequest {
    /// Content to bookmark.
    pub content_id: ContentId,
}

/// Body of `PATCH /bookmarks/{id}/folder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBookmarkRequest {
    /// Destination folder.
    pub folder_id: FolderId,
}

// ===========================================
// Keywords and sources
// ===========================================

/// A notification keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyword {
    /// Keyword id.
    pub keyword_id: KeywordId,
    /// The keyword text.
    pub name: String,
    /// Whether matches trigger notifications.
    #[serde(default)]
    pub is_notification_enabled: bool,
}

/// Body of `POST /keywords`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordRequest {
    /// The keyword text.
    pub name: String,
}

/// A source the current user follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Crawled source id.
    pub source_id: SourceId,
    /// Id of the user's subscription to the source.
    pub user_source_id: UserSourceId,
    /// Name the user gave the source.
    pub user_defined_name: String,
    /// Source URL.
    pub url: String,
    /// Last crawl time (ISO 8601).
    #[serde(default)]
    pub last_crawled_at: Option<String>,
    /// Whether the source contributes to the user's feed.
    #[serde(default)]
    pub receive_feed: bool,
}

/// Body of `POST /sources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateSourceRequest {
    /// Display name.
    pub name: String,
    /// Feed or site URL.
    pub url: String,
}

// ===========================================
// Authentication and account
// ===========================================

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Keep the session beyond this process.
    pub stay_signed_in: bool,
}

/// `data` of a successful login.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponseData {
    /// User id.
    pub id: UserId,
    /// Account email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Account role.
    #[serde(default)]
    pub role: String,
    /// Bearer token for subsequent requests.
    pub access_token: String,
}

impl std::fmt::Debug for LoginResponseData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponseData")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /auth/join`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Marketing consent.
    pub marketing_opt_in: bool,
}

/// Social login providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    /// Kakao.
    Kakao,
    /// Naver.
    Naver,
    /// Google.
    Google,
}

impl SocialProvider {
    /// Path segment used by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            SocialProvider::Kakao => "kakao",
            SocialProvider::Naver => "naver",
            SocialProvider::Google => "google",
        }
    }
}

/// Response of `POST /auth/{provider}/login`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SocialLoginUrl {
    /// Where to send the user to authenticate.
    pub url: String,
}

/// Body of `POST /auth/email-verification/request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationRequest {
    /// Email to verify.
    pub email: String,
}

/// Body of `POST /auth/email-verification/confirm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationConfirm {
    /// Email being verified.
    pub email: String,
    /// Code received by email.
    pub code: String,
}

/// Result of the email verification endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VerificationResult {
    /// Whether the step succeeded.
    #[serde(default)]
    pub success: bool,
}

/// Body of `PATCH /users/password`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequest {
    /// Current password.
    pub current_password: String,
    /// New password.
    pub new_password: String,
    /// New password, typed again.
    pub confirm_password: String,
}

impl std::fmt::Debug for PasswordChangeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordChangeRequest { .. }")
    }
}

/// Body of `DELETE /users`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct DeleteAccountRequest {
    /// Current password.
    pub password: String,
}

// ===========================================
// Notifications
// ===========================================

/// A notification, either from history or the live stream.
///
/// All fields are optional on the wire; see the mapping in `keyfeed-core`
/// for the fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    /// Notification id.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub id: Option<EventId>,
    /// Recipient.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Matched content.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub content_id: Option<EventId>,
    /// Title.
    #[serde(default)]
    pub title: Option<String>,
    /// Short message.
    #[serde(default)]
    pub message: Option<String>,
    /// Longer body.
    #[serde(default)]
    pub content: Option<String>,
    /// Keyword that matched.
    #[serde(default)]
    pub keyword: Option<String>,
    /// Link to the matched content.
    #[serde(default)]
    pub original_url: Option<String>,
    /// Creation timestamp (ISO 8601).
    #[serde(default)]
    pub created_at: Option<String>,
    /// Read flag.
    #[serde(default)]
    pub read: Option<bool>,
    /// Notification type, e.g. `KEYWORD_MATCH` or `SYSTEM`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{json, Cursor};

    #[test]
    fn feed_page_decodes_envelope() {
        let body = r#"{
            "status": 200,
            "message": "ok",
            "data": {
                "content": [{
                    "contentId": 12345678901234567,
                    "title": "Rust 2.0",
                    "summary": "s",
                    "sourceName": "Tech Daily",
                    "originalUrl": "https://example.com/a",
                    "thumbnailUrl": null,
                    "publishedAt": "2026-10-16T10:00:00Z",
                    "bookmarked": false
                }],
                "nextCursorId": 117,
                "hasNext": true
            }
        }"#;
        let env: Envelope<CursorPage<FeedContent, Cursor>> = json::from_str_lenient(body).unwrap();
        assert_eq!(env.data.content.len(), 1);
        assert_eq!(env.data.content[0].content_id.value(), 12_345_678_901_234_567);
        assert_eq!(env.data.next_cursor_id, Some(Cursor::new(117)));
        assert!(env.data.has_next());
    }

    #[test]
    fn missing_has_next_falls_back_to_cursor_presence() {
        let page: CursorPage<NotificationDto, EventId> =
            serde_json::from_str(r#"{"content": [], "nextCursorId": "abc"}"#).unwrap();
        assert!(page.has_next());

        let page: CursorPage<NotificationDto, EventId> =
            serde_json::from_str(r#"{"content": [], "nextCursorId": "  "}"#).unwrap();
        assert_eq!(page.next_cursor_id, None);
        assert!(!page.has_next());
    }

    #[test]
    fn notification_accepts_numeric_and_string_ids() {
        let a: NotificationDto =
            serde_json::from_str(r#"{"id": 9, "title": "t", "message": "m"}"#).unwrap();
        let b: NotificationDto =
            serde_json::from_str(r#"{"id": "9", "type": "SYSTEM"}"#).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.kind.as_deref(), Some("SYSTEM"));
    }

    #[test]
    fn folder_icon_wire_names() {
        assert_eq!(
            serde_json::to_string(&FolderIcon::FolderOpen).unwrap(),
            "\"folder-open\""
        );
        assert_eq!(FolderIcon::parse("heart"), Some(FolderIcon::Heart));
        assert_eq!(FolderIcon::parse("rocket"), None);
    }

    #[test]
    fn login_request_uses_camel_case() {
        let body = serde_json::to_value(LoginRequest {
            email: "a@b.c".into(),
            password: "pw".into(),
            stay_signed_in: true,
        })
        .unwrap();
        assert_eq!(body["staySignedIn"], true);
    }

    #[test]
    fn login_response_debug_redacts_token() {
        let data: LoginResponseData = serde_json::from_str(
            r#"{"id":1,"email":"a@b.c","name":"A","role":"USER","accessToken":"secret-token"}"#,
        )
        .unwrap();
        let debug = format!("{:?}", data);
        assert!(!debug.contains("secret-token"));
    }
}
