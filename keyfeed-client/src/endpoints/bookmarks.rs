//! Bookmarks and bookmark folders.

use keyfeed_types::dto::{
    BookmarkEntry, BookmarkFolder, CreateBookmarkRequest, CreateFolderRequest, MoveBookmarkRequest,
};
use keyfeed_types::{ApiError, BookmarkId, ContentId, Cursor, CursorPage, FolderId};
use serde_json::Value;

use super::require_name;
use crate::api::{to_json, ApiClient, ApiRequest};
use crate::transport::HttpTransport;

impl<T: HttpTransport> ApiClient<T> {
    /// All bookmark folders.
    pub async fn folders(&self) -> Result<Vec<BookmarkFolder>, ApiError> {
        let folders: Option<Vec<BookmarkFolder>> =
            self.request_data(ApiRequest::get("/bookmarks/folders")).await?;
        Ok(folders.unwrap_or_default())
    }

    /// Create a folder.
    pub async fn create_folder(&self, request: CreateFolderRequest) -> Result<BookmarkFolder, ApiError> {
        let request = CreateFolderRequest {
            name: require_name(&request.name, "folder name")?,
            ..request
        };
        self.request_data(ApiRequest::post("/bookmarks/folders").json(to_json(&request)?))
            .await
    }

    /// Delete a folder.
    pub async fn delete_folder(&self, folder_id: FolderId) -> Result<(), ApiError> {
        let path = format!("/bookmarks/folders/{}", folder_id);
        let _: Option<Value> = self.request_data(ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Bookmark a piece of content, returning the new bookmark id.
    pub async fn create_bookmark(&self, content_id: ContentId) -> Result<BookmarkId, ApiError> {
        let body = to_json(&CreateBookmarkRequest { content_id })?;
        self.request_data(ApiRequest::post("/bookmarks").json(body)).await
    }

    /// Remove a bookmark.
    pub async fn delete_bookmark(&self, bookmark_id: BookmarkId) -> Result<(), ApiError> {
        let path = format!("/bookmarks/{}", bookmark_id);
        let _: Option<Value> = self.request_data(ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Move a bookmark into another folder.
    pub async fn move_bookmark(&self, bookmark_id: BookmarkId, folder_id: FolderId) -> Result<(), ApiError> {
        let path = format!("/bookmarks/{}/folder", bookmark_id);
        let body = to_json(&MoveBookmarkRequest { folder_id })?;
        let _: Option<Value> = self.request_data(ApiRequest::patch(path).json(body)).await?;
        Ok(())
    }

    /// One page of bookmarks, optionally limited to one folder.
    pub async fn bookmark_page(
        &self,
        folder_id: Option<FolderId>,
        last_id: Option<Cursor>,
    ) -> Result<CursorPage<BookmarkEntry, Cursor>, ApiError> {
        let request = ApiRequest::get("/bookmarks")
            .query_opt("folderId", folder_id)
            .query_opt("lastId", last_id);
        self.request_data(request).await
    }
}
