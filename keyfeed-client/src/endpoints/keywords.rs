//! Notification keywords.

use keyfeed_types::dto::{Keyword, KeywordRequest};
use keyfeed_types::{ApiError, KeywordId};
use serde_json::Value;

use super::require_name;
use crate::api::{to_json, ApiClient, ApiRequest};
use crate::transport::HttpTransport;

impl<T: HttpTransport> ApiClient<T> {
    /// The user's keywords.
    pub async fn keywords(&self) -> Result<Vec<Keyword>, ApiError> {
        let keywords: Option<Vec<Keyword>> = self.request_data(ApiRequest::get("/keywords")).await?;
        Ok(keywords.unwrap_or_default())
    }

    /// Add a keyword.
    pub async fn add_keyword(&self, name: &str) -> Result<Keyword, ApiError> {
        let body = to_json(&KeywordRequest {
            name: require_name(name, "keyword")?,
        })?;
        self.request_data(ApiRequest::post("/keywords").json(body)).await
    }

    /// Remove a keyword.
    pub async fn delete_keyword(&self, keyword_id: KeywordId) -> Result<(), ApiError> {
        let path = format!("/keywords/{}", keyword_id);
        let _: Option<Value> = self.request_data(ApiRequest::delete(path)).await?;
        Ok(())
    }
}
