//! Sources the user follows.

use keyfeed_types::dto::{CreateSourceRequest, Source};
use keyfeed_types::{ApiError, UserSourceId};
use serde_json::Value;

use super::{require_http_url, require_name};
use crate::api::{to_json, ApiClient, ApiRequest};
use crate::transport::HttpTransport;

impl<T: HttpTransport> ApiClient<T> {
    /// Follow a new source.
    pub async fn add_source(&self, name: &str, url: &str) -> Result<Source, ApiError> {
        let body = to_json(&CreateSourceRequest {
            name: require_name(name, "source name")?,
            url: require_http_url(url)?,
        })?;
        self.request_data(ApiRequest::post("/sources").json(body)).await
    }

    /// Sources the user follows.
    pub async fn my_sources(&self) -> Result<Vec<Source>, ApiError> {
        let sources: Option<Vec<Source>> = self.request_data(ApiRequest::get("/sources/my")).await?;
        Ok(sources.unwrap_or_default())
    }

    /// Search the user's sources by name.
    pub async fn search_my_sources(&self, keyword: &str) -> Result<Vec<Source>, ApiError> {
        let request = ApiRequest::get("/sources/my/search").query("keyword", keyword.trim());
        let sources: Option<Vec<Source>> = self.request_data(request).await?;
        Ok(sources.unwrap_or_default())
    }

    /// Stop following a source.
    pub async fn delete_source(&self, user_source_id: UserSourceId) -> Result<(), ApiError> {
        let path = format!("/sources/my/{}", user_source_id);
        let _: Option<Value> = self.request_data(ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Flip whether a source contributes to the feed; returns the updated source.
    pub async fn toggle_receive_feed(&self, user_source_id: UserSourceId) -> Result<Source, ApiError> {
        let path = format!("/sources/my/{}/receive-feed", user_source_id);
        self.request_data(ApiRequest::patch(path)).await
    }
}

#[cfg(test)]
mod tests {
    use crate::endpoints::test_support::signed_in_client;
    use crate::transport::{Method, MockTransport, RequestBody};
    use keyfeed_types::{ApiError, UserSourceId};
    use serde_json::json;

    fn source(receive: bool) -> serde_json::Value {
        json!({
            "sourceId": 1,
            "userSourceId": 10,
            "userDefinedName": "Rust Blog",
            "url": "https://blog.rust-lang.org/feed.xml",
            "receiveFeed": receive
        })
    }

    #[tokio::test]
    async fn add_source_validates_url_first() {
        let transport = MockTransport::new();
        let client = signed_in_client(&transport);

        let err = client.add_source("Rust Blog", "blog.rust-lang.org").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let err = client.add_source("", "https://blog.rust-lang.org").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn add_source_posts_body() {
        let transport = MockTransport::new();
        transport.respond_data(Method::Post, "/sources", source(true));
        let client = signed_in_client(&transport);

        let created = client
            .add_source("Rust Blog", " https://blog.rust-lang.org/feed.xml ")
            .await
            .unwrap();
        assert_eq!(created.user_source_id, UserSourceId::new(10));
        assert_eq!(
            transport.last_request().unwrap().body,
            RequestBody::Json(json!({"name": "Rust Blog", "url": "https://blog.rust-lang.org/feed.xml"}))
        );
    }

    #[tokio::test]
    async fn list_search_toggle_delete() {
        let transport = MockTransport::new();
        transport.respond_data(Method::Get, "/sources/my", json!([source(true)]));
        transport.respond_data(Method::Get, "/sources/my/search", json!([]));
        transport.respond_data(Method::Patch, "/sources/my/10/receive-feed", source(false));
        transport.respond_data(Method::Delete, "/sources/my/10", json!(null));
        let client = signed_in_client(&transport);

        assert_eq!(client.my_sources().await.unwrap().len(), 1);
        assert!(client.search_my_sources("rust").await.unwrap().is_empty());
        assert_eq!(
            transport.last_request().unwrap().url,
            "http://test/api/sources/my/search?keyword=rust"
        );

        let toggled = client.toggle_receive_feed(UserSourceId::new(10)).await.unwrap();
        assert!(!toggled.receive_feed);
        client.delete_source(UserSourceId::new(10)).await.unwrap();
    }
}
