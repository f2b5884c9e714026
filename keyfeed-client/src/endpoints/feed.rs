//! The personalised feed.

use keyfeed_types::dto::FeedContent;
use keyfeed_types::{ApiError, Cursor, CursorPage};

use crate::api::{ApiClient, ApiRequest};
use crate::transport::HttpTransport;

impl<T: HttpTransport> ApiClient<T> {
    /// One page of the feed, starting after `last_id`.
    pub async fn feed_page(
        &self,
        last_id: Option<Cursor>,
    ) -> Result<CursorPage<FeedContent, Cursor>, ApiError> {
        let request = ApiRequest::get("/feed")
            .query("size", self.config().page_size)
            .query_opt("lastId", last_id);
        self.request_data(request).await
    }
}
