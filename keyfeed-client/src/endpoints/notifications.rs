//! Notification history.

use keyfeed_types::dto::NotificationDto;
use keyfeed_types::{ApiError, CursorPage, EventId};

use crate::api::{ApiClient, ApiRequest};
use crate::transport::HttpTransport;

/// Path of the live notification stream.
pub const SUBSCRIBE_PATH: &str = "/notifications/subscribe";

impl<T: HttpTransport> ApiClient<T> {
    /// One page of notification history, newest first.
    pub async fn notification_page(
        &self,
        last_id: Option<&EventId>,
    ) -> Result<CursorPage<NotificationDto, EventId>, ApiError> {
        let request = ApiRequest::get("/notifications")
            .query("size", self.config().notification_page_size)
            .query_opt("lastId", last_id);
        self.request_data(request).await
    }
}
