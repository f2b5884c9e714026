//! Client configuration.

use std::time::Duration;

use keyfeed_core::stream::DEFAULT_MAX_RECONNECT_DELAY;

/// Backend used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Feed and bookmark page size.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Notification history page size.
pub const DEFAULT_NOTIFICATION_PAGE_SIZE: u32 = 20;

/// Timeout for buffered requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`crate::ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base URL without trailing slash.
    pub base_url: String,
    /// Feed and bookmark page size.
    pub page_size: u32,
    /// Notification history page size.
    pub notification_page_size: u32,
    /// Cap on the live stream's exponential reconnect delay.
    pub stream_retry_max: Duration,
    /// Timeout for buffered requests.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Configuration for `base_url` with default sizes.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            page_size: DEFAULT_PAGE_SIZE,
            notification_page_size: DEFAULT_NOTIFICATION_PAGE_SIZE,
            stream_retry_max: DEFAULT_MAX_RECONNECT_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the feed and bookmark page size.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Set the notification history page size.
    pub fn with_notification_page_size(mut self, size: u32) -> Self {
        self.notification_page_size = size.max(1);
        self
    }

    /// Set the live stream's reconnect cap.
    pub fn with_stream_retry_max(mut self, max: Duration) -> Self {
        self.stream_retry_max = max;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Absolute URL for an API path such as `/feed`.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Trim whitespace and a single trailing slash.
fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim();
    let trimmed = if trimmed.is_empty() { DEFAULT_BASE_URL } else { trimmed };
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("https://api.keyfeed.app/api/");
        assert_eq!(config.base_url, "https://api.keyfeed.app/api");
        assert_eq!(config.url("/feed"), "https://api.keyfeed.app/api/feed");
        assert_eq!(config.url("feed"), "https://api.keyfeed.app/api/feed");
    }

    #[test]
    fn blank_base_url_uses_default() {
        assert_eq!(ClientConfig::new("  ").base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn builder_sets_fields() {
        let config = ClientConfig::default()
            .with_page_size(25)
            .with_notification_page_size(0)
            .with_stream_retry_max(Duration::from_secs(5));
        assert_eq!(config.page_size, 25);
        assert_eq!(config.notification_page_size, 1);
        assert_eq!(config.stream_retry_max, Duration::from_secs(5));
    }
}
