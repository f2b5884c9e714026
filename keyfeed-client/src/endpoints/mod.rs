//! Typed wrappers over the KeyFeed REST endpoints.
//!
//! Each submodule adds methods to [`ApiClient`](crate::ApiClient) for one
//! area of the API. Input that the server would reject anyway is checked
//! here first so obviously bad calls never leave the process.

mod auth;
mod bookmarks;
mod feed;
mod keywords;
mod notifications;
mod sources;
mod users;

pub use notifications::SUBSCRIBE_PATH;

use keyfeed_types::ApiError;

/// Trimmed `value`, or a validation error naming `what`.
pub(crate) fn require_name(value: &str, what: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ApiError::Validation(format!("{} must not be empty", what)))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trimmed `url` if it uses an `http` or `https` scheme.
pub(crate) fn require_http_url(url: &str) -> Result<String, ApiError> {
    let trimmed = url.trim();
    let has_scheme = ["http://", "https://"].iter().any(|scheme| {
        trimmed.len() > scheme.len() && trimmed[..scheme.len()].eq_ignore_ascii_case(scheme)
    });
    if has_scheme {
        Ok(trimmed.to_string())
    } else {
        Err(ApiError::Validation(
            "source URL must start with http:// or https://".into(),
        ))
    }
}
