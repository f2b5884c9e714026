//! Error types for KeyFeed.

use thiserror::Error;

/// HTTP status the backend uses when it is overloaded or under maintenance.
pub const STATUS_SERVICE_UNAVAILABLE: u16 = 503;

/// Errors surfaced by KeyFeed API operations.
///
/// Constructed once at the HTTP boundary so callers can match on the variant
/// instead of inspecting status codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),

    /// Authentication failed even after a token refresh.
    #[error("{message}")]
    Unauthorized {
        /// Server-provided or generated message.
        message: String,
    },

    /// The backend is overloaded or under maintenance.
    #[error("{message}")]
    ServiceUnavailable {
        /// Server-provided or generated message.
        message: String,
    },

    /// Input was rejected, either locally or by the server.
    #[error("{0}")]
    Validation(String),

    /// Any other non-success HTTP status.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-provided or generated message.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The live notification channel is degraded.
    #[error("live connection error: {0}")]
    Stream(String),

    /// The local session or marker could not be persisted.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Discriminant of [`ApiError`] for callers that only need the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`ApiError::Network`].
    Network,
    /// See [`ApiError::Unauthorized`].
    Unauthorized,
    /// See [`ApiError::ServiceUnavailable`].
    ServiceUnavailable,
    /// See [`ApiError::Validation`].
    Validation,
    /// See [`ApiError::Status`].
    Status,
    /// See [`ApiError::Decode`].
    Decode,
    /// See [`ApiError::Stream`].
    Stream,
    /// See [`ApiError::Storage`].
    Storage,
}

impl ApiError {
    /// Build the error for a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::Unauthorized { message },
            STATUS_SERVICE_UNAVAILABLE => Self::ServiceUnavailable { message },
            400 | 422 => Self::Validation(message),
            _ => Self::Status { status, message },
        }
    }

    /// The error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Status { .. } => ErrorKind::Status,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Stream(_) => ErrorKind::Stream,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// The HTTP status this error was built from, if any.
    ///
    /// Validation errors raised locally carry no status.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::ServiceUnavailable { .. } => Some(STATUS_SERVICE_UNAVAILABLE),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying the same request later can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::ServiceUnavailable { .. } | Self::Stream(_)
        ) || matches!(self, Self::Status { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_to_variants() {
        assert_eq!(
            ApiError::from_status(401, "expired").kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            ApiError::from_status(503, "busy").kind(),
            ErrorKind::ServiceUnavailable
        );
        assert_eq!(ApiError::from_status(422, "bad").kind(), ErrorKind::Validation);
        assert_eq!(
            ApiError::from_status(404, "missing"),
            ApiError::Status {
                status: 404,
                message: "missing".into()
            }
        );
    }

    #[test]
    fn status_accessor() {
        assert_eq!(ApiError::from_status(503, "x").status(), Some(503));
        assert_eq!(ApiError::Validation("empty name".into()).status(), None);
        assert_eq!(ApiError::Network("reset".into()).status(), None);
    }

    #[test]
    fn error_display_uses_message() {
        let err = ApiError::from_status(409, "keyword already exists");
        assert_eq!(err.to_string(), "keyword already exists");
    }

    #[test]
    fn retryable_classification() {
        assert!(ApiError::Network("timeout".into()).is_retryable());
        assert!(ApiError::from_status(502, "bad gateway").is_retryable());
        assert!(!ApiError::from_status(404, "gone").is_retryable());
        assert!(!ApiError::Validation("x".into()).is_retryable());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiError>();
    }
}
