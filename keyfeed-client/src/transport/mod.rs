//! Transport abstraction for KeyFeed.
//!
//! This module provides a pluggable HTTP layer so the API client can run
//! against the real backend (reqwest) or a scripted mock in tests.
//!
//! # Design
//!
//! The transport is deliberately dumb:
//! - `send()` performs one request and returns status, content type and body
//! - `open_stream()` opens a long-lived response and yields its body chunks
//!
//! Authentication, retries, body decoding and error mapping all live in
//! [`crate::api::ApiClient`].
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.respond_json(Method::Get, "/feed", 200, json!({"data": {"content": []}}));
//! let response = transport.send(HttpRequest::new(Method::Get, "http://x/api/feed")).await?;
//! ```

mod http;
mod mock;

pub use http::ReqwestTransport;
pub use mock::{MockStream, MockTransport};

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be sent or no response arrived.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The server refused to open a stream.
    #[error("stream rejected with status {status}")]
    StreamRejected {
        /// HTTP status of the refusal.
        status: u16,
    },

    /// Reading a response body failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// The transport could not be set up.
    #[error("transport setup failed: {0}")]
    Setup(String),
}

/// HTTP methods used by the KeyFeed API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// Serialized as JSON with `Content-Type: application/json`.
    Json(Value),
    /// Sent as-is.
    Text(String),
    /// Sent as-is.
    Bytes(Vec<u8>),
}

/// A fully resolved request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL including the query string.
    pub url: String,
    /// Headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// Body.
    pub body: RequestBody,
}

impl HttpRequest {
    /// A request without headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::None,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the header is present.
    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Set a header, replacing any existing value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }
}

/// A buffered response.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status.
    pub status: u16,
    /// `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A JSON response.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".into()),
            body: body.to_string().into_bytes(),
        }
    }

    /// A JSON response from raw text (e.g. with integers serde_json would
    /// not produce).
    pub fn raw_json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Some("application/json".into()),
            body: body.into().into_bytes(),
        }
    }

    /// A plain text response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Some("text/plain".into()),
            body: body.into().into_bytes(),
        }
    }

    /// A response without body.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: Vec::new(),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as (lossy) UTF-8.
    pub fn text_body(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("body", &format!("[{} bytes]", self.body.len()))
            .finish()
    }
}

/// Body chunks of an open stream.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// Transport trait for the KeyFeed HTTP API.
///
/// Implementations handle the underlying connection mechanism
/// (reqwest, mock, etc).
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    /// Perform one request and buffer the response.
    ///
    /// Non-success statuses are responses, not errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Open a streaming response (server-sent events).
    ///
    /// Fails with [`TransportError::StreamRejected`] on a non-success status.
    async fn open_stream(&self, request: HttpRequest) -> Result<ByteStream, TransportError>;
}
