//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;

use super::{ByteStream, HttpRequest, HttpResponse, HttpTransport, Method, RequestBody, TransportError};

/// HTTP transport over reqwest with a cookie store (the refresh token lives
/// in an HTTP-only cookie).
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport. `request_timeout` applies to buffered requests,
    /// not to streams.
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(concat!("keyfeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        Ok(Self {
            client,
            request_timeout,
        })
    }

    fn build(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            RequestBody::None => builder,
            RequestBody::Json(value) => {
                let bytes = serde_json::to_vec(&value)
                    .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
                builder.body(bytes)
            }
            RequestBody::Text(text) => builder.body(text),
            RequestBody::Bytes(bytes) => builder.body(bytes),
        };
        Ok(builder)
    }
}

fn map_send_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::ConnectionFailed(err.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self
            .build(request)?
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

        Ok(HttpResponse {
            status,
            content_type,
            body: body.to_vec(),
        })
    }

    async fn open_stream(&self, request: HttpRequest) -> Result<ByteStream, TransportError> {
        let response = self.build(request)?.send().await.map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::StreamRejected {
                status: status.as_u16(),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| TransportError::ReceiveFailed(e.to_string()))
            })
            .boxed())
    }
}
