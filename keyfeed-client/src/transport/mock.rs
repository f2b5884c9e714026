//! Mock transport for testing.
//!
//! Responses are queued per route (method plus URL path suffix) and every
//! request is captured for verification. Streams are fed from channels so a
//! test can push server-sent events while the client is running.

use super::{ByteStream, HttpRequest, HttpResponse, HttpTransport, Method, TransportError};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

type StreamItem = Result<Vec<u8>, TransportError>;

/// Mock transport for testing.
///
/// Cloning shares state, so a test keeps one handle and gives the other to
/// the client.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    routes: HashMap<(Method, String), VecDeque<HttpResponse>>,
    streams: HashMap<String, VecDeque<mpsc::UnboundedReceiver<StreamItem>>>,
    requests: Vec<HttpRequest>,
    fail_next_send: Option<TransportError>,
    fail_next_stream: Option<TransportError>,
}

/// Handle for pushing data into a mock stream.
#[derive(Debug, Clone)]
pub struct MockStream {
    tx: mpsc::UnboundedSender<StreamItem>,
}

impl MockStream {
    /// Push raw bytes.
    pub fn send_raw(&self, bytes: &[u8]) {
        let _ = self.tx.send(Ok(bytes.to_vec()));
    }

    /// Push one complete SSE frame.
    pub fn send_event(&self, event: Option<&str>, id: Option<&str>, data: &str) {
        let mut frame = String::new();
        if let Some(id) = id {
            frame.push_str(&format!("id: {}\n", id));
        }
        if let Some(event) = event {
            frame.push_str(&format!("event: {}\n", event));
        }
        for line in data.lines() {
            frame.push_str(&format!("data: {}\n", line));
        }
        frame.push('\n');
        self.send_raw(frame.as_bytes());
    }

    /// Make the stream fail.
    pub fn fail(&self, error: &str) {
        let _ = self.tx.send(Err(TransportError::ReceiveFailed(error.to_string())));
    }
}

/// Route key: the URL path without query, matched by suffix.
fn path_of(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    match without_query.find("://") {
        Some(scheme_end) => {
            let rest = &without_query[scheme_end + 3..];
            rest.find('/').map(|i| rest[i..].to_string()).unwrap_or_else(|| "/".into())
        }
        None => without_query.to_string(),
    }
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a response for `method` on URLs whose path ends with `path`.
    pub fn respond(&self, method: Method, path: &str, response: HttpResponse) {
        self.lock()
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Queue a JSON response.
    pub fn respond_json(&self, method: Method, path: &str, status: u16, body: Value) {
        self.respond(method, path, HttpResponse::json(status, &body));
    }

    /// Queue a `{status, message, data}` envelope with status 200.
    pub fn respond_data(&self, method: Method, path: &str, data: Value) {
        self.respond_json(
            method,
            path,
            200,
            json!({"status": 200, "message": "ok", "data": data}),
        );
    }

    /// Queue a stream for `path` and return the handle that feeds it.
    pub fn push_stream(&self, path: &str) -> MockStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock()
            .streams
            .entry(path.to_string())
            .or_default()
            .push_back(rx);
        MockStream { tx }
    }

    /// Cause the next `send()` to fail with the given error.
    pub fn fail_next_send(&self, error: TransportError) {
        self.lock().fail_next_send = Some(error);
    }

    /// Cause the next `open_stream()` to fail with the given error.
    pub fn fail_next_stream(&self, error: TransportError) {
        self.lock().fail_next_stream = Some(error);
    }

    /// All captured requests, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    /// Captured requests for one route.
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<HttpRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method && path_of(&r.url).ends_with(path))
            .cloned()
            .collect()
    }

    /// The last captured request.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.lock().requests.last().cloned()
    }

    /// Clear all state (responses, streams, captured requests).
    pub fn reset(&self) {
        *self.lock() = MockTransportInner::default();
    }

    fn take_response(inner: &mut MockTransportInner, method: Method, path: &str) -> Option<HttpResponse> {
        let key = inner
            .routes
            .iter()
            .filter(|((m, suffix), queue)| *m == method && path.ends_with(suffix.as_str()) && !queue.is_empty())
            .map(|(key, _)| key.clone())
            .max_by_key(|(_, suffix)| suffix.len())?;
        inner.routes.get_mut(&key).and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        // Let concurrent callers interleave like real I/O would.
        tokio::task::yield_now().await;

        let mut inner = self.lock();
        inner.requests.push(request.clone());

        if let Some(error) = inner.fail_next_send.take() {
            return Err(error);
        }

        let path = path_of(&request.url);
        match Self::take_response(&mut inner, request.method, &path) {
            Some(response) => Ok(response),
            None => Ok(HttpResponse::json(
                404,
                &json!({"message": format!("no mock response for {} {}", request.method, path)}),
            )),
        }
    }

    async fn open_stream(&self, request: HttpRequest) -> Result<ByteStream, TransportError> {
        let mut inner = self.lock();
        inner.requests.push(request.clone());

        if let Some(error) = inner.fail_next_stream.take() {
            return Err(error);
        }

        let path = path_of(&request.url);
        let rx = inner
            .streams
            .iter_mut()
            .filter(|(suffix, queue)| path.ends_with(suffix.as_str()) && !queue.is_empty())
            .max_by_key(|(suffix, _)| suffix.len())
            .and_then(|(_, queue)| queue.pop_front())
            .ok_or(TransportError::StreamRejected { status: 404 })?;

        Ok(futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed())
    }
}
