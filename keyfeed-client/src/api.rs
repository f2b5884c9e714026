//! ApiClient - the HTTP request wrapper every endpoint goes through.
//!
//! # Architecture
//!
//! ```text
//! endpoints / ListSync / NotificationSync → ApiClient → HttpTransport → Network
//!                                              ↓
//!                                        SessionStore (token, refresh)
//! ```
//!
//! The client attaches the bearer token, serializes bodies, decodes
//! responses leniently (large integers stay exact) and turns failures into
//! [`ApiError`]. A 401 triggers one token refresh and one retry. Refreshes
//! are single-flight: callers queue on a gate, and a caller whose request
//! went out before a refresh round finished takes that round's outcome
//! instead of starting another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use keyfeed_types::{json, AccessToken, ApiError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::ClientConfig;
use crate::session::SessionStore;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, RequestBody};

/// Path of the token refresh endpoint.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// A request relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: RequestBody,
}

impl ApiRequest {
    /// A request for `path` (e.g. `/feed`).
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::None,
        }
    }

    /// GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// PATCH request.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    /// DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a query parameter when present.
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Set a header. An explicit `Authorization` header disables the
    /// session token and the refresh retry for this request.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Raw text body, sent untouched.
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = RequestBody::Text(body.into());
        self
    }

    /// Raw byte body, sent untouched.
    pub fn bytes(mut self, body: Vec<u8>) -> Self {
        self.body = RequestBody::Bytes(body);
        self
    }

    /// Method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Path relative to the base URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn has_explicit_auth(&self) -> bool {
        self.headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("authorization"))
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// 204 or an empty body.
    Empty,
    /// Parsed JSON.
    Json(Value),
    /// A non-JSON body.
    Text(String),
}

impl ResponseBody {
    /// The body as a JSON value (`null` when empty, a string for text).
    pub fn into_value(self) -> Value {
        match self {
            ResponseBody::Empty => Value::Null,
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
        }
    }
}

/// Serialize a request body.
pub fn to_json<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Decode(format!("cannot encode request: {}", e)))
}

/// Serializes token refreshes and remembers how the latest round ended.
#[derive(Debug, Default)]
struct RefreshGate {
    /// Completed refresh rounds.
    round: AtomicU64,
    /// Whether the latest round produced a token. Locked for the whole round.
    last_ok: Mutex<bool>,
}

/// HTTP client for the KeyFeed API.
///
/// Cheap to clone; clones share the transport, session and refresh gate.
pub struct ApiClient<T: HttpTransport> {
    transport: Arc<T>,
    config: Arc<ClientConfig>,
    session: SessionStore,
    refresh_gate: Arc<RefreshGate>,
}

impl<T: HttpTransport> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
            session: self.session.clone(),
            refresh_gate: Arc::clone(&self.refresh_gate),
        }
    }
}

impl<T: HttpTransport> std::fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("session", &self.session)
            .finish()
    }
}

impl<T: HttpTransport> ApiClient<T> {
    /// Create a client.
    pub fn new(config: ClientConfig, transport: T, session: SessionStore) -> Self {
        Self {
            transport: Arc::new(transport),
            config: Arc::new(config),
            session,
            refresh_gate: Arc::new(RefreshGate::default()),
        }
    }

    /// Configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Session store.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Perform a request and return the whole decoded body.
    pub async fn request<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ApiError> {
        let body = self.execute(request).await?;
        decode(body.into_value())
    }

    /// Perform a request and return the envelope's `data`.
    ///
    /// Bodies without a `data` field are decoded whole.
    pub async fn request_data<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ApiError> {
        let value = match self.execute(request).await?.into_value() {
            Value::Object(mut map) => match map.remove("data") {
                Some(data) => data,
                None => Value::Object(map),
            },
            other => other,
        };
        decode(value)
    }

    /// Perform a request, refreshing the token once on 401.
    pub async fn execute(&self, request: ApiRequest) -> Result<ResponseBody, ApiError> {
        let explicit_auth = request.has_explicit_auth();
        let round = self.refresh_round();
        let token = if explicit_auth {
            None
        } else {
            self.session.token()
        };

        let response = self.send_once(&request, token.as_ref()).await?;

        if response.status == 401 && !explicit_auth {
            if let Some(stale) = token {
                if self.refresh_after(&stale, round).await {
                    let fresh = self.session.token();
                    let retried = self.send_once(&request, fresh.as_ref()).await?;
                    return finish(retried);
                }
            } else {
                tracing::debug!("401 without a session, not refreshing");
            }
        }

        finish(response)
    }

    /// Refresh the access token now (single-flight with automatic refreshes).
    pub async fn refresh_session(&self) -> Result<AccessToken, ApiError> {
        let mut last_ok = self.refresh_gate.last_ok.lock().await;
        let result = self.refresh_locked().await;
        *last_ok = result.is_ok();
        self.refresh_gate.round.fetch_add(1, Ordering::AcqRel);
        result
    }

    /// Completed refresh rounds; read before sending a request that may 401.
    pub(crate) fn refresh_round(&self) -> u64 {
        self.refresh_gate.round.load(Ordering::Acquire)
    }

    /// Refresh after a 401 on a request sent with `stale` during `round`.
    ///
    /// A round that finished after the request went out is not repeated; its
    /// outcome, success or failure, is shared. Returns whether a usable new
    /// token is in place.
    pub(crate) async fn refresh_after(&self, stale: &AccessToken, round: u64) -> bool {
        let mut last_ok = self.refresh_gate.last_ok.lock().await;
        if self.refresh_round() != round {
            tracing::debug!("Sharing the outcome of a concurrent refresh");
            return *last_ok && self.session.token().is_some();
        }
        match self.session.token() {
            None => false,
            Some(current) if current != *stale => {
                tracing::debug!("Token already replaced, retrying without refresh");
                true
            }
            Some(_) => {
                let ok = self.refresh_locked().await.is_ok();
                *last_ok = ok;
                self.refresh_gate.round.fetch_add(1, Ordering::AcqRel);
                ok
            }
        }
    }

    async fn refresh_locked(&self) -> Result<AccessToken, ApiError> {
        if self.session.current().is_none() {
            return Err(ApiError::Unauthorized {
                message: "not signed in".into(),
            });
        }

        tracing::debug!("Refreshing access token");
        let request = HttpRequest::new(Method::Post, self.config.url(REFRESH_PATH));
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                return Err(ApiError::Network(e.to_string()));
            }
        };

        if !response.is_success() {
            tracing::warn!("Token refresh rejected with status {}", response.status);
            if response.status == 401 || response.status == 403 {
                self.session.clear()?;
            }
            return Err(error_from_response(&response));
        }

        let Some(token) = extract_access_token(&response) else {
            tracing::warn!("Refresh response carried no access token");
            self.session.clear()?;
            return Err(ApiError::Decode("refresh response carried no access token".into()));
        };

        if !self.session.update_token(token.clone())? {
            return Err(ApiError::Unauthorized {
                message: "signed out during refresh".into(),
            });
        }
        tracing::info!("Access token refreshed");
        Ok(token)
    }

    /// Build the request for a long-lived stream on `path`.
    pub(crate) fn stream_request(
        &self,
        path: &str,
        last_event_id: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let mut request = HttpRequest::new(Method::Get, self.config.url(path));
        request.set_header("Accept", "text/event-stream");
        request.set_header("Cache-Control", "no-cache");
        if let Some(token) = self.session.token() {
            request.set_header("Authorization", token.bearer());
        }
        if let Some(id) = last_event_id {
            request.set_header("Last-Event-ID", id);
        }
        Ok(request)
    }

    async fn send_once(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> Result<HttpResponse, ApiError> {
        let url = self.build_url(request)?;
        let mut http = HttpRequest::new(request.method, url);
        for (name, value) in &request.headers {
            http.set_header(name, value.clone());
        }
        if let Some(token) = token {
            http.set_header("Authorization", token.bearer());
        }
        if let RequestBody::Json(_) = request.body {
            http.set_header("Content-Type", "application/json");
        }
        http.body = request.body.clone();

        let response = self.transport.send(http).await.map_err(|e| {
            tracing::debug!("{} {} failed: {}", request.method, request.path, e);
            ApiError::Network(e.to_string())
        })?;
        tracing::debug!("{} {} -> {}", request.method, request.path, response.status);
        Ok(response)
    }

    fn build_url(&self, request: &ApiRequest) -> Result<String, ApiError> {
        let mut url = reqwest::Url::parse(&self.config.url(&request.path))
            .map_err(|e| ApiError::Validation(format!("invalid URL: {}", e)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url.to_string())
    }
}

fn decode<R: DeserializeOwned>(value: Value) -> Result<R, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

fn finish(response: HttpResponse) -> Result<ResponseBody, ApiError> {
    if response.is_success() {
        decode_body(&response)
    } else {
        Err(error_from_response(&response))
    }
}

/// Decode a successful response.
fn decode_body(response: &HttpResponse) -> Result<ResponseBody, ApiError> {
    if response.status == 204 {
        return Ok(ResponseBody::Empty);
    }
    let text = response.text_body();
    if text.trim().is_empty() {
        return Ok(ResponseBody::Empty);
    }
    match json::parse_value(&text) {
        Ok(value) => Ok(ResponseBody::Json(value)),
        Err(e) if is_json(response) => Err(ApiError::Decode(e.to_string())),
        Err(_) => Ok(ResponseBody::Text(text)),
    }
}

fn is_json(response: &HttpResponse) -> bool {
    response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.contains("application/json"))
}

/// Map a non-success response to an error, using the body's `message`.
fn error_from_response(response: &HttpResponse) -> ApiError {
    let message = json::parse_value(&response.text_body())
        .ok()
        .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("request failed (status: {})", response.status));
    ApiError::from_status(response.status, message)
}

/// Find the token in a refresh response: `data` as a string, then
/// `accessToken`, then `data.accessToken`.
fn extract_access_token(response: &HttpResponse) -> Option<AccessToken> {
    let body = json::parse_value(&response.text_body()).ok()?;
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(AccessToken::new)
    };
    non_empty(body.get("data"))
        .or_else(|| non_empty(body.get("accessToken")))
        .or_else(|| non_empty(body.get("data").and_then(|d| d.get("accessToken"))))
}
