//! HTTP transport abstraction.
//!
//! Implementations:
//! - `ReqwestTransport` - Talks to the real backend over HTTP
//! - `MockTransport` - Scripted responses for testing
//!
//! A transport only moves bytes. Non-2xx statuses come back as ordinary
//! responses; only failures to get a response at all are errors.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// An outgoing request, relative to the backend base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path on the backend (e.g. "/api/notes/")
    pub path: String,
    /// JSON body, if any
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value (case-insensitive name match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response from the backend. `body` is `Value::Null` when empty.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn empty(status: u16) -> Self {
        Self::new(status, Value::Null)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }
}

/// Generic "send one request" abstraction the API client is built on.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport backed by `reqwest`.
///
/// No timeout, retry or backoff is configured; a hung request stays pending.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Join a request path onto the base URL, keeping any path prefix on the base.
    fn url_for(&self, path: &str) -> Result<reqwest::Url, TransportError> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        reqwest::Url::parse(&joined).map_err(|e| TransportError::InvalidUrl(format!("{joined}: {e}")))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(&request.path)?;
        tracing::debug!("{} {}", request.method, url);

        let mut builder = self.client.request(request.method.into(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            // Non-JSON bodies (HTML error pages) are kept as text
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok(HttpResponse { status, body })
    }
}

/// Scripted transport for testing.
///
/// Replies are registered per (method, path) and repeat until replaced.
/// Unscripted requests get an empty 404. Every request is recorded.
pub struct MockTransport {
    replies: Mutex<HashMap<(Method, String), Result<HttpResponse, TransportError>>>,
    calls: Mutex<Vec<HttpRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
        }
    }

    /// Script the reply for a (method, path) pair.
    pub fn reply(&self, method: Method, path: &str, reply: Result<HttpResponse, TransportError>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((method, path.to_string()), reply);
    }

    /// Delay every reply, to keep requests in flight.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    /// All requests sent so far, in order.
    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of requests sent to a (method, path) pair.
    pub fn call_count(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let key = (request.method, request.path.clone());
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Ok(HttpResponse::empty(404)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_join_keeps_base_prefix() {
        let transport = ReqwestTransport::new("http://localhost:8000/backend/");
        let url = transport.url_for("/api/notes/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/backend/api/notes/");
    }

    #[test]
    fn test_url_join_without_slashes() {
        let transport = ReqwestTransport::new("http://localhost:8000");
        let url = transport.url_for("api/token/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/token/");
    }

    #[test]
    fn test_invalid_base_url() {
        let transport = ReqwestTransport::new("not a url");
        assert!(matches!(
            transport.url_for("/api/notes/"),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = HttpRequest::new(Method::Get, "/").with_header("Authorization", "Bearer abc");
        assert_eq!(request.header("authorization"), Some("Bearer abc"));
        assert_eq!(request.header("x-missing"), None);
    }

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::empty(200).is_success());
        assert!(HttpResponse::empty(204).is_success());
        assert!(!HttpResponse::empty(301).is_success());
        assert!(!HttpResponse::empty(401).is_success());
    }

    #[tokio::test]
    async fn test_mock_records_and_replies() {
        let mock = MockTransport::new();
        mock.reply(
            Method::Get,
            "/api/notes/",
            Ok(HttpResponse::new(200, json!([]))),
        );

        let ok = mock.send(HttpRequest::new(Method::Get, "/api/notes/")).await.unwrap();
        assert_eq!(ok.status, 200);

        let missing = mock.send(HttpRequest::new(Method::Get, "/nope/")).await.unwrap();
        assert_eq!(missing.status, 404);

        assert_eq!(mock.calls().len(), 2);
        assert_eq!(mock.call_count(Method::Get, "/api/notes/"), 1);
    }
}
