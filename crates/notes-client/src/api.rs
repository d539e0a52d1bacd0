//! Authenticated request client and typed endpoint helpers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::token_store::{TokenKind, TokenStore};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};

pub const LOGIN_PATH: &str = "/api/token/";
pub const REFRESH_PATH: &str = "/api/token/refresh/";
pub const DEFAULT_REGISTER_PATH: &str = "/api/user/register/";
pub const NOTES_PATH: &str = "/api/notes/";

pub fn delete_note_path(id: i64) -> String {
    format!("/api/notes/delete/{id}/")
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Request failed with status code {status}")]
    Status { status: u16, body: Value },

    #[error("Unexpected response body: {0}")]
    Body(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Body of a successful refresh response.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedAccess {
    pub access: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
}

/// A note as the server returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Owner id; read-only on the server
    #[serde(default)]
    pub author: Option<i64>,
}

/// HTTP client that attaches the stored access token to every request.
///
/// It never retries and never refreshes; a rejected token is surfaced to
/// the caller as a plain status.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    tokens: TokenStore,
    register_path: String,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>, tokens: TokenStore) -> Self {
        Self {
            transport,
            tokens,
            register_path: DEFAULT_REGISTER_PATH.to_string(),
        }
    }

    pub fn with_register_path(mut self, path: impl Into<String>) -> Self {
        self.register_path = path.into();
        self
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Send a request, adding `Authorization: Bearer <access>` when a token is stored.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = HttpRequest::new(method, path);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        if let Some(token) = self.tokens.get(TokenKind::Access) {
            request = request.with_header("Authorization", format!("Bearer {token}"));
        }
        self.transport.send(request).await
    }

    async fn send_json<T: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &T,
    ) -> Result<HttpResponse, ApiError> {
        let body = serde_json::to_value(body)?;
        Ok(self.send(method, path, Some(body)).await?)
    }

    /// `POST /api/token/`: exchange credentials for a token pair.
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        let response = self.send_json(Method::Post, LOGIN_PATH, credentials).await?;
        Ok(require_success(response)?.json()?)
    }

    /// Create an account. Any 2xx counts as success.
    pub async fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let response = self
            .send_json(Method::Post, &self.register_path, credentials)
            .await?;
        require_success(response)?;
        Ok(())
    }

    /// `POST /api/token/refresh/`. The raw response is returned so the
    /// caller can decide what counts as success.
    pub async fn refresh(&self, refresh_token: &str) -> Result<HttpResponse, ApiError> {
        self.send_json(
            Method::Post,
            REFRESH_PATH,
            &RefreshRequest {
                refresh: refresh_token,
            },
        )
        .await
    }

    /// `GET /api/notes/`, in server order.
    pub async fn list_notes(&self) -> Result<Vec<Note>, ApiError> {
        let response = self.send(Method::Get, NOTES_PATH, None).await?;
        Ok(require_success(response)?.json()?)
    }

    /// `POST /api/notes/`. Returns the raw response; 201 means created.
    pub async fn create_note(&self, note: &NewNote) -> Result<HttpResponse, ApiError> {
        self.send_json(Method::Post, NOTES_PATH, note).await
    }

    /// `DELETE /api/notes/delete/{id}/`. Returns the raw response; 204 means deleted.
    pub async fn delete_note(&self, id: i64) -> Result<HttpResponse, ApiError> {
        Ok(self.send(Method::Delete, &delete_note_path(id), None).await?)
    }
}

fn require_success(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Status {
            status: response.status,
            body: response.body,
        })
    }
}
