//! notes-client: token-authenticated client for the notes REST API.
//!
//! This crate provides:
//! - A token store over an injected key-value backend
//! - An HTTP client that attaches the stored bearer token to every request
//! - An authorization guard that checks token expiry and refreshes it
//! - The note list/editor view and the login/register form
//! - The route table tying those views together

pub mod api;
pub mod auth_form;
pub mod cancel;
pub mod config;
pub mod guard;
pub mod jwt;
pub mod notes_view;
pub mod notify;
pub mod routes;
pub mod token_store;
pub mod transport;

pub use api::{ApiClient, ApiError, Credentials, NewNote, Note, TokenPair};
pub use auth_form::{AuthForm, FormMode, SubmitOutcome, Submitting};
pub use cancel::{CancelHandle, CancelToken, Cancelled};
pub use config::{Config, ConfigError};
pub use guard::{AuthGuard, AuthState, Clock, RefreshCoordinator, Render, SystemClock};
pub use notes_view::{NoteCard, NotesView};
pub use notify::{Notifier, RecordingNotifier};
pub use routes::{App, History, Route, View};
pub use token_store::{FileStore, KeyValueStore, MemoryStore, StoreError, TokenKind, TokenStore};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, MockTransport, ReqwestTransport, TransportError};
