//! Authorization guard for protected views.
//!
//! The guard answers one question on mount: is the stored access token
//! present and unexpired? An expired token triggers a single refresh
//! attempt. The check is a UX convenience only; the backend validates
//! every token independently.
//!
//! ```text
//! Unknown ──mount──▶ Checking ──┬── no token ─────────────────▶ Unauthorized
//!                               ├── exp >= now ───────────────▶ Authorized
//!                               └── exp <  now ── refresh ──┬─▶ Authorized
//!                                                           └─▶ Unauthorized
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use crate::api::{ApiClient, RefreshedAccess};
use crate::cancel::CancelToken;
use crate::jwt;
use crate::routes::Route;
use crate::token_store::TokenKind;

/// Source of wall-clock time, in whole seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock pinned to a fixed instant, for testing.
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_secs(&self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unknown,
    Checking,
    Authorized,
    Unauthorized,
}

/// What a guarded route shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Render<T> {
    Loading,
    Content(T),
    Redirect { to: Route, replace: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    Failed,
}

struct InFlight {
    id: u64,
    attempt: Shared<BoxFuture<'static, RefreshOutcome>>,
    waiters: usize,
}

#[derive(Default)]
struct Slot {
    next_id: u64,
    current: Option<InFlight>,
}

/// Coalesces concurrent refresh attempts into one network call.
///
/// Every guard sharing a coordinator awaits the same in-flight future.
/// The slot is cleared as soon as the attempt resolves, or when its last
/// waiter is cancelled, so a later refresh never joins an abandoned one.
#[derive(Clone, Default)]
pub struct RefreshCoordinator {
    slot: Arc<Mutex<Slot>>,
}

/// Registration of one caller on the in-flight attempt.
struct Waiter {
    slot: Arc<Mutex<Slot>>,
    id: u64,
    finished: bool,
}

impl Drop for Waiter {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(current) = slot.current.as_mut() else {
            return;
        };
        if current.id != self.id {
            return;
        }
        current.waiters -= 1;
        if self.finished || current.waiters == 0 {
            if !self.finished {
                debug!("Abandoning token refresh with no remaining waiters");
            }
            slot.current = None;
        }
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refresh(&self, client: &ApiClient) -> RefreshOutcome {
        let (attempt, mut waiter) = {
            let mut guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = &mut *guard;
            if slot.current.is_some() {
                debug!("Joining in-flight token refresh");
            }
            let next_id = &mut slot.next_id;
            let in_flight = slot.current.get_or_insert_with(|| {
                let id = *next_id;
                *next_id += 1;
                let client = client.clone();
                InFlight {
                    id,
                    attempt: async move { refresh_access_token(&client).await }
                        .boxed()
                        .shared(),
                    waiters: 0,
                }
            });
            in_flight.waiters += 1;
            let waiter = Waiter {
                slot: self.slot.clone(),
                id: in_flight.id,
                finished: false,
            };
            (in_flight.attempt.clone(), waiter)
        };

        let outcome = attempt.await;
        waiter.finished = true;
        outcome
    }
}

/// Exchange the stored refresh token for a new access token.
///
/// Failures are logged and reported as `Failed`; the access slot is only
/// written on a 200 carrying a new token.
async fn refresh_access_token(client: &ApiClient) -> RefreshOutcome {
    let Some(refresh_token) = client.tokens().get(TokenKind::Refresh) else {
        warn!("Access token expired and no refresh token is stored");
        return RefreshOutcome::Failed;
    };

    let response = match client.refresh(&refresh_token).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Token refresh failed: {}", e);
            return RefreshOutcome::Failed;
        }
    };

    if response.status != 200 {
        warn!("Token refresh rejected with status {}", response.status);
        return RefreshOutcome::Failed;
    }

    let access = match response.json::<RefreshedAccess>() {
        Ok(body) => body.access,
        Err(e) => {
            warn!("Token refresh returned an unreadable body: {}", e);
            return RefreshOutcome::Failed;
        }
    };

    match client.tokens().set(TokenKind::Access, &access) {
        Ok(()) => {
            debug!("Access token refreshed");
            RefreshOutcome::Refreshed
        }
        Err(e) => {
            warn!("Failed to store refreshed access token: {}", e);
            RefreshOutcome::Failed
        }
    }
}

/// Decides whether a protected view may render.
pub struct AuthGuard {
    client: ApiClient,
    clock: Arc<dyn Clock>,
    refresher: RefreshCoordinator,
    state: AuthState,
}

impl AuthGuard {
    pub fn new(client: ApiClient, clock: Arc<dyn Clock>, refresher: RefreshCoordinator) -> Self {
        Self {
            client,
            clock,
            refresher,
            state: AuthState::Unknown,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Run the authorization check.
    ///
    /// If `cancel` fires first the guard stays in `Checking` and the
    /// outcome is discarded.
    pub async fn mount(&mut self, cancel: &CancelToken) -> AuthState {
        self.state = AuthState::Checking;
        let checked = cancel.run(self.check()).await;
        match checked {
            Ok(state) => self.state = state,
            Err(_) => debug!("Authorization check abandoned by unmounted view"),
        }
        self.state
    }

    async fn check(&self) -> AuthState {
        let Some(token) = self.client.tokens().get(TokenKind::Access) else {
            return AuthState::Unauthorized;
        };

        let claims = match jwt::decode_claims(&token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Stored access token could not be decoded: {}", e);
                return AuthState::Unauthorized;
            }
        };

        if !claims.is_expired_at(self.clock.now_secs()) {
            return AuthState::Authorized;
        }

        match self.refresher.refresh(&self.client).await {
            RefreshOutcome::Refreshed => AuthState::Authorized,
            RefreshOutcome::Failed => AuthState::Unauthorized,
        }
    }

    /// Map the current state to what the route shows.
    pub fn render<T>(&self, content: impl FnOnce() -> T) -> Render<T> {
        match self.state {
            AuthState::Unknown | AuthState::Checking => Render::Loading,
            AuthState::Authorized => Render::Content(content()),
            AuthState::Unauthorized => Render::Redirect {
                to: Route::Login,
                replace: true,
            },
        }
    }
}
