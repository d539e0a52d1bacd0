//! Login / register form.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::api::{ApiClient, ApiError, Credentials};
use crate::notify::Notifier;
use crate::routes::Route;
use crate::token_store::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Login,
    Register,
}

impl FormMode {
    pub fn heading(self) -> &'static str {
        match self {
            FormMode::Login => "Login",
            FormMode::Register => "Register",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Submission succeeded; go to this route.
    Navigate(Route),
    /// Submission failed and the user was alerted. Form input is untouched.
    Stay,
}

/// Whether a submission is in flight. Clones observe the same form.
#[derive(Debug, Clone, Default)]
pub struct Submitting(Arc<AtomicBool>);

impl Submitting {
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, value: bool) {
        self.0.store(value, Ordering::Release);
    }
}

/// Clears the flag however the submission ends, cancellation included.
struct ClearOnDrop(Submitting);

impl Drop for ClearOnDrop {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct AuthForm {
    mode: FormMode,
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    submitting: Submitting,
    pub username: String,
    pub password: String,
}

impl AuthForm {
    pub fn new(mode: FormMode, client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            mode,
            client,
            notifier,
            submitting: Submitting::default(),
            username: String::new(),
            password: String::new(),
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn heading(&self) -> &'static str {
        self.mode.heading()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.get()
    }

    /// Handle for watching the flag while `submit` holds the form.
    pub fn submitting(&self) -> Submitting {
        self.submitting.clone()
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        self.submitting.set(true);
        let _clear = ClearOnDrop(self.submitting.clone());

        let credentials = Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        };

        let result = match self.mode {
            FormMode::Login => self.login(&credentials).await,
            FormMode::Register => self.register(&credentials).await,
        };

        match result {
            Ok(route) => SubmitOutcome::Navigate(route),
            Err(message) => {
                debug!("{} failed for {}: {}", self.heading(), credentials.username, message);
                self.notifier.alert(&message);
                SubmitOutcome::Stay
            }
        }
    }

    async fn login(&self, credentials: &Credentials) -> Result<Route, String> {
        let pair = self
            .client
            .login(credentials)
            .await
            .map_err(|e: ApiError| e.to_string())?;

        let tokens = self.client.tokens();
        tokens
            .set(TokenKind::Access, &pair.access)
            .and_then(|()| tokens.set(TokenKind::Refresh, &pair.refresh))
            .map_err(|e| e.to_string())?;

        info!("Logged in as {}", credentials.username);
        Ok(Route::Home)
    }

    async fn register(&self, credentials: &Credentials) -> Result<Route, String> {
        self.client
            .register(credentials)
            .await
            .map_err(|e| e.to_string())?;

        info!("Registered {}", credentials.username);
        Ok(Route::Login)
    }
}
