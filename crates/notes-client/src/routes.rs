//! Route table and navigation.
//!
//! | Path        | View                                          |
//! |-------------|-----------------------------------------------|
//! | `/`         | Notes, behind the authorization guard         |
//! | `/login`    | Login form                                    |
//! | `/logout`   | Clears token storage, redirects to `/login`   |
//! | `/register` | Clears token storage, shows the register form |
//! | anything    | Not found                                     |

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::auth_form::{AuthForm, FormMode, SubmitOutcome};
use crate::cancel::{self, CancelHandle};
use crate::guard::{AuthGuard, Clock, RefreshCoordinator, Render};
use crate::notes_view::NotesView;
use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Logout,
    Register,
    NotFound,
}

impl Route {
    /// Resolve a location path. Query strings, fragments and a trailing
    /// slash are ignored.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        match path {
            "/" => Route::Home,
            "/login" => Route::Login,
            "/logout" => Route::Logout,
            "/register" => Route::Register,
            _ => Route::NotFound,
        }
    }

    /// Canonical path; `*` for the catch-all.
    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Logout => "/logout",
            Route::Register => "/register",
            Route::NotFound => "*",
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Navigation history. Redirects replace the current entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn push(&mut self, path: &str) {
        self.entries.push(path.to_string());
    }

    pub fn replace(&mut self, path: &str) {
        match self.entries.last_mut() {
            Some(last) => *last = path.to_string(),
            None => self.entries.push(path.to_string()),
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// The view a navigation lands on.
pub enum View {
    Loading,
    Notes(NotesView),
    Form(AuthForm),
    NotFound { path: String },
}

impl View {
    pub fn route(&self) -> Route {
        match self {
            View::Loading | View::Notes(_) => Route::Home,
            View::Form(form) => match form.mode() {
                FormMode::Login => Route::Login,
                FormMode::Register => Route::Register,
            },
            View::NotFound { .. } => Route::NotFound,
        }
    }
}

/// Hosts the route table. At most one view is mounted at a time;
/// navigating away cancels its pending requests.
pub struct App {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    refresher: RefreshCoordinator,
    history: History,
    mounted: Option<CancelHandle>,
}

impl App {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            notifier,
            clock,
            refresher: RefreshCoordinator::new(),
            history: History::default(),
            mounted: None,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Visit `path`, following redirects, and return the mounted view.
    pub async fn navigate(&mut self, path: &str) -> View {
        debug!("Navigating to {}", path);
        self.history.push(path);
        self.show(path).await
    }

    /// Act on a form submission result.
    pub async fn follow(&mut self, outcome: SubmitOutcome) -> Option<View> {
        match outcome {
            SubmitOutcome::Navigate(route) => Some(self.navigate(route.path()).await),
            SubmitOutcome::Stay => None,
        }
    }

    /// Cancel whatever the current view still has in flight.
    pub fn unmount(&mut self) {
        if let Some(handle) = self.mounted.take() {
            handle.cancel();
        }
    }

    async fn show(&mut self, path: &str) -> View {
        self.unmount();

        let mut route = Route::parse(path);
        loop {
            match route {
                Route::Home => {
                    let (handle, token) = cancel::pair();
                    let mut guard = AuthGuard::new(
                        self.client.clone(),
                        self.clock.clone(),
                        self.refresher.clone(),
                    );
                    guard.mount(&token).await;

                    let rendered = guard.render(|| {
                        NotesView::new(self.client.clone(), self.notifier.clone(), token.clone())
                    });
                    match rendered {
                        Render::Content(mut view) => {
                            view.mount().await;
                            self.mounted = Some(handle);
                            return View::Notes(view);
                        }
                        Render::Loading => {
                            self.mounted = Some(handle);
                            return View::Loading;
                        }
                        Render::Redirect { to, replace } => {
                            self.redirect(to, replace);
                            route = to;
                        }
                    }
                }
                Route::Logout => {
                    self.clear_tokens();
                    self.redirect(Route::Login, true);
                    route = Route::Login;
                }
                Route::Register => {
                    self.clear_tokens();
                    return View::Form(self.form(FormMode::Register));
                }
                Route::Login => return View::Form(self.form(FormMode::Login)),
                Route::NotFound => {
                    return View::NotFound {
                        path: path.to_string(),
                    };
                }
            }
        }
    }

    fn form(&self, mode: FormMode) -> AuthForm {
        AuthForm::new(mode, self.client.clone(), self.notifier.clone())
    }

    fn redirect(&mut self, to: Route, replace: bool) {
        debug!("Redirecting to {}", to);
        if replace {
            self.history.replace(to.path());
        } else {
            self.history.push(to.path());
        }
    }

    fn clear_tokens(&self) {
        if let Err(e) = self.client.tokens().clear() {
            warn!("Failed to clear token storage: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_routes() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/login"), Route::Login);
        assert_eq!(Route::parse("/login/"), Route::Login);
        assert_eq!(Route::parse("/logout"), Route::Logout);
        assert_eq!(Route::parse("/register?next=/"), Route::Register);
        assert_eq!(Route::parse("/notes/5"), Route::NotFound);
        assert_eq!(Route::parse("/LOGIN"), Route::NotFound);
    }

    #[test]
    fn test_history_replace() {
        let mut history = History::default();
        history.replace("/login");
        history.push("/");
        history.replace("/login");
        assert_eq!(history.entries(), &["/login".to_string(), "/login".to_string()]);
        assert_eq!(history.current(), Some("/login"));
    }
}
