//! Client-side routes and navigation.
//!
//! Every completed navigation re-reads the session, then tells the listeners
//! which route was landed on.

use crate::lock;
use crate::session::SessionState;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Welcome,
    Movies,
    Profile,
}

impl Route {
    /// Resolve a path; empty and unknown paths redirect to `welcome`.
    /// Query strings and surrounding slashes are ignored.
    pub fn resolve(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        match path.trim().trim_matches('/').to_lowercase().as_str() {
            "movies" => Self::Movies,
            "profile" => Self::Profile,
            _ => Self::Welcome,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Movies => "movies",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type NavigationListener = Box<dyn Fn(Route) + Send + Sync>;

pub struct Router {
    current: Mutex<Route>,
    session: Arc<SessionState>,
    listeners: Mutex<Vec<NavigationListener>>,
}

impl Router {
    pub fn new(session: Arc<SessionState>) -> Self {
        Self {
            current: Mutex::new(Route::Welcome),
            session,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn current(&self) -> Route {
        *lock(&self.current)
    }

    pub fn on_navigation(&self, listener: NavigationListener) {
        lock(&self.listeners).push(listener);
    }

    pub fn navigate(&self, path: &str) -> Route {
        let route = Route::resolve(path);
        *lock(&self.current) = route;
        self.session.refresh();
        debug!(%route, requested = path, "navigation complete");
        for listener in lock(&self.listeners).iter() {
            listener(route);
        }
        route
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemorySessionStore, SessionStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_resolve_routes() {
        assert_eq!(Route::resolve("movies"), Route::Movies);
        assert_eq!(Route::resolve("/movies?sort=title"), Route::Movies);
        assert_eq!(Route::resolve("/Profile/"), Route::Profile);
        assert_eq!(Route::resolve("welcome"), Route::Welcome);
        assert_eq!(Route::resolve(""), Route::Welcome);
        assert_eq!(Route::resolve("no-such-page"), Route::Welcome);
    }

    #[test]
    fn test_navigation_refreshes_session_then_notifies() {
        let store = Arc::new(MemorySessionStore::new());
        let session = Arc::new(SessionState::new(store.clone()));
        let router = Router::new(Arc::clone(&session));

        let landed = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&landed);
        let observed = Arc::clone(&session);
        router.on_navigation(Box::new(move |route| {
            if route == Route::Movies && observed.current().is_authenticated() {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        }));

        store.set("neo", "jwt").unwrap();
        assert_eq!(router.navigate("/movies"), Route::Movies);
        assert_eq!(router.current(), Route::Movies);
        router.navigate("elsewhere");
        assert_eq!(router.current(), Route::Welcome);
        assert_eq!(landed.load(Ordering::SeqCst), 1);
    }
}
