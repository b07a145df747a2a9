//! Wires the session, router and views together.

use crate::api::MovieApi;
use crate::catalog::Catalog;
use crate::notice::Notifier;
use crate::profile::ProfileView;
use crate::router::{Route, Router};
use crate::session::{SessionState, SessionStore};
use crate::welcome::WelcomePage;
use anyhow::Result;
use std::sync::Arc;

pub struct App {
    pub session: Arc<SessionState>,
    pub notices: Arc<dyn Notifier>,
    pub router: Router,
    pub welcome: WelcomePage,
    pub catalog: Arc<Catalog>,
    pub profile: Arc<ProfileView>,
}

impl App {
    pub fn new(
        api: Arc<dyn MovieApi>,
        store: Arc<dyn SessionStore>,
        notices: Arc<dyn Notifier>,
    ) -> Self {
        let session = Arc::new(SessionState::new(store));
        let router = Router::new(Arc::clone(&session));
        let welcome = WelcomePage::new(
            Arc::clone(&api),
            Arc::clone(&session),
            Arc::clone(&notices),
        );
        let catalog = Arc::new(Catalog::new(
            Arc::clone(&api),
            Arc::clone(&session),
            Arc::clone(&notices),
        ));
        let profile = Arc::new(ProfileView::new(
            Arc::clone(&api),
            Arc::clone(&session),
            Arc::clone(&notices),
        ));

        // Landing on a view (re)loads it
        let on_movies = Arc::clone(&catalog);
        let on_profile = Arc::clone(&profile);
        router.on_navigation(Box::new(move |route| match route {
            Route::Movies => on_movies.activate(),
            Route::Profile => {
                on_profile.load();
            }
            Route::Welcome => {}
        }));

        Self {
            session,
            notices,
            router,
            welcome,
            catalog,
            profile,
        }
    }

    pub fn logout(&self) -> Result<()> {
        self.session.logout()?;
        self.notices.info("Logged out.");
        self.router.navigate("welcome");
        Ok(())
    }

    pub fn delete_account(&self) -> bool {
        let deleted = self.profile.delete_account();
        if deleted {
            self.router.navigate("welcome");
        }
        deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::LoginForm;
    use crate::notice::NoticeLog;
    use crate::session::MemorySessionStore;
    use crate::testing::FakeApi;
    use serde_json::json;

    fn app() -> (Arc<FakeApi>, Arc<MemorySessionStore>, Arc<NoticeLog>, App) {
        let api = Arc::new(
            FakeApi::new()
                .with_movies(json!([{ "_id": "a", "Title": "Alien" }]))
                .with_profile(json!({ "Username": "neo", "FavoriteMovies": ["a"] })),
        );
        let store = Arc::new(MemorySessionStore::new());
        let notices = Arc::new(NoticeLog::new());
        let app = App::new(api.clone(), store.clone(), notices.clone());
        (api, store, notices, app)
    }

    #[test]
    fn test_login_lands_on_loaded_catalog() {
        let (api, _, notices, app) = app();
        assert_eq!(app.router.navigate(""), Route::Welcome);
        assert!(api.calls().is_empty());

        let (dialog, handle) = app.welcome.open_login();
        dialog.set_form(LoginForm {
            username: "neo".to_string(),
            password: "followthewhiterabbit".to_string(),
        });
        dialog.submit();
        let route = app.welcome.after_login(handle.wait(), &app.router);

        assert_eq!(route, Some(Route::Movies));
        assert_eq!(app.router.current(), Route::Movies);
        assert_eq!(notices.messages().last().unwrap(), "Welcome, neo!");
        assert_eq!(app.catalog.movies().len(), 1);
        assert_eq!(app.catalog.favorites().len(), 1);
    }

    #[test]
    fn test_every_landing_reloads_the_catalog() {
        let (api, store, _, app) = app();
        store.set("neo", "jwt").unwrap();
        app.router.navigate("movies");
        app.router.navigate("/movies/");
        assert_eq!(api.count("movies"), 2);
        assert_eq!(api.count("user neo"), 2);

        app.router.navigate("profile");
        assert_eq!(app.profile.favorites().len(), 1);
    }

    #[test]
    fn test_cancelled_login_stays_on_welcome() {
        let (_, _, _, app) = app();
        app.router.navigate("welcome");
        let (dialog, handle) = app.welcome.open_login();
        dialog.close();
        assert_eq!(app.welcome.after_login(handle.wait(), &app.router), None);
        assert_eq!(app.router.current(), Route::Welcome);
    }

    #[test]
    fn test_logout_clears_session() {
        let (_, store, notices, app) = app();
        store.set("neo", "jwt").unwrap();
        app.router.navigate("movies");
        app.logout().unwrap();

        let session = store.read();
        assert_eq!(session.username, None);
        assert_eq!(session.token, None);
        assert!(!app.session.current().is_authenticated());
        assert_eq!(app.router.current(), Route::Welcome);
        assert!(notices.messages().contains(&"Logged out.".to_string()));
    }

    #[test]
    fn test_delete_account_returns_to_welcome() {
        let (api, store, _, app) = app();
        store.set("neo", "jwt").unwrap();
        app.router.navigate("profile");
        assert!(app.delete_account());
        assert_eq!(api.count("delete neo"), 1);
        assert_eq!(app.router.current(), Route::Welcome);
        assert!(store.read().token.is_none());
    }
}
