//! Landing page: opens the auth dialogs and moves on to the catalog after login.

use crate::api::MovieApi;
use crate::auth::{DialogHandle, LoginDialog, LoginGrant, RegistrationDialog};
use crate::notice::Notifier;
use crate::router::{Route, Router};
use crate::session::SessionState;
use serde_json::Value;
use std::sync::Arc;

pub struct WelcomePage {
    api: Arc<dyn MovieApi>,
    session: Arc<SessionState>,
    notices: Arc<dyn Notifier>,
}

impl WelcomePage {
    pub fn new(
        api: Arc<dyn MovieApi>,
        session: Arc<SessionState>,
        notices: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            session,
            notices,
        }
    }

    pub fn open_login(&self) -> (LoginDialog, DialogHandle<LoginGrant>) {
        LoginDialog::open(
            Arc::clone(&self.api),
            Arc::clone(&self.session),
            Arc::clone(&self.notices),
        )
    }

    pub fn open_registration(&self) -> (RegistrationDialog, DialogHandle<Value>) {
        RegistrationDialog::open(Arc::clone(&self.api), Arc::clone(&self.notices))
    }

    /// A cancelled login changes nothing; a successful one greets the user
    /// and lands on the catalog.
    pub fn after_login(&self, result: Option<LoginGrant>, router: &Router) -> Option<Route> {
        let grant = result?;
        self.notices.info(&format!("Welcome, {}!", grant.user));
        Some(router.navigate("movies"))
    }
}
