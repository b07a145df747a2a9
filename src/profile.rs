//! Profile view: edit contact fields and manage the favorites list.

use crate::api::MovieApi;
use crate::favorites::BusySet;
use crate::lock;
use crate::models::{MovieId, MovieRef, ProfileUpdate};
use crate::notice::Notifier;
use crate::session::SessionState;
use crate::validation::{Checks, ValidationError};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Editable profile fields. `username` is shown but never submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    /// `YYYY-MM-DD`, empty when unset
    pub birthday: String,
    /// New password; empty keeps the current one
    pub password: String,
}

impl ProfileForm {
    /// Email and birthday are always sent; the password only when it is
    /// non-blank.
    pub fn to_update(&self) -> Result<ProfileUpdate, Vec<ValidationError>> {
        Checks::new()
            .required("Email", &self.email)
            .email("Email", &self.email)
            .date("Birthday", &self.birthday)
            .finish()?;
        Ok(ProfileUpdate {
            email: self.email.clone(),
            birthday: Some(self.birthday.clone()).filter(|b| !b.is_empty()),
            password: Some(self.password.clone()).filter(|p| !p.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileState {
    pub loading: bool,
    pub form: ProfileForm,
    pub favorites: Vec<MovieRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// A removal for this id is already in flight
    Ignored,
    MissingIdentity,
    Failed(String),
}

pub struct ProfileView {
    api: Arc<dyn MovieApi>,
    session: Arc<SessionState>,
    notices: Arc<dyn Notifier>,
    state: Mutex<ProfileState>,
    removing: BusySet,
}

impl ProfileView {
    pub fn new(
        api: Arc<dyn MovieApi>,
        session: Arc<SessionState>,
        notices: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            session,
            notices,
            state: Mutex::new(ProfileState::default()),
            removing: BusySet::new(),
        }
    }

    fn user(&self) -> Option<String> {
        self.session.current().active_user().map(str::to_string)
    }

    pub fn load(&self) -> bool {
        let Some(username) = self.user() else {
            lock(&self.state).loading = false;
            self.notices.error("Not logged in.");
            return false;
        };
        lock(&self.state).loading = true;

        let result = self.api.user(&username);
        let mut state = lock(&self.state);
        state.loading = false;
        match result {
            Ok(profile) => {
                state.form = ProfileForm {
                    username: profile.username,
                    email: profile.email,
                    birthday: profile.birthday.unwrap_or_default(),
                    password: String::new(),
                };
                state.favorites = profile.favorites;
                true
            }
            Err(e) => {
                drop(state);
                warn!(error = %e, "profile load failed");
                self.notices.error("Failed to load profile.");
                false
            }
        }
    }

    pub fn snapshot(&self) -> ProfileState {
        lock(&self.state).clone()
    }

    pub fn form(&self) -> ProfileForm {
        lock(&self.state).form.clone()
    }

    pub fn favorites(&self) -> Vec<MovieRef> {
        lock(&self.state).favorites.clone()
    }

    pub fn edit(&self, edit: impl FnOnce(&mut ProfileForm)) {
        edit(&mut lock(&self.state).form);
    }

    pub fn save(&self) -> bool {
        let Some(username) = self.user() else {
            return false;
        };
        let update = match lock(&self.state).form.to_update() {
            Ok(update) => update,
            Err(_) => {
                self.notices.error("Please fix the form errors.");
                return false;
            }
        };

        match self.api.edit_user(&username, &update) {
            Ok(_) => {
                lock(&self.state).form.password.clear();
                info!(user = %username, "profile updated");
                self.notices.info("Profile updated!");
                true
            }
            Err(e) => {
                warn!(error = %e, "profile update failed");
                self.notices.error("Failed to update profile.");
                false
            }
        }
    }

    pub fn is_removing(&self, id: &MovieId) -> bool {
        self.removing.contains(id)
    }

    /// Remove a favorite; the local list only changes once the server confirms
    pub fn remove_favorite(&self, id: &MovieId) -> RemoveOutcome {
        let Some(username) = self.user() else {
            self.notices.error("Missing user or movie id.");
            return RemoveOutcome::MissingIdentity;
        };
        let Some(guard) = self.removing.try_acquire(id) else {
            return RemoveOutcome::Ignored;
        };

        let result = self.api.remove_favorite(&username, id);
        if result.is_ok() {
            lock(&self.state).favorites.retain(|entry| entry.id() != id);
        }
        drop(guard);

        match result {
            Ok(()) => {
                self.notices.info("Removed from favorites.");
                RemoveOutcome::Removed
            }
            Err(e) => {
                warn!(movie = %id, error = %e, "favorite removal failed");
                self.notices.error("Could not remove favorite.");
                RemoveOutcome::Failed(e.message)
            }
        }
    }

    /// Look a favorite up by 1-based list position or id
    pub fn find_favorite(&self, key: &str) -> Option<MovieRef> {
        let state = lock(&self.state);
        if let Ok(position) = key.parse::<usize>() {
            if let Some(entry) = position.checked_sub(1).and_then(|i| state.favorites.get(i)) {
                return Some(entry.clone());
            }
        }
        state
            .favorites
            .iter()
            .find(|entry| entry.id().as_str() == key || entry.label().eq_ignore_ascii_case(key))
            .cloned()
    }

    /// Delete the account and end the session
    pub fn delete_account(&self) -> bool {
        let Some(username) = self.user() else {
            self.notices.error("Not logged in.");
            return false;
        };
        match self.api.delete_user(&username) {
            Ok(()) => {
                if let Err(e) = self.session.logout() {
                    warn!("{:#}", e);
                }
                *lock(&self.state) = ProfileState::default();
                info!(user = %username, "account deleted");
                self.notices.info("Account deleted.");
                true
            }
            Err(e) => {
                self.notices.error(&e.message);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(email: &str, birthday: &str, password: &str) -> ProfileForm {
        ProfileForm {
            username: "neo".to_string(),
            email: email.to_string(),
            birthday: birthday.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_blank_password_is_not_sent() {
        let update = form("neo@example.com", "", "   ").to_update().unwrap();
        assert_eq!(update.password, None);
        assert_eq!(update.birthday, None);
        assert_eq!(update.email, "neo@example.com");
    }

    #[test]
    fn test_password_sent_as_typed() {
        let update = form("neo@example.com", "1990-04-12", " s3cret ").to_update().unwrap();
        assert_eq!(update.password.as_deref(), Some(" s3cret "));
        assert_eq!(update.birthday.as_deref(), Some("1990-04-12"));
    }

    #[test]
    fn test_email_required() {
        let errors = form("", "", "").to_update().unwrap_err();
        assert_eq!(errors[0].field, "Email");
        assert!(form("neo", "", "").to_update().is_err());
    }

    use crate::notice::NoticeLog;
    use crate::testing::{notices, session_for, FakeApi};
    use serde_json::json;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn view(api: FakeApi, user: Option<&str>) -> (Arc<FakeApi>, ProfileView, Arc<NoticeLog>) {
        let api = Arc::new(api.with_profile(json!({
            "Username": "neo",
            "Email": "neo@example.com",
            "Birthday": "1990-04-12T00:00:00.000Z",
            "FavoriteMovies": ["a", { "_id": "b", "Title": "Brazil" }]
        })));
        let notices = notices();
        let view = ProfileView::new(api.clone(), session_for(user), notices.clone());
        (api, view, notices)
    }

    #[test]
    fn test_load_fills_form_and_favorites() {
        let (_, view, _) = view(FakeApi::new(), Some("neo"));
        assert!(view.load());
        let state = view.snapshot();
        assert!(!state.loading);
        assert_eq!(state.form.email, "neo@example.com");
        assert_eq!(state.form.birthday, "1990-04-12");
        assert!(state.form.password.is_empty());
        assert_eq!(state.favorites.len(), 2);
        assert_eq!(view.find_favorite("Brazil").unwrap().id().as_str(), "b");
        assert_eq!(view.find_favorite("1").unwrap().id().as_str(), "a");
    }

    #[test]
    fn test_load_requires_login() {
        let (api, view, notices) = view(FakeApi::new(), None);
        assert!(!view.load());
        assert_eq!(notices.messages(), vec!["Not logged in."]);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_save_sends_password_once() {
        let (api, view, notices) = view(FakeApi::new(), Some("neo"));
        view.load();
        view.edit(|form| form.password = "n3wpassword".to_string());
        assert!(view.save());
        assert!(view.form().password.is_empty());
        assert_eq!(notices.messages().last().unwrap(), "Profile updated!");

        view.save();
        let edits: Vec<String> = api
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("edit"))
            .collect();
        assert_eq!(edits.len(), 2);
        assert!(edits[0].contains(r#""Password":"n3wpassword""#));
        assert!(!edits[1].contains("Password"));
        assert!(edits[1].contains(r#""Birthday":"1990-04-12""#));
    }

    #[test]
    fn test_save_rejects_bad_form() {
        let (api, view, notices) = view(FakeApi::new(), Some("neo"));
        view.load();
        view.edit(|form| form.birthday = "12/04/1990".to_string());
        assert!(!view.save());
        assert_eq!(notices.messages().last().unwrap(), "Please fix the form errors.");
        assert_eq!(api.count("edit"), 0);
    }

    #[test]
    fn test_save_failure_keeps_password() {
        let api = FakeApi::new();
        *api.fail_edit.lock().unwrap() = true;
        let (_, view, notices) = view(api, Some("neo"));
        view.load();
        view.edit(|form| form.password = "n3wpassword".to_string());
        assert!(!view.save());
        assert_eq!(view.form().password, "n3wpassword");
        assert_eq!(notices.messages().last().unwrap(), "Failed to update profile.");
    }

    #[test]
    fn test_remove_favorite_waits_for_server() {
        let (api, view, notices) = view(FakeApi::new(), Some("neo"));
        view.load();

        api.fail_toggles_for("a");
        let a = MovieId::new("a");
        assert!(matches!(view.remove_favorite(&a), RemoveOutcome::Failed(_)));
        assert_eq!(view.favorites().len(), 2);
        assert_eq!(notices.messages().last().unwrap(), "Could not remove favorite.");

        assert_eq!(view.remove_favorite(&MovieId::new("b")), RemoveOutcome::Removed);
        let left: Vec<String> = view
            .favorites()
            .iter()
            .map(|entry| entry.id().to_string())
            .collect();
        assert_eq!(left, vec!["a"]);
        assert!(!view.is_removing(&a));
    }

    #[test]
    fn test_favorite_stays_busy_until_list_updated() {
        let (api, view, _) = view(FakeApi::new(), Some("neo"));
        view.load();
        let b = MovieId::new("b");
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        api.pause_next_call(entered_tx, release_rx);

        thread::scope(|scope| {
            let first = scope.spawn(|| view.remove_favorite(&b));
            entered_rx.recv().unwrap();

            let state = view.state.lock().unwrap();
            release_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(50));
            assert!(view.is_removing(&b));
            assert_eq!(view.remove_favorite(&b), RemoveOutcome::Ignored);
            drop(state);

            assert_eq!(first.join().unwrap(), RemoveOutcome::Removed);
        });

        assert!(!view.is_removing(&b));
        assert_eq!(api.count("remove neo b"), 1);
        assert_eq!(view.favorites().len(), 1);
    }

    #[test]
    fn test_delete_account_ends_session() {
        let api = Arc::new(FakeApi::new());
        let session = session_for(Some("neo"));
        let view = ProfileView::new(api.clone(), Arc::clone(&session), notices());
        view.load();
        assert!(view.delete_account());
        assert_eq!(api.count("delete neo"), 1);
        assert!(!session.current().is_authenticated());
        assert!(view.favorites().is_empty());
    }
}
