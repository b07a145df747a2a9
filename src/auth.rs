//! Login and registration dialogs.
//!
//! A dialog is opened together with a `DialogHandle`; the handle resolves to
//! `Some(result)` when the dialog closes on success and to `None` when it is
//! cancelled or dropped. While a submission is outstanding, further submits
//! on the same dialog are ignored.

use crate::api::MovieApi;
use crate::lock;
use crate::models::{Credentials, NewUser};
use crate::notice::Notifier;
use crate::session::SessionState;
use crate::validation::{Checks, ValidationError};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Receiving end of a dialog's result
pub struct DialogHandle<T> {
    rx: Receiver<Option<T>>,
}

impl<T> DialogHandle<T> {
    /// Block until the dialog closes
    pub fn wait(self) -> Option<T> {
        self.rx.recv().ok().flatten()
    }

    /// `None` while the dialog is still open
    pub fn try_result(&self) -> Option<Option<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(None),
        }
    }
}

/// Sending end, consumed by the first close
struct DialogCloser<T> {
    tx: Option<SyncSender<Option<T>>>,
}

impl<T> DialogCloser<T> {
    fn close(&mut self, result: Option<T>) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(result);
        }
    }

    fn is_open(&self) -> bool {
        self.tx.is_some()
    }
}

fn dialog<T>() -> (DialogCloser<T>, DialogHandle<T>) {
    let (tx, rx) = mpsc::sync_channel(1);
    (DialogCloser { tx: Some(tx) }, DialogHandle { rx })
}

/// What a submit did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The dialog closed with a result
    Completed,
    /// Form errors; no request was sent
    Invalid(Vec<ValidationError>),
    /// The request failed or the response was unusable; the dialog stays open
    Failed(String),
    /// A submission is already outstanding, or the dialog is closed
    Ignored,
}

/// Clears the submitting flag however the submission ends
struct Submitting<'a>(&'a AtomicBool);

impl<'a> Submitting<'a> {
    fn start(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for Submitting<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub user: String,
    pub token: String,
}

impl LoginGrant {
    /// Pull the token and username out of a login response.
    ///
    /// The backend has used both `token` and `Token`; the username comes from
    /// the returned user record, falling back to the name that was submitted.
    pub fn from_response(response: &Value, submitted_username: &str) -> Option<Self> {
        let token = ["token", "Token"]
            .iter()
            .filter_map(|key| response.get(*key).and_then(Value::as_str))
            .find(|t| !t.is_empty())?;
        let user = response
            .get("user")
            .and_then(|u| {
                ["Username", "username"]
                    .iter()
                    .filter_map(|key| u.get(*key).and_then(Value::as_str))
                    .find(|name| !name.is_empty())
            })
            .or(Some(submitted_username).filter(|name| !name.is_empty()))?;

        Some(Self {
            user: user.to_string(),
            token: token.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<Credentials, Vec<ValidationError>> {
        Checks::new()
            .required("Username", &self.username)
            .required("Password", &self.password)
            .finish()?;
        Ok(Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }
}

pub struct LoginDialog {
    api: Arc<dyn MovieApi>,
    session: Arc<SessionState>,
    notices: Arc<dyn Notifier>,
    form: Mutex<LoginForm>,
    submitting: AtomicBool,
    closer: Mutex<DialogCloser<LoginGrant>>,
}

impl LoginDialog {
    pub fn open(
        api: Arc<dyn MovieApi>,
        session: Arc<SessionState>,
        notices: Arc<dyn Notifier>,
    ) -> (Self, DialogHandle<LoginGrant>) {
        let (closer, handle) = dialog();
        let dialog = Self {
            api,
            session,
            notices,
            form: Mutex::new(LoginForm::default()),
            submitting: AtomicBool::new(false),
            closer: Mutex::new(closer),
        };
        (dialog, handle)
    }

    pub fn set_form(&self, form: LoginForm) {
        *lock(&self.form) = form;
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        lock(&self.closer).is_open()
    }

    pub fn submit(&self) -> SubmitOutcome {
        if !self.is_open() {
            return SubmitOutcome::Ignored;
        }
        let form = lock(&self.form).clone();
        let credentials = match form.validate() {
            Ok(credentials) => credentials,
            Err(errors) => {
                self.notices.error("Please enter a username and password.");
                return SubmitOutcome::Invalid(errors);
            }
        };
        let Some(_submitting) = Submitting::start(&self.submitting) else {
            return SubmitOutcome::Ignored;
        };

        let response = match self.api.login(&credentials) {
            Ok(response) => response,
            Err(e) => {
                self.notices.error(&e.message);
                return SubmitOutcome::Failed(e.message);
            }
        };

        let Some(grant) = LoginGrant::from_response(&response, &form.username) else {
            let message = "Login response missing token/user.";
            warn!("{}", message);
            self.notices.error(message);
            return SubmitOutcome::Failed(message.to_string());
        };

        if let Err(e) = self.session.login(&grant.user, &grant.token) {
            let message = format!("Could not save session: {:#}", e);
            self.notices.error(&message);
            return SubmitOutcome::Failed(message);
        }

        info!(user = %grant.user, "logged in");
        lock(&self.closer).close(Some(grant));
        SubmitOutcome::Completed
    }

    /// Close without logging in
    pub fn close(&self) {
        lock(&self.closer).close(None);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub username: String,
    pub password: String,
    pub email: String,
    /// Optional, `YYYY-MM-DD`
    pub birthday: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<NewUser, Vec<ValidationError>> {
        Checks::new()
            .required("Username", &self.username)
            .min_len("Username", &self.username, 5)
            .required("Password", &self.password)
            .min_len("Password", &self.password, 8)
            .required("Email", &self.email)
            .email("Email", &self.email)
            .date("Birthday", &self.birthday)
            .finish()?;
        Ok(NewUser {
            username: self.username.clone(),
            password: self.password.clone(),
            email: self.email.clone(),
            birthday: Some(self.birthday.clone()).filter(|b| !b.is_empty()),
        })
    }
}

pub struct RegistrationDialog {
    api: Arc<dyn MovieApi>,
    notices: Arc<dyn Notifier>,
    form: Mutex<RegistrationForm>,
    submitting: AtomicBool,
    closer: Mutex<DialogCloser<Value>>,
}

impl RegistrationDialog {
    pub fn open(api: Arc<dyn MovieApi>, notices: Arc<dyn Notifier>) -> (Self, DialogHandle<Value>) {
        let (closer, handle) = dialog();
        let dialog = Self {
            api,
            notices,
            form: Mutex::new(RegistrationForm::default()),
            submitting: AtomicBool::new(false),
            closer: Mutex::new(closer),
        };
        (dialog, handle)
    }

    pub fn set_form(&self, form: RegistrationForm) {
        *lock(&self.form) = form;
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        lock(&self.closer).is_open()
    }

    /// On success the dialog closes with the created user; logging in is a
    /// separate step.
    pub fn submit(&self) -> SubmitOutcome {
        if !self.is_open() {
            return SubmitOutcome::Ignored;
        }
        let new_user = match lock(&self.form).validate() {
            Ok(new_user) => new_user,
            Err(errors) => {
                self.notices.error("Please fix the errors in the form.");
                return SubmitOutcome::Invalid(errors);
            }
        };
        let Some(_submitting) = Submitting::start(&self.submitting) else {
            return SubmitOutcome::Ignored;
        };

        match self.api.register(&new_user) {
            Ok(created) => {
                info!(user = %new_user.username, "registered");
                self.notices
                    .info("Registration successful! You can now log in.");
                lock(&self.closer).close(Some(created));
                SubmitOutcome::Completed
            }
            Err(e) => {
                self.notices.error(&e.message);
                SubmitOutcome::Failed(e.message)
            }
        }
    }

    pub fn close(&self) {
        lock(&self.closer).close(None);
    }
}
