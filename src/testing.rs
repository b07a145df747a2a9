//! Scripted backend for the view tests.

#![allow(dead_code)]

use crate::api::{ApiError, ApiResult, MovieApi};
use crate::models::{
    Credentials, DirectorDetail, GenreDetail, Movie, MovieId, NewUser, ProfileUpdate, UserProfile,
};
use crate::notice::NoticeLog;
use crate::session::{MemorySessionStore, Session, SessionState};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Blocks the next matching call until released
struct Gate {
    entered: Sender<()>,
    release: Receiver<()>,
}

pub struct FakeApi {
    pub movies: Mutex<ApiResult<Value>>,
    pub profile: Mutex<ApiResult<Value>>,
    pub login_response: Mutex<ApiResult<Value>>,
    pub register_response: Mutex<ApiResult<Value>>,
    /// Ids whose add/remove requests fail
    pub failing: Mutex<HashSet<String>>,
    pub fail_edit: Mutex<bool>,
    pub calls: Mutex<Vec<String>>,
    gate: Mutex<Option<Gate>>,
}

fn transport_error() -> ApiError {
    ApiError {
        status: None,
        message: "Http failure response for http://fake: connection refused".to_string(),
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            movies: Mutex::new(Ok(json!([]))),
            profile: Mutex::new(Ok(json!({ "Username": "neo", "FavoriteMovies": [] }))),
            login_response: Mutex::new(Ok(json!({ "user": { "Username": "neo" }, "token": "jwt" }))),
            register_response: Mutex::new(Ok(json!({ "Username": "neo" }))),
            failing: Mutex::new(HashSet::new()),
            fail_edit: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    pub fn with_movies(self, movies: Value) -> Self {
        *self.movies.lock().unwrap() = Ok(movies);
        self
    }

    pub fn with_profile(self, profile: Value) -> Self {
        *self.profile.lock().unwrap() = Ok(profile);
        self
    }

    pub fn fail_movies(&self) {
        *self.movies.lock().unwrap() = Err(transport_error());
    }

    pub fn fail_profile(&self) {
        *self.profile.lock().unwrap() = Err(transport_error());
    }

    pub fn fail_toggles_for(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn set_login_response(&self, response: ApiResult<Value>) {
        *self.login_response.lock().unwrap() = response;
    }

    /// The next gated call signals `entered` and waits for `release`
    pub fn pause_next_call(&self, entered: Sender<()>, release: Receiver<()>) {
        *self.gate.lock().unwrap() = Some(Gate { entered, release });
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn pause_point(&self) {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.entered.send(());
            let _ = gate.release.recv();
        }
    }

    fn mutate(&self, call: String, movie: &MovieId) -> ApiResult<()> {
        self.record(call);
        self.pause_point();
        if self.failing.lock().unwrap().contains(movie.as_str()) {
            Err(transport_error())
        } else {
            Ok(())
        }
    }
}

impl MovieApi for FakeApi {
    fn register(&self, user: &NewUser) -> ApiResult<Value> {
        self.record(format!("register {}", user.username));
        self.register_response.lock().unwrap().clone()
    }

    fn login(&self, credentials: &Credentials) -> ApiResult<Value> {
        self.record(format!("login {}", credentials.username));
        self.pause_point();
        self.login_response.lock().unwrap().clone()
    }

    fn movies(&self) -> ApiResult<Vec<Movie>> {
        self.record("movies".to_string());
        let body = self.movies.lock().unwrap().clone()?;
        Ok(body
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(Movie::from_value)
            .collect())
    }

    fn movie(&self, title: &str) -> ApiResult<Movie> {
        self.record(format!("movie {}", title));
        Ok(Movie::from_value(json!({ "_id": "m1", "Title": title })))
    }

    fn director(&self, name: &str) -> ApiResult<DirectorDetail> {
        self.record(format!("director {}", name));
        Ok(DirectorDetail::from_value(&json!({ "Name": name, "Bio": "Directs." }), name))
    }

    fn genre(&self, name: &str) -> ApiResult<GenreDetail> {
        self.record(format!("genre {}", name));
        Err(ApiError {
            status: Some(404),
            message: "Genre not found".to_string(),
        })
    }

    fn user(&self, username: &str) -> ApiResult<UserProfile> {
        self.record(format!("user {}", username));
        let body = self.profile.lock().unwrap().clone()?;
        Ok(UserProfile::from_value(&body))
    }

    fn edit_user(&self, username: &str, update: &ProfileUpdate) -> ApiResult<Value> {
        self.record(format!(
            "edit {} {}",
            username,
            serde_json::to_string(update).unwrap()
        ));
        if *self.fail_edit.lock().unwrap() {
            return Err(transport_error());
        }
        Ok(json!({}))
    }

    fn delete_user(&self, username: &str) -> ApiResult<()> {
        self.record(format!("delete {}", username));
        Ok(())
    }

    fn add_favorite(&self, username: &str, movie: &MovieId) -> ApiResult<()> {
        self.mutate(format!("add {} {}", username, movie), movie)
    }

    fn remove_favorite(&self, username: &str, movie: &MovieId) -> ApiResult<()> {
        self.mutate(format!("remove {} {}", username, movie), movie)
    }
}

/// Session state backed by memory, logged in as `user` when given
pub fn session_for(user: Option<&str>) -> Arc<SessionState> {
    let store = match user {
        Some(user) => MemorySessionStore::with_session(Session::new(user, "jwt")),
        None => MemorySessionStore::new(),
    };
    Arc::new(SessionState::new(Arc::new(store)))
}

pub fn notices() -> Arc<NoticeLog> {
    Arc::new(NoticeLog::new())
}
