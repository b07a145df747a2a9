//! Client for the myFlix REST API.
//!
//! Every operation issues exactly one request. Successful bodies are parsed
//! into the records in `models`; every failure goes through `normalize_error`
//! and comes back as a single human-readable message.

use crate::models::{
    Credentials, DirectorDetail, GenreDetail, Movie, MovieId, MovieRef, NewUser, ProfileUpdate,
    UserProfile,
};
use crate::session::SessionStore;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://movies-my-flix-application-7f3ae970a7e3.herokuapp.com/";

const FALLBACK_MESSAGE: &str = "Request failed; please try again later.";

/// A failed API call, reduced to one message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status, absent for transport failures
    pub status: Option<u16>,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Operations offered by the myFlix backend.
///
/// Views depend on this trait rather than on `HttpApi` so tests can script
/// the backend.
pub trait MovieApi: Send + Sync {
    /// `POST users`; returns the created user as sent by the backend
    fn register(&self, user: &NewUser) -> ApiResult<Value>;
    /// `POST login`; returns the raw `{ user, token }` response
    fn login(&self, credentials: &Credentials) -> ApiResult<Value>;
    fn movies(&self) -> ApiResult<Vec<Movie>>;
    fn movie(&self, title: &str) -> ApiResult<Movie>;
    fn director(&self, name: &str) -> ApiResult<DirectorDetail>;
    fn genre(&self, name: &str) -> ApiResult<GenreDetail>;
    fn user(&self, username: &str) -> ApiResult<UserProfile>;
    fn edit_user(&self, username: &str, update: &ProfileUpdate) -> ApiResult<Value>;
    fn delete_user(&self, username: &str) -> ApiResult<()>;
    fn add_favorite(&self, username: &str, movie: &MovieId) -> ApiResult<()>;
    fn remove_favorite(&self, username: &str, movie: &MovieId) -> ApiResult<()>;

    /// Favorites have no endpoint of their own: they are the profile's
    /// favorites field.
    fn favorite_movies(&self, username: &str) -> ApiResult<Vec<MovieRef>> {
        self.user(username).map(|user| user.favorites)
    }
}

/// Percent-encode one path segment
pub fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

pub struct HttpApi {
    base_url: String,
    agent: ureq::Agent,
    session: Arc<dyn SessionStore>,
}

impl HttpApi {
    pub fn new(base_url: &str, session: Arc<dyn SessionStore>) -> Self {
        Self::with_timeout(base_url, session, None)
    }

    /// No timeout means waiting on the transport indefinitely
    pub fn with_timeout(
        base_url: &str,
        session: Arc<dyn SessionStore>,
        timeout: Option<Duration>,
    ) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: builder.build(),
            session,
        }
    }

    /// `path` must already have its variable segments encoded
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Sent even when logged out: the backend rejects the empty bearer itself.
    fn bearer(&self) -> String {
        format!("Bearer {}", self.session.read().token.unwrap_or_default())
    }

    fn public(&self, method: &str, path: &str) -> ureq::Request {
        self.agent.request(method, &self.url(path))
    }

    fn protected(&self, method: &str, path: &str) -> ureq::Request {
        self.public(method, path)
            .set("Authorization", &self.bearer())
    }

    /// Request without a body
    fn call(&self, request: ureq::Request) -> ApiResult<Value> {
        let (method, url) = describe_request(&request);
        self.finish(&method, &url, request.call())
    }

    /// Request with a JSON body. A payload that fails to serialize is an
    /// error and nothing is sent.
    fn send<B: Serialize>(&self, request: ureq::Request, body: &B) -> ApiResult<Value> {
        let (method, url) = describe_request(&request);
        let bytes = match serde_json::to_vec(body) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%method, %url, error = %e, "request body not serializable");
                return Err(ApiError {
                    status: None,
                    message: format!("Could not encode request for {}: {}", url, e),
                });
            }
        };
        let request = request.set("Content-Type", "application/json");
        self.finish(&method, &url, request.send_bytes(&bytes))
    }

    fn finish(
        &self,
        method: &str,
        url: &str,
        result: Result<ureq::Response, ureq::Error>,
    ) -> ApiResult<Value> {
        let error = match result {
            Ok(resp) => match resp.into_string() {
                Ok(text) => return Ok(parse_body(&text)),
                Err(e) => normalize_error(url, None, "", "", &e.to_string()),
            },
            Err(ureq::Error::Status(code, resp)) => {
                let status_text = resp.status_text().to_string();
                let body = resp.into_string().unwrap_or_default();
                normalize_error(url, Some(code), &status_text, &body, "")
            }
            Err(ureq::Error::Transport(transport)) => {
                normalize_error(url, None, "", "", &transport.to_string())
            }
        };
        warn!(%method, %url, status = ?error.status, "API error: {}", error.message);
        Err(error)
    }
}

fn describe_request(request: &ureq::Request) -> (String, String) {
    let method = request.method().to_string();
    let url = request.url().to_string();
    debug!(%method, %url, "api request");
    (method, url)
}

/// Success bodies are JSON, plain text, or empty
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

impl MovieApi for HttpApi {
    fn register(&self, user: &NewUser) -> ApiResult<Value> {
        self.send(self.public("POST", "users"), user)
    }

    fn login(&self, credentials: &Credentials) -> ApiResult<Value> {
        self.send(self.public("POST", "login"), credentials)
    }

    fn movies(&self) -> ApiResult<Vec<Movie>> {
        let body = self.call(self.protected("GET", "movies"))?;
        match body {
            Value::Array(items) => Ok(items.into_iter().map(Movie::from_value).collect()),
            other => {
                debug!(body = %other, "movie list is not an array");
                Ok(Vec::new())
            }
        }
    }

    fn movie(&self, title: &str) -> ApiResult<Movie> {
        let path = format!("movies/{}", encode(title));
        let body = self.call(self.protected("GET", &path))?;
        Ok(Movie::from_value(body))
    }

    fn director(&self, name: &str) -> ApiResult<DirectorDetail> {
        let path = format!("directors/{}", encode(name));
        let body = self.call(self.protected("GET", &path))?;
        Ok(DirectorDetail::from_value(&body, name))
    }

    fn genre(&self, name: &str) -> ApiResult<GenreDetail> {
        let path = format!("genres/{}", encode(name));
        let body = self.call(self.protected("GET", &path))?;
        Ok(GenreDetail::from_value(&body, name))
    }

    fn user(&self, username: &str) -> ApiResult<UserProfile> {
        let path = format!("users/{}", encode(username));
        let body = self.call(self.protected("GET", &path))?;
        Ok(UserProfile::from_value(&body))
    }

    fn edit_user(&self, username: &str, update: &ProfileUpdate) -> ApiResult<Value> {
        let path = format!("users/{}", encode(username));
        self.send(self.protected("PUT", &path), update)
    }

    fn delete_user(&self, username: &str) -> ApiResult<()> {
        let path = format!("users/{}", encode(username));
        self.call(self.protected("DELETE", &path)).map(|_| ())
    }

    fn add_favorite(&self, username: &str, movie: &MovieId) -> ApiResult<()> {
        let path = format!(
            "users/{}/movies/{}",
            encode(username),
            encode(movie.as_str())
        );
        self.send(self.protected("POST", &path), &json!({}))
            .map(|_| ())
    }

    fn remove_favorite(&self, username: &str, movie: &MovieId) -> ApiResult<()> {
        let path = format!(
            "users/{}/movies/{}",
            encode(username),
            encode(movie.as_str())
        );
        self.call(self.protected("DELETE", &path)).map(|_| ())
    }
}

/// Reduce a failed call to one message.
///
/// Precedence: a string error body, the body's `message` field, its `errors`
/// field, then a generic transport message.
pub fn normalize_error(
    url: &str,
    status: Option<u16>,
    status_text: &str,
    body: &str,
    transport: &str,
) -> ApiError {
    let message = body_message(body)
        .or_else(|| match status {
            Some(code) => Some(
                format!("Http failure response for {}: {} {}", url, code, status_text)
                    .trim_end()
                    .to_string(),
            ),
            None if !transport.is_empty() => {
                Some(format!("Http failure response for {}: {}", url, transport))
            }
            None => None,
        })
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());

    ApiError { status, message }
}

/// The backend's own explanation, if the error body carries one
pub fn body_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(s)) => non_empty(s),
        Ok(Value::Object(map)) => map
            .get("message")
            .and_then(describe)
            .or_else(|| map.get("errors").and_then(describe)),
        Ok(_) => None,
        // Plain-text bodies are the message
        Err(_) => Some(trimmed.to_string()),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Render an error field; validation errors arrive as `[{ msg, param }]`
fn describe(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) => non_empty(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(describe).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        Value::Object(map) => map
            .get("msg")
            .or_else(|| map.get("message"))
            .and_then(describe)
            .or_else(|| Some(value.to_string())),
        other => Some(other.to_string()),
    }
}
