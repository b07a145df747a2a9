//! Session storage: the `user` and `token` slots that identify the active user.
//!
//! Storage sits behind the `SessionStore` trait so views never touch the
//! backing file directly. The file store re-reads its document on every
//! `read()`, so a login or logout made by another process is picked up at
//! the next refresh.

use crate::lock;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// The (username, token) pair identifying the active user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "user", default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Session {
    pub fn new(username: &str, token: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            token: Some(token.to_string()),
        }
    }

    /// A session without a token is anonymous, whatever the username slot says.
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Username of the authenticated user, if any
    pub fn active_user(&self) -> Option<&str> {
        if !self.is_authenticated() {
            return None;
        }
        self.username.as_deref().filter(|u| !u.is_empty())
    }
}

pub type SessionListener = Box<dyn Fn(&Session) + Send + Sync>;

/// Persistent session slots
pub trait SessionStore: Send + Sync {
    fn read(&self) -> Session;
    fn set(&self, username: &str, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
    /// Register a callback run with the new session after every `set`/`clear`
    fn subscribe(&self, listener: SessionListener);
}

#[derive(Default)]
struct Listeners(Mutex<Vec<SessionListener>>);

impl Listeners {
    fn add(&self, listener: SessionListener) {
        lock(&self.0).push(listener);
    }

    fn notify(&self, session: &Session) {
        for listener in lock(&self.0).iter() {
            listener(session);
        }
    }
}

/// Session slots kept in a small JSON document on disk
pub struct FileSessionStore {
    path: PathBuf,
    listeners: Listeners,
}

impl FileSessionStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            listeners: Listeners::default(),
        }
    }

    fn load(&self) -> Result<Session> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Session::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };
        if content.trim().is_empty() {
            return Ok(Session::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid session file {}", self.path.display()))
    }
}

/// The file holds a bearer token: owner read/write only, also when it
/// already existed with wider permissions.
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(content.as_bytes())
}

impl SessionStore for FileSessionStore {
    fn read(&self) -> Session {
        match self.load() {
            Ok(session) => session,
            Err(e) => {
                warn!("{:#}; treating session as anonymous", e);
                Session::default()
            }
        }
    }

    fn set(&self, username: &str, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let session = Session::new(username, token);
        let content = serde_json::to_string_pretty(&session)?;
        write_private(&self.path, &content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        debug!(user = username, path = %self.path.display(), "session stored");
        self.listeners.notify(&session);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to remove {}", self.path.display()))
            }
        }
        debug!(path = %self.path.display(), "session cleared");
        self.listeners.notify(&Session::default());
        Ok(())
    }

    fn subscribe(&self, listener: SessionListener) {
        self.listeners.add(listener);
    }
}

/// In-process session slots
#[derive(Default)]
pub struct MemorySessionStore {
    slots: Mutex<Session>,
    listeners: Listeners,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            slots: Mutex::new(session),
            listeners: Listeners::default(),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self) -> Session {
        lock(&self.slots).clone()
    }

    fn set(&self, username: &str, token: &str) -> Result<()> {
        let session = Session::new(username, token);
        *lock(&self.slots) = session.clone();
        self.listeners.notify(&session);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *lock(&self.slots) = Session::default();
        self.listeners.notify(&Session::default());
        Ok(())
    }

    fn subscribe(&self, listener: SessionListener) {
        self.listeners.add(listener);
    }
}

/// The in-memory view of the session shared by every view.
///
/// Writes made through the store are mirrored immediately; writes made
/// elsewhere become visible at the next `refresh()`.
pub struct SessionState {
    store: Arc<dyn SessionStore>,
    current: Arc<Mutex<Session>>,
}

impl SessionState {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let current = Arc::new(Mutex::new(store.read()));
        let mirror = Arc::clone(&current);
        store.subscribe(Box::new(move |session| {
            *lock(&mirror) = session.clone();
        }));
        Self { store, current }
    }

    pub fn current(&self) -> Session {
        lock(&self.current).clone()
    }

    /// Re-read storage into the in-memory copy
    pub fn refresh(&self) -> Session {
        let session = self.store.read();
        let mut current = lock(&self.current);
        if *current != session {
            debug!(user = ?session.username, "session changed outside this view");
        }
        *current = session.clone();
        session
    }

    pub fn login(&self, username: &str, token: &str) -> Result<()> {
        self.store.set(username, token)
    }

    pub fn logout(&self) -> Result<()> {
        self.store.clear()
    }
}
