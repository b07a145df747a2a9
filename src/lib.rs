//! myflix: terminal client for the myFlix movie API.
//!
//! The library holds the session/favorites model and the views; the `myflix`
//! binary drives them from an interactive prompt.

pub mod api;
pub mod app;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod favorites;
pub mod models;
pub mod notice;
pub mod profile;
pub mod router;
pub mod session;
pub mod validation;
pub mod welcome;

#[cfg(test)]
mod testing;

use std::sync::{Mutex, MutexGuard};

/// Lock a view mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
