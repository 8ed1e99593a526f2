//! Session handle and the abstract store boundary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time;
use uuid::Uuid;

use crate::config::SessionConfig;

/// Errors raised by session backends.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backend could not load or persist the session.
    #[error("session backend error: {0}")]
    Backend(String),

    /// A value could not be (de)serialized.
    #[error("session value error: {0}")]
    Value(#[from] serde_json::Error),

    /// The Set-Cookie header could not be built.
    #[error("invalid session cookie: {0}")]
    Cookie(String),
}

/// Abstract session storage keyed by a cookie name.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session referenced by the request cookies, or a fresh one.
    async fn load(&self, headers: &HeaderMap, name: &str) -> Result<Session, SessionError>;

    /// Persist `session` and write its cookie into the response headers.
    async fn save(&self, response: &mut HeaderMap, name: &str, session: &Session) -> Result<(), SessionError>;

    /// Drop expired sessions, returning how many went. Backends that expire
    /// entries on their own keep the default.
    fn purge_expired(&self) -> usize {
        0
    }
}

/// Purge `store` every `every` until `shutdown` fires.
pub async fn run_purge(store: Arc<dyn SessionStore>, every: Duration, mut shutdown: broadcast::Receiver<()>) {
    tracing::debug!(interval_secs = every.as_secs_f64(), "Session purge started");
    let mut ticker = time::interval(every);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let purged = store.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "Expired sessions purged");
                }
            }
            _ = shutdown.recv() => {
                tracing::debug!("Session purge stopped");
                break;
            }
        }
    }
}

#[derive(Debug)]
struct SessionState {
    id: String,
    values: HashMap<String, Value>,
    dirty: bool,
    is_new: bool,
}

/// Per-request session handle.
///
/// Clones share state. Any mutation marks the session dirty so that the
/// dispatcher knows to flush it.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

impl Session {
    /// A fresh, unsaved session with a random id.
    pub fn new() -> Self {
        Self::from_state(Uuid::new_v4().to_string(), HashMap::new(), true)
    }

    /// A session restored from a backend.
    pub fn restore(id: impl Into<String>, values: HashMap<String, Value>) -> Self {
        Self::from_state(id.into(), values, false)
    }

    fn from_state(id: String, values: HashMap<String, Value>, is_new: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                id,
                values,
                dirty: false,
                is_new,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // A panicking controller must not poison the session for the flush.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> String {
        self.state().id.clone()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.state().values.get(key).cloned()
    }

    /// Typed read; `Ok(None)` when the key is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        match self.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Serialize) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        let mut state = self.state();
        state.values.insert(key.into(), value);
        state.dirty = true;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut state = self.state();
        let removed = state.values.remove(key);
        if removed.is_some() {
            state.dirty = true;
        }
        removed
    }

    pub fn clear(&self) {
        let mut state = self.state();
        if !state.values.is_empty() {
            state.values.clear();
            state.dirty = true;
        }
    }

    /// Whether the session was mutated since it was loaded or saved.
    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    /// Whether the session has never been persisted.
    pub fn is_new(&self) -> bool {
        self.state().is_new
    }

    /// Copy of all values, for backends.
    pub fn values(&self) -> HashMap<String, Value> {
        self.state().values.clone()
    }

    /// Record a successful save.
    pub fn mark_saved(&self) {
        let mut state = self.state();
        state.dirty = false;
        state.is_new = false;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Cookie attributes written with the session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: String,
    pub max_age_secs: u64,
    pub secure: bool,
    pub http_only: bool,
}

impl CookieOptions {
    /// Render a `Set-Cookie` value.
    pub fn set_cookie(&self, name: &str, value: &str) -> String {
        let mut cookie = format!("{name}={value}; Path={}; Max-Age={}", self.path, self.max_age_secs);
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for CookieOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            path: config.path.clone(),
            max_age_secs: config.max_age_secs,
            secure: config.secure,
            http_only: true,
        }
    }
}

/// Find the value of cookie `name` across all `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}
