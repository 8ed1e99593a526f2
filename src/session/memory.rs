//! In-memory session backend.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use dashmap::DashMap;
use serde_json::Value;

use crate::session::store::{cookie_value, CookieOptions, Session, SessionError, SessionStore};

struct StoredSession {
    values: HashMap<String, Value>,
    expires_at: Instant,
}

/// Process-local store. Sessions expire after the cookie `Max-Age`.
pub struct MemorySessionStore {
    sessions: DashMap<String, StoredSession>,
    options: CookieOptions,
}

impl MemorySessionStore {
    pub fn new(options: CookieOptions) -> Self {
        Self {
            sessions: DashMap::new(),
            options,
        }
    }

    /// Number of stored (possibly expired) sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(CookieOptions::default())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, headers: &HeaderMap, name: &str) -> Result<Session, SessionError> {
        let Some(id) = cookie_value(headers, name) else {
            return Ok(Session::new());
        };

        let now = Instant::now();
        // the read guard must be gone before the map is written to
        let values = self
            .sessions
            .get(id)
            .map(|stored| (stored.expires_at > now).then(|| stored.values.clone()));

        match values {
            Some(Some(values)) => Ok(Session::restore(id, values)),
            Some(None) => {
                self.sessions.remove_if(id, |_, stored| stored.expires_at <= now);
                tracing::debug!(cookie = name, "Expired session evicted, starting a new one");
                Ok(Session::new())
            }
            None => {
                tracing::debug!(cookie = name, "Unknown session, starting a new one");
                Ok(Session::new())
            }
        }
    }

    async fn save(&self, response: &mut HeaderMap, name: &str, session: &Session) -> Result<(), SessionError> {
        let id = session.id();
        let cookie = HeaderValue::from_str(&self.options.set_cookie(name, &id))
            .map_err(|e| SessionError::Cookie(e.to_string()))?;
        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(self.options.max_age_secs))
            .ok_or_else(|| SessionError::Backend(format!("max age of {}s is out of range", self.options.max_age_secs)))?;

        self.sessions.insert(
            id,
            StoredSession {
                values: session.values(),
                expires_at,
            },
        );
        response.append(SET_COOKIE, cookie);
        session.mark_saved();
        Ok(())
    }

    fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let now = Instant::now();
        self.sessions.retain(|_, stored| stored.expires_at > now);
        before.saturating_sub(self.sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::header::COOKIE;
    use tokio::sync::broadcast;

    use crate::session::store::run_purge;

    #[tokio::test]
    async fn test_load_without_cookie_creates_session() {
        let store = MemorySessionStore::default();
        let session = store.load(&HeaderMap::new(), "sid").await.unwrap();
        assert!(session.is_new());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let store = MemorySessionStore::default();
        let session = store.load(&HeaderMap::new(), "sid").await.unwrap();
        session.insert("cart", vec![1, 2]).unwrap();

        let mut response = HeaderMap::new();
        store
            .save(&mut response, "sid", &session)
            .await
            .unwrap();
        assert!(!session.is_dirty());

        let cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with(&format!("sid={}", session.id())));

        let mut request = HeaderMap::new();
        request.insert(COOKIE, HeaderValue::from_str(&format!("sid={}", session.id())).unwrap());
        let reloaded = store.load(&request, "sid").await.unwrap();
        assert!(!reloaded.is_new());
        assert_eq!(reloaded.id(), session.id());
        assert_eq!(reloaded.get_as::<Vec<i32>>("cart").unwrap(), Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_unknown_cookie_gets_fresh_session() {
        let store = MemorySessionStore::default();
        let mut request = HeaderMap::new();
        request.insert(COOKIE, HeaderValue::from_static("sid=forged"));
        let session = store.load(&request, "sid").await.unwrap();
        assert!(session.is_new());
        assert_ne!(session.id(), "forged");
    }

    #[tokio::test]
    async fn test_expired_session_is_evicted_on_load() {
        let store = MemorySessionStore::new(CookieOptions {
            max_age_secs: 0,
            ..CookieOptions::default()
        });
        let session = Session::new();
        session.insert("k", "v").unwrap();
        store
            .save(&mut HeaderMap::new(), "sid", &session)
            .await
            .unwrap();
        assert_eq!(store.len(), 1);

        let mut request = HeaderMap::new();
        request.insert(COOKIE, HeaderValue::from_str(&format!("sid={}", session.id())).unwrap());
        assert!(store.load(&request, "sid").await.unwrap().is_new());

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_purge_drops_only_expired() {
        let expired = MemorySessionStore::new(CookieOptions {
            max_age_secs: 0,
            ..CookieOptions::default()
        });
        for _ in 0..3 {
            let session = Session::new();
            session.insert("k", 1).unwrap();
            expired.save(&mut HeaderMap::new(), "sid", &session).await.unwrap();
        }
        assert_eq!(expired.len(), 3);
        assert_eq!(expired.purge_expired(), 3);
        assert!(expired.is_empty());

        let live = MemorySessionStore::default();
        let session = Session::new();
        session.insert("k", 1).unwrap();
        live.save(&mut HeaderMap::new(), "sid", &session).await.unwrap();
        assert_eq!(live.purge_expired(), 0);
        assert_eq!(live.len(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_max_age_fails_save() {
        let store = MemorySessionStore::new(CookieOptions {
            max_age_secs: u64::MAX,
            ..CookieOptions::default()
        });
        let session = Session::new();
        session.insert("k", "v").unwrap();

        let mut response = HeaderMap::new();
        let err = store.save(&mut response, "sid", &session).await.unwrap_err();
        assert!(matches!(err, SessionError::Backend(_)));
        assert!(response.get(SET_COOKIE).is_none());
        assert!(session.is_dirty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_purge_loop_shrinks_store_until_shutdown() {
        let store = Arc::new(MemorySessionStore::new(CookieOptions {
            max_age_secs: 0,
            ..CookieOptions::default()
        }));
        for _ in 0..2 {
            let session = Session::new();
            session.insert("k", 1).unwrap();
            store.save(&mut HeaderMap::new(), "sid", &session).await.unwrap();
        }
        assert_eq!(store.len(), 2);

        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(run_purge(store.clone(), Duration::from_millis(10), rx));

        tokio::time::timeout(Duration::from_secs(5), async {
            while !store.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("store was never purged");

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("purge loop did not stop")
            .unwrap();
    }
}
