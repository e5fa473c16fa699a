//! Session store holding each visitor's lists.
//!
//! This module provides an in-memory session store with sliding TTL
//! management. A browser is identified by an opaque token carried in a
//! cookie; the token maps to that visitor's [`SessionData`].
//!
//! # Token Format
//!
//! Session tokens are 32 bytes of cryptographically secure random data,
//! base64-url encoded without padding, resulting in 43 character tokens.
//!
//! # Thread Safety
//!
//! [`SessionStore`] is cheap to clone; clones share the same map behind an
//! `Arc<RwLock<_>>`. Each call to [`SessionStore::with_session`] runs under
//! the write lock, so a single request's changes are applied atomically.
//! Requests from two tabs are still last-write-wins.
//!
//! # Example
//!
//! ```rust
//! use listkeeper_server::session::{SessionStore, SessionStoreConfig};
//!
//! let store = SessionStore::new(SessionStoreConfig::default());
//! let token = store.create_session().expect("store has capacity");
//!
//! store
//!     .with_session(&token, |data| data.lists.clear())
//!     .expect("session exists");
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::types::SessionData;

/// Default idle session lifetime (one day).
const DEFAULT_TTL_SECS: u64 = 86_400;

/// Default maximum number of sessions.
const DEFAULT_MAX_CAPACITY: usize = 10_000;

/// Size of the random token in bytes.
const TOKEN_BYTES: usize = 32;

/// Expected length of base64-url encoded token (43 characters).
const TOKEN_LENGTH: usize = 43;

/// Errors that can occur during session operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session store has reached maximum capacity.
    #[error("session store at maximum capacity ({max_capacity} sessions)")]
    AtCapacity {
        /// The maximum number of sessions allowed.
        max_capacity: usize,
    },

    /// The session token was not found or has expired.
    #[error("session not found or expired")]
    NotFound,
}

/// Configuration for the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStoreConfig {
    /// Maximum number of concurrent sessions.
    pub max_capacity: usize,

    /// Idle time after which a session expires.
    pub ttl: Duration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_MAX_CAPACITY,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }
}

impl SessionStoreConfig {
    pub fn new(max_capacity: usize, ttl: Duration) -> Self {
        Self { max_capacity, ttl }
    }
}

/// A visitor's session and its expiry bookkeeping.
#[derive(Debug, Clone)]
pub struct Session {
    /// The visitor's lists and pending flash.
    pub data: SessionData,

    /// When the session expires unless touched again.
    pub expires_at: Instant,
}

impl Session {
    fn new(ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            data: SessionData::default(),
            expires_at: now + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Pushes the expiry out to `ttl` from now.
    fn touch(&mut self, ttl: Duration) {
        self.expires_at = Instant::now() + ttl;
    }
}

/// Thread-safe in-memory session store.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    config: SessionStoreConfig,
}

impl SessionStore {
    /// Creates a new session store with the given configuration.
    pub fn new(config: SessionStoreConfig) -> Self {
        debug!(
            max_capacity = config.max_capacity,
            ttl_secs = config.ttl.as_secs(),
            "Creating new session store"
        );
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates an empty session and returns its token.
    ///
    /// When the store is full, expired sessions are swept first; only if it
    /// is still full is the new session refused.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AtCapacity`] if the store has reached
    /// its maximum capacity.
    pub fn create_session(&self) -> Result<String, SessionError> {
        // Generate token first (outside of lock)
        let token = generate_session_token();

        let mut sessions = self.write();

        if sessions.len() >= self.config.max_capacity {
            sessions.retain(|_, session| !session.is_expired());
        }

        if sessions.len() >= self.config.max_capacity {
            warn!(
                capacity = sessions.len(),
                max_capacity = self.config.max_capacity,
                "Session store at capacity, rejecting new session"
            );
            return Err(SessionError::AtCapacity {
                max_capacity: self.config.max_capacity,
            });
        }

        sessions.insert(token.clone(), Session::new(self.config.ttl));
        trace!(session_count = sessions.len(), "Created new session");

        Ok(token)
    }

    /// Returns `true` if `token` names a live session.
    ///
    /// Expired sessions are removed as a side effect.
    pub fn is_valid(&self, token: &str) -> bool {
        if token.len() != TOKEN_LENGTH {
            trace!(token_len = token.len(), "Invalid token length");
            return false;
        }

        {
            let sessions = self.read();
            match sessions.get(token) {
                Some(session) if !session.is_expired() => return true,
                Some(_) => {}
                None => return false,
            }
        }

        self.write().remove(token);
        trace!("Removed expired session during validation");
        false
    }

    /// Runs `f` against the session's data under the write lock and refreshes
    /// the session's TTL.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] if the token is unknown or expired.
    pub fn with_session<R>(
        &self,
        token: &str,
        f: impl FnOnce(&mut SessionData) -> R,
    ) -> Result<R, SessionError> {
        let mut sessions = self.write();

        let session = sessions.get_mut(token).ok_or(SessionError::NotFound)?;
        if session.is_expired() {
            sessions.remove(token);
            return Err(SessionError::NotFound);
        }

        session.touch(self.config.ttl);
        Ok(f(&mut session.data))
    }

    /// Returns a copy of the session's data, without refreshing its TTL.
    pub fn snapshot(&self, token: &str) -> Option<SessionData> {
        self.read()
            .get(token)
            .filter(|session| !session.is_expired())
            .map(|session| session.data.clone())
    }

    /// Returns the current number of sessions in the store.
    ///
    /// Note: This count may include expired sessions that haven't been
    /// cleaned up yet.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns the number of expired sessions in the store.
    pub fn count_expired(&self) -> usize {
        self.read().values().filter(|s| s.is_expired()).count()
    }

    /// Returns the number of available slots.
    pub fn available_capacity(&self) -> usize {
        self.config.max_capacity.saturating_sub(self.len())
    }

    /// Removes all expired sessions from the store.
    ///
    /// Returns the number of sessions that were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.write();
        let initial_len = sessions.len();

        sessions.retain(|_, session| !session.is_expired());

        let removed = initial_len - sessions.len();

        if removed > 0 {
            debug!(
                removed_count = removed,
                remaining_count = sessions.len(),
                "Cleaned up expired sessions"
            );
        }

        removed
    }

    /// Spawns a background task that periodically removes expired sessions.
    ///
    /// The task runs until the returned handle is aborted.
    pub fn spawn_cleanup_task(&self, cleanup_interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval);

            loop {
                interval.tick().await;
                store.cleanup_expired();
            }
        })
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionStoreConfig::default())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session_count", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Generates a cryptographically secure session token.
fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Finds the value of cookie `name` in the request's `Cookie` headers.
pub fn token_from_cookies(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Builds the `Set-Cookie` value for a session token.
///
/// The cookie has no `Max-Age`, so it lasts for the browser session; the
/// server-side TTL bounds how long the data behind it survives.
pub fn session_cookie(name: &str, token: &str, secure: bool) -> String {
    let mut cookie = format!("{name}={token}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
