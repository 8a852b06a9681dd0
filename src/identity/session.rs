//! Session store and cookie authentication
//!
//! The store is built once at startup and handed to whoever needs it. It is
//! never reachable through a global.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::http::{header, HeaderMap};
use uuid::Uuid;

use super::{AuthError, Identity, UserData};

/// Default name of the session cookie
pub const DEFAULT_SESSION_COOKIE: &str = "CHAT_SESSION";

/// Resolves the identity behind an incoming request
pub trait Authenticator: Send + Sync + 'static {
    /// Authenticate a request from its headers
    fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError>;
}

/// In-memory session store, keyed by session id
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, UserData>>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store user data under a fresh session id and return the id
    pub fn create_session(&self, data: UserData) -> String {
        let id = Uuid::new_v4().to_string();
        self.insert(id.clone(), data);
        id
    }

    /// Store user data under a given session id
    pub fn insert(&self, id: impl Into<String>, data: UserData) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(id.into(), data);
    }

    /// Look up a session
    pub fn get(&self, id: &str) -> Option<UserData> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(id).cloned()
    }

    /// Drop a session
    pub fn remove(&self, id: &str) -> Option<UserData> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(id)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the store holds no sessions
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Authenticates requests by the session cookie
#[derive(Debug, Clone)]
pub struct SessionAuthenticator {
    store: SessionStore,
    cookie_name: String,
}

impl SessionAuthenticator {
    /// Create an authenticator reading the given cookie
    pub fn new(store: SessionStore, cookie_name: impl Into<String>) -> Self {
        Self {
            store,
            cookie_name: cookie_name.into(),
        }
    }
}

impl Authenticator for SessionAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let session_id = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .find_map(|h| cookie_value(h, &self.cookie_name))
            .ok_or(AuthError::Unauthenticated)?;

        let data = self
            .store
            .get(session_id)
            .ok_or(AuthError::Unauthenticated)?;

        Identity::from_user_data(data)
    }
}

/// Find a cookie's value in a `Cookie` header
fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').map(str::trim).find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key.trim() == name {
            Some(value.trim())
        } else {
            None
        }
    })
}
