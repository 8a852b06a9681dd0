//! Session-bound user data
//!
//! Whatever the login flow stored for a user, as loosely typed JSON values.
//! [`Identity`](super::Identity) is the checked view over it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key holding the user's id
pub const USER_ID_KEY: &str = "UserID";

/// Key holding the user's display name
pub const FULL_NAME_KEY: &str = "FullName";

/// Key holding an avatar URL from the identity provider
pub const AVATAR_URL_KEY: &str = "AvatarURL";

/// Key holding the user's email address
pub const EMAIL_KEY: &str = "Email";

/// Loosely typed user data stored with a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserData(Map<String, Value>);

impl UserData {
    /// Create empty user data
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Set a value, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get a raw value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a value only if it is a string
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Get a value only if it is a non-empty string
    pub fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.str(key).filter(|s| !s.is_empty())
    }
}

impl From<Map<String, Value>> for UserData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
