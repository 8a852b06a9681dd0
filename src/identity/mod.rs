//! User identity and avatar resolution
//!
//! The login flow itself lives outside this crate. What it leaves behind is a
//! session holding [`UserData`]; this module turns that into a checked
//! [`Identity`] and resolves avatar URLs from it.

pub mod avatar;
pub mod session;
pub mod user_data;

pub use avatar::{Avatar, AvatarError};
pub use session::{Authenticator, SessionAuthenticator, SessionStore};
pub use user_data::{UserData, AVATAR_URL_KEY, EMAIL_KEY, FULL_NAME_KEY, USER_ID_KEY};

/// Authentication failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No session, or the session is unknown
    Unauthenticated,
    /// The session exists but a required field is missing or not a string
    InvalidIdentity(&'static str),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Unauthenticated => write!(f, "Request is not authenticated"),
            AuthError::InvalidIdentity(field) => {
                write!(f, "Session identity has no valid {} field", field)
            }
        }
    }
}

impl std::error::Error for AuthError {}

/// Snapshot of an authenticated user, attached to a connection at join time
///
/// `user_id` and `full_name` are checked when the identity is built, so code
/// past the auth gate never deals with missing or mistyped fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// User id
    pub user_id: String,
    /// Display name
    pub full_name: String,
    /// Everything the session holds, including avatar sources
    pub data: UserData,
}

impl Identity {
    /// Check and wrap session user data
    pub fn from_user_data(data: UserData) -> Result<Self, AuthError> {
        let user_id = data
            .str(USER_ID_KEY)
            .ok_or(AuthError::InvalidIdentity(USER_ID_KEY))?
            .to_owned();
        let full_name = data
            .str(FULL_NAME_KEY)
            .ok_or(AuthError::InvalidIdentity(FULL_NAME_KEY))?
            .to_owned();

        Ok(Self {
            user_id,
            full_name,
            data,
        })
    }

    /// Resolve this user's avatar URL, empty if the strategy finds none
    pub fn avatar_url(&self, avatar: Avatar) -> String {
        avatar.avatar_url_or_empty(&self.data)
    }
}
