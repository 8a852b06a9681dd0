//! Avatar URL resolution
//!
//! Two strategies, picked by deployment configuration:
//! - [`Avatar::ProvidedUrl`] uses the URL the identity provider handed over
//! - [`Avatar::Gravatar`] derives a Gravatar URL from the user's email

use md5::{Digest, Md5};

use super::user_data::{UserData, AVATAR_URL_KEY, EMAIL_KEY};

/// Base of every Gravatar URL
pub const GRAVATAR_BASE_URL: &str = "https://www.gravatar.com/avatar/";

/// Error returned when no avatar URL can be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarError {
    /// The source value is missing, not a string, or empty
    NoAvatarUrl,
}

impl std::fmt::Display for AvatarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AvatarError::NoAvatarUrl => write!(f, "unable to get avatar url"),
        }
    }
}

impl std::error::Error for AvatarError {}

/// Avatar URL strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Avatar {
    /// Read the `AvatarURL` value stored with the session
    #[default]
    ProvidedUrl,
    /// Hash the `Email` value stored with the session into a Gravatar URL
    Gravatar,
}

impl Avatar {
    /// Resolve the avatar URL for a user
    pub fn avatar_url(&self, data: &UserData) -> Result<String, AvatarError> {
        match self {
            Avatar::ProvidedUrl => data
                .non_empty_str(AVATAR_URL_KEY)
                .map(str::to_owned)
                .ok_or(AvatarError::NoAvatarUrl),
            Avatar::Gravatar => data
                .non_empty_str(EMAIL_KEY)
                .map(gravatar_url)
                .ok_or(AvatarError::NoAvatarUrl),
        }
    }

    /// Resolve the avatar URL, or an empty string if there is none
    pub fn avatar_url_or_empty(&self, data: &UserData) -> String {
        self.avatar_url(data).unwrap_or_default()
    }
}

impl std::str::FromStr for Avatar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openid" | "provided" | "provided-url" => Ok(Avatar::ProvidedUrl),
            "gravatar" => Ok(Avatar::Gravatar),
            other => Err(format!("unknown avatar strategy: {}", other)),
        }
    }
}

impl std::fmt::Display for Avatar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Avatar::ProvidedUrl => write!(f, "provided-url"),
            Avatar::Gravatar => write!(f, "gravatar"),
        }
    }
}

/// Gravatar URL for an email: MD5 of the lower-cased address, lowercase hex
fn gravatar_url(email: &str) -> String {
    let digest = Md5::digest(email.to_lowercase().as_bytes());
    format!("{}{:x}", GRAVATAR_BASE_URL, digest)
}
