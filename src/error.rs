//! Error types

use std::fmt;
use std::io;

use crate::room::RoomError;
use crate::server::ConfigError;

/// Crate-level error
#[derive(Debug)]
pub enum Error {
    /// Binding or serving the listener failed
    Io(io::Error),
    /// The room could not be reached
    Room(RoomError),
    /// Invalid configuration
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Room(e) => write!(f, "Room error: {}", e),
            Error::Config(e) => write!(f, "Config error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Room(e) => Some(e),
            Error::Config(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<RoomError> for Error {
    fn from(e: RoomError) -> Self {
        Error::Room(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;
