//! Room error types

/// Error type for room operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomError {
    /// The room's event loop has stopped, so the request can't be delivered
    Closed,
}

impl std::fmt::Display for RoomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomError::Closed => write!(f, "Room event loop is not running"),
        }
    }
}

impl std::error::Error for RoomError {}
