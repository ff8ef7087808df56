//! Error types for the session layer.

use gambit_protocol::{RoomCode, SessionId};

/// Errors raised when a request does not fit the session's current state.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for this id.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// A session with this id is already open.
    #[error("session {0} is already open")]
    AlreadyOpen(SessionId),

    /// The session is already bound to a room and must leave it first.
    #[error("session {0} is already in room {1}")]
    AlreadyBound(SessionId, RoomCode),

    /// The request needs a room but the session has not joined one.
    #[error("session {0} is not in a room")]
    NotBound(SessionId),

    /// The session already picked a display name in its room.
    #[error("session {0} already has a name in this room")]
    AlreadyAssigned(SessionId),

    /// The request needs a display name but the session has none yet.
    #[error("session {0} has not picked a name yet")]
    NotAssigned(SessionId),
}
