//! Error types for the room layer.

use gambit_protocol::{RoomCode, SessionId};

/// Errors that can occur during room operations.
///
/// Every variant is recoverable where it is detected; none of them takes
/// a room or the process down.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist, or was deleted while the caller still
    /// held its handle.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// No room can be created: the registry is at its room limit, or
    /// every code tried was already live.
    #[error("no room can be created with {live} rooms live")]
    CapacityExhausted { live: usize },

    /// The display name collides, case-insensitively, with a member.
    #[error("username {0:?} is taken")]
    UsernameTaken(String),

    /// The display name is empty after trimming.
    #[error("invalid username {0:?}")]
    InvalidName(String),

    /// A game cannot start with an empty seat.
    #[error("both seats must be filled to start")]
    InsufficientPlayers,

    /// The session is not bound to this room.
    #[error("session {0} is not a member of room {1}")]
    NotAMember(SessionId, RoomCode),

    /// The session is already bound to this room.
    #[error("session {0} is already a member of room {1}")]
    AlreadyMember(SessionId, RoomCode),

    /// The session already picked a name in this room.
    #[error("session {0} already has a name")]
    AlreadyNamed(SessionId),

    /// A trade named someone who is not seated, or not queued.
    #[error("invalid trade: {0}")]
    InvalidTrade(String),
}
