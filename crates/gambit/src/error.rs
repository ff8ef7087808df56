//! Unified error type for the Gambit server.

use gambit_protocol::{ProtocolError, SessionId};
use gambit_room::RoomError;
use gambit_session::SessionError;
use gambit_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls,
/// so `?` converts layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GambitError {
    /// Binding, accepting, or moving frames over a connection.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding a frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session moved through its lifecycle out of order.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room operation was rejected.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A send did not finish within the keepalive budget; the peer has
    /// stopped reading.
    #[error("send to session {0} timed out")]
    SendTimeout(SessionId),
}

impl GambitError {
    /// The `Error` payload code reported to a client for this error.
    ///
    /// 400 for a bad request, 409 for a request that conflicts with the
    /// session's current state, 503 when no room code is free.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Room(RoomError::CapacityExhausted { .. }) => 503,
            Self::Room(RoomError::AlreadyMember(..) | RoomError::AlreadyNamed(_))
            | Self::Session(
                SessionError::AlreadyOpen(_)
                | SessionError::AlreadyBound(..)
                | SessionError::AlreadyAssigned(_),
            ) => 409,
            _ => 400,
        }
    }
}
