//! Session types: what the server remembers about one connection.

use gambit_protocol::{Role, RoomCode, SessionId};

use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where a connection stands with respect to rooms.
///
/// - **Unbound**: may only use the lobby and `joinRoom`.
/// - **Bound**: has selected a room and receives its broadcasts, but has
///   not picked a display name. The room counts it as a pending join.
/// - **Assigned**: holds a role and a display name in the room.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unbound,
    Bound {
        room: RoomCode,
    },
    Assigned {
        room: RoomCode,
        role: Role,
        name: String,
    },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single connection's session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub state: SessionState,
}

impl Session {
    /// Creates an unbound session.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            state: SessionState::Unbound,
        }
    }

    /// The room this session is bound to, if any.
    pub fn room(&self) -> Option<&RoomCode> {
        match &self.state {
            SessionState::Unbound => None,
            SessionState::Bound { room } | SessionState::Assigned { room, .. } => Some(room),
        }
    }

    /// The role held in the room, once assigned.
    pub fn role(&self) -> Option<Role> {
        match &self.state {
            SessionState::Assigned { role, .. } => Some(*role),
            _ => None,
        }
    }

    /// The display name, once assigned.
    pub fn name(&self) -> Option<&str> {
        match &self.state {
            SessionState::Assigned { name, .. } => Some(name),
            _ => None,
        }
    }

    /// `Unbound → Bound`.
    pub fn bind(&mut self, room: RoomCode) -> Result<(), SessionError> {
        if let Some(current) = self.room() {
            return Err(SessionError::AlreadyBound(self.id, current.clone()));
        }
        self.state = SessionState::Bound { room };
        Ok(())
    }

    /// `Bound → Assigned`.
    pub fn assign(&mut self, role: Role, name: String) -> Result<(), SessionError> {
        match std::mem::take(&mut self.state) {
            SessionState::Bound { room } => {
                self.state = SessionState::Assigned { room, role, name };
                Ok(())
            }
            SessionState::Unbound => Err(SessionError::NotBound(self.id)),
            assigned @ SessionState::Assigned { .. } => {
                self.state = assigned;
                Err(SessionError::AlreadyAssigned(self.id))
            }
        }
    }

    /// Changes the role of an assigned session, e.g. after a promotion
    /// or a trade with a spectator. The name is kept.
    pub fn reassign(&mut self, new_role: Role) -> Result<(), SessionError> {
        match &mut self.state {
            SessionState::Assigned { role, .. } => {
                *role = new_role;
                Ok(())
            }
            _ => Err(SessionError::NotAssigned(self.id)),
        }
    }

    /// Returns to `Unbound`, handing back the state that was left.
    pub fn unbind(&mut self) -> SessionState {
        std::mem::take(&mut self.state)
    }
}
