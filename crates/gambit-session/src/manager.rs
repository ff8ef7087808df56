//! The session manager: tracks every open connection's session.
//!
//! # Concurrency note
//!
//! `SessionManager` is a plain `HashMap` wrapper and is not thread-safe by
//! itself. The server keeps one behind a mutex; every method here is
//! synchronous so the lock is never held across an await.

use std::collections::HashMap;

use gambit_protocol::{Role, RoomCode, SessionId};

use crate::{Session, SessionError, SessionState};

/// Registry of open sessions, keyed by session id.
///
/// ```text
/// open() ──→ bind() ──→ assign() ──→ reassign()* ──→ unbind() / close()
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<SessionId, Session>,
}

impl SessionManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an unbound session for a freshly accepted connection.
    ///
    /// # Errors
    /// [`SessionError::AlreadyOpen`] if the id is already in use.
    pub fn open(&mut self, id: SessionId) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&id) {
            return Err(SessionError::AlreadyOpen(id));
        }
        let session = self.sessions.entry(id).or_insert_with(|| Session::new(id));
        tracing::debug!(session = %id, "session opened");
        Ok(session)
    }

    /// Binds a session to a room.
    pub fn bind(&mut self, id: SessionId, room: RoomCode) -> Result<(), SessionError> {
        self.get_mut(id)?.bind(room)
    }

    /// Records the role and name the room assigned to a session.
    pub fn assign(&mut self, id: SessionId, role: Role, name: String) -> Result<(), SessionError> {
        self.get_mut(id)?.assign(role, name)
    }

    /// Updates the role of an already-named session.
    pub fn reassign(&mut self, id: SessionId, role: Role) -> Result<(), SessionError> {
        let session = self.get_mut(id)?;
        session.reassign(role)?;
        tracing::debug!(session = %id, %role, "session role changed");
        Ok(())
    }

    /// Returns a session to `Unbound` and hands back what it was bound to.
    pub fn unbind(&mut self, id: SessionId) -> Result<SessionState, SessionError> {
        Ok(self.get_mut(id)?.unbind())
    }

    /// Removes a session when its connection ends.
    ///
    /// The returned session carries the last known room, role and name so
    /// the caller can reconcile the room it leaves behind.
    pub fn close(&mut self, id: SessionId) -> Result<Session, SessionError> {
        let session = self.sessions.remove(&id).ok_or(SessionError::NotFound(id))?;
        tracing::debug!(session = %id, "session closed");
        Ok(session)
    }

    /// Looks up a session.
    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Returns the number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no sessions are open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn get_mut(&mut self, id: SessionId) -> Result<&mut Session, SessionError> {
        self.sessions.get_mut(&id).ok_or(SessionError::NotFound(id))
    }
}
