//! Room registry: creates, finds and deletes rooms by code.

use std::collections::HashMap;

use gambit_protocol::{RoomCode, SessionId};

use crate::room::spawn_room;
use crate::{LeaveOutcome, MemberSender, RegistryConfig, RoomError, RoomHandle, code};

/// Every live room, keyed by code.
///
/// The registry is a plain struct; callers share it behind one lock.
/// Operations that can delete a room (`leave`, `delete`) and the one that
/// must never race a deletion (`begin_join`) take `&mut self`, so holding
/// that lock across the call is what keeps a join from landing in a room
/// that is being collected.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, RoomHandle>,
    config: RegistryConfig,
}

impl RoomRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
        }
    }

    /// Creates a room under a fresh random code.
    ///
    /// # Errors
    /// [`RoomError::CapacityExhausted`] if `max_rooms` rooms are live, or
    /// if every attempt collided with a live room.
    pub fn create_room(&mut self) -> Result<RoomCode, RoomError> {
        self.create_room_from(code::generate)
    }

    /// Creates a room, drawing candidate codes from `next_code` until one
    /// is free or `max_code_attempts` is spent.
    pub fn create_room_from(
        &mut self,
        mut next_code: impl FnMut() -> RoomCode,
    ) -> Result<RoomCode, RoomError> {
        let live = self.rooms.len();
        if live >= self.config.max_rooms {
            tracing::warn!(live, "room limit reached");
            return Err(RoomError::CapacityExhausted { live });
        }

        let attempts = self.config.max_code_attempts;
        let code = (0..attempts)
            .map(|_| next_code())
            .find(|candidate| !self.rooms.contains_key(candidate))
            .ok_or_else(|| {
                tracing::warn!(live, attempts, "no free room code");
                RoomError::CapacityExhausted { live }
            })?;

        let handle = spawn_room(code.clone(), self.config.channel_size);
        self.rooms.insert(code.clone(), handle);
        tracing::info!(%code, rooms = self.rooms.len(), "room created");
        Ok(code)
    }

    /// Returns the handle of a live room.
    pub fn lookup(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(code).cloned()
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    /// Binds `session` to the room as a pending join.
    ///
    /// The room sends `roomJoined` to `sender` before this returns. The
    /// returned handle is what the session uses for everything else it
    /// does in the room.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if no such room is live.
    /// - [`RoomError::AlreadyMember`] if `session` is already bound here.
    pub async fn begin_join(
        &mut self,
        code: &RoomCode,
        session: SessionId,
        sender: MemberSender,
    ) -> Result<RoomHandle, RoomError> {
        let handle = self
            .rooms
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        handle.begin_join(session, sender).await?;
        Ok(handle)
    }

    /// Removes `session` from the room, deleting the room if that leaves
    /// it empty.
    ///
    /// Works for named members and for sessions that never picked a name.
    pub async fn leave(
        &mut self,
        code: &RoomCode,
        session: SessionId,
    ) -> Result<LeaveOutcome, RoomError> {
        let handle = self
            .rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        let outcome = handle.leave(session).await?;

        if outcome == LeaveOutcome::Emptied {
            self.rooms.remove(code);
            tracing::info!(%code, rooms = self.rooms.len(), "room deleted");
        }
        Ok(outcome)
    }

    /// Removes a room and stops its actor. Returns `false` if the room
    /// was already gone.
    pub async fn delete(&mut self, code: &RoomCode) -> bool {
        let Some(handle) = self.rooms.remove(code) else {
            return false;
        };
        // The actor may already have stopped on its own.
        let _ = handle.shutdown().await;
        tracing::info!(%code, rooms = self.rooms.len(), "room deleted");
        true
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Codes of every live room, in no particular order.
    pub fn codes(&self) -> impl Iterator<Item = &RoomCode> {
        self.rooms.keys()
    }
}
