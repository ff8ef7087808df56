//! Room-scoped event delivery.

use gambit_protocol::{GameMessage, Recipient, SessionId};
use tokio::sync::mpsc;

/// Channel that carries a room's events to one session's connection task.
pub type MemberSender = mpsc::UnboundedSender<GameMessage>;

/// The set of sessions bound to one room, in the order they joined.
///
/// Every delivery goes through here, so an event can only ever reach a
/// session that is currently in the room. Events are pushed onto each
/// member's channel in call order, which is the order the room actor
/// processed them.
#[derive(Debug, Default)]
pub struct Relay {
    members: Vec<(SessionId, MemberSender)>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session. Returns `false` if it was already present.
    pub fn add(&mut self, session: SessionId, sender: MemberSender) -> bool {
        if self.contains(session) {
            return false;
        }
        self.members.push((session, sender));
        true
    }

    /// Removes a session. Returns `false` if it was not present.
    pub fn remove(&mut self, session: SessionId) -> bool {
        let before = self.members.len();
        self.members.retain(|(id, _)| *id != session);
        self.members.len() != before
    }

    pub fn contains(&self, session: SessionId) -> bool {
        self.members.iter().any(|(id, _)| *id == session)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Delivers `msg` to `recipient`.
    ///
    /// A member whose connection task has already gone is skipped; its
    /// departure reaches the room separately.
    pub fn deliver(&self, recipient: Recipient, msg: GameMessage) {
        tracing::trace!(?recipient, ?msg, "relaying");
        match recipient {
            Recipient::All => {
                for (_, sender) in &self.members {
                    let _ = sender.send(msg.clone());
                }
            }
            Recipient::Member(target) => {
                if let Some((_, sender)) = self.members.iter().find(|(id, _)| *id == target) {
                    let _ = sender.send(msg);
                }
            }
            Recipient::AllExcept(excluded) => {
                for (_, sender) in self.members.iter().filter(|(id, _)| *id != excluded) {
                    let _ = sender.send(msg.clone());
                }
            }
        }
    }
}
