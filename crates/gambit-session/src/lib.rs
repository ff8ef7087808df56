//! Session management for Gambit.
//!
//! A session is the server's record of one connection: which room it is
//! bound to and, once it has picked a display name, which role it holds.
//!
//! ```text
//! Unbound ──joinRoom──→ Bound(room) ──createUsername──→ Assigned(room, role, name)
//!    ↑                      │                                  │
//!    └──────── leaveGame / disconnect ─────────────────────────┘
//! ```
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)     ← owns seats, queues and relays
//!     ↕
//! Session Layer (this)   ← remembers what each connection is bound to
//!     ↕
//! Protocol Layer (below) ← provides SessionId, RoomCode, Role
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionState};
