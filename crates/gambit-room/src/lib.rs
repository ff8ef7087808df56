//! Rooms for Gambit.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! seats, spectator queue and match state, and relays events to the
//! sessions bound to it.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates rooms under unique codes, routes joins,
//!   deletes rooms once they are truly empty
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomState`]: seat, queue and match rules, free of I/O
//! - [`Relay`]: room-scoped delivery to members
//! - [`RoomEvent`]: the game events a member can send

pub mod code;
mod config;
mod error;
mod event;
mod registry;
mod relay;
mod room;
mod state;

pub use config::RegistryConfig;
pub use error::RoomError;
pub use event::RoomEvent;
pub use registry::RoomRegistry;
pub use relay::{MemberSender, Relay};
pub use room::{LeaveOutcome, RoomHandle, RoomInfo};
pub use state::{RoomState, Vacancy};
