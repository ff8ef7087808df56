//! Wire protocol for Gambit.
//!
//! This crate defines the language clients and the server speak:
//!
//! - **Types** ([`Envelope`], [`Payload`], [`LobbyMessage`],
//!   [`GameMessage`], [`RoomSnapshot`], ...) — the records that travel
//!   on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those records are
//!   converted to and from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding,
//!   decoding, or validating them.
//!
//! # Scopes
//!
//! One connection multiplexes two logical scopes. The [`Payload`]
//! variant says which one a message belongs to:
//!
//! ```text
//! Lobby  → create a room, check that a room code exists
//! Game   → everything that happens inside one room
//! Error  → protocol-level failures reported back to one client
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    Envelope, GameMessage, GameStatus, LobbyMessage, Payload, Recipient, Role, RoomCode,
    RoomSnapshot, SessionId, Side,
};
