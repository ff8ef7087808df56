//! # Gambit
//!
//! Room and session relay server for live two-player board games.
//!
//! Two players and any number of spectators share a game over persistent
//! WebSocket connections, grouped into rooms named by six-letter codes.
//! The server owns seats, the spectator queue and room lifetimes; moves
//! and outcomes are reported by clients and relayed as-is.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gambit::prelude::*;
//!
//! # async fn run() -> Result<(), GambitError> {
//! let server = GambitServer::builder()
//!     .bind("0.0.0.0:8000")
//!     .registry_config(RegistryConfig::default())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
pub mod logger;
mod server;

pub use error::GambitError;
pub use server::{GambitServer, GambitServerBuilder, HeartbeatConfig};

pub mod prelude {
    pub use crate::{GambitError, GambitServer, GambitServerBuilder, HeartbeatConfig};
    pub use gambit_protocol::{
        Codec, Envelope, GameMessage, GameStatus, JsonCodec, LobbyMessage, Payload, Role,
        RoomCode, RoomSnapshot, SessionId, Side,
    };
    pub use gambit_room::{RegistryConfig, RoomError};
    pub use gambit_session::SessionError;
    pub use gambit_transport::TransportError;
}
