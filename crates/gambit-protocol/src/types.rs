//! Core protocol types for Gambit's wire format.
//!
//! Every type here is serialized to JSON and sent to browser clients, so
//! the serde attributes are part of the contract: event names and field
//! names are camelCase, and every enum is tagged so the client can switch
//! on a single `type` field.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifies one connected client for as long as its connection lives.
///
/// Serialized as a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// A room's short, human-typeable identifier: six lowercase ASCII letters.
///
/// The only way to build one is [`RoomCode::parse`], which normalizes to
/// lowercase, so two codes compare equal exactly when a player would
/// consider them the same code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Number of letters in a room code.
    pub const LEN: usize = 6;

    /// Parses user input into a room code.
    ///
    /// Surrounding whitespace is ignored and letters are lowercased.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRoomCode`] unless the input is
    /// exactly [`RoomCode::LEN`] ASCII letters.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let trimmed = raw.trim();
        if trimmed.len() != Self::LEN || !trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(ProtocolError::InvalidRoomCode(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// The normalized code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Roles and sides
// ---------------------------------------------------------------------------

/// One of the two seats at the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    First,
    Second,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Second => write!(f, "second"),
        }
    }
}

/// What a named member of a room is doing there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    First,
    Second,
    Spectator,
}

impl Role {
    /// The seat this role occupies, if it is a player role.
    pub fn seat(self) -> Option<Side> {
        match self {
            Self::First => Some(Side::First),
            Self::Second => Some(Side::Second),
            Self::Spectator => None,
        }
    }
}

impl From<Side> for Role {
    fn from(side: Side) -> Self {
        match side {
            Side::First => Self::First,
            Side::Second => Self::Second,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Second => write!(f, "second"),
            Self::Spectator => write!(f, "spectator"),
        }
    }
}

/// Match progress inside a room.
///
/// ```text
/// Waiting ──beginGame──→ InProgress ──kingTaken / draw──→ Concluded
///    ↑                                                        │
///    └──────────────────────── startNewGame ──────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    #[default]
    Waiting,
    InProgress,
    Concluded,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Concluded => write!(f, "concluded"),
        }
    }
}

// ---------------------------------------------------------------------------
// Recipient — who should receive a relayed event?
// ---------------------------------------------------------------------------

/// The audience of one relayed event, always scoped to a single room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every session bound to the room, the sender included.
    All,

    /// One specific session.
    Member(SessionId),

    /// Everyone in the room except this session. Used when the sender
    /// already knows what it did.
    AllExcept(SessionId),
}

// ---------------------------------------------------------------------------
// Room snapshot
// ---------------------------------------------------------------------------

/// The full, client-visible state of a room, sent on `joinRoom` so the
/// client can render occupants before it has picked a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: RoomCode,
    pub first_player: Option<String>,
    pub second_player: Option<String>,
    pub turn_owner: Option<Side>,
    pub captured_by_first: Vec<String>,
    pub captured_by_second: Vec<String>,
    pub spectators: Vec<String>,
    /// Opaque piece positions, exactly as the last `piecesUpdate` sent them.
    pub board: serde_json::Value,
    pub status: GameStatus,
}

// ---------------------------------------------------------------------------
// Lobby scope
// ---------------------------------------------------------------------------

/// Messages exchanged before a connection is bound to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LobbyMessage {
    /// Client → Server: "Make me a new room."
    CreateRoom,

    /// Server → Client: "Here is your new room's code."
    RoomCreated { id: RoomCode },

    /// Client → Server: "Does this room exist?"
    ///
    /// `id` is raw user input; the server normalizes it.
    JoinExistingRoom { id: String },

    /// Server → Client: "Yes, go ahead and join it."
    RoomAllowed { id: RoomCode },
}

// ---------------------------------------------------------------------------
// Game scope
// ---------------------------------------------------------------------------

/// Messages exchanged inside one room.
///
/// Client requests and server notifications share one enum, the way they
/// share one event namespace on the wire. `resumeGame` is the only event
/// that travels in both directions unchanged.
///
/// Move and board payloads are opaque JSON: the server relays and caches
/// them but never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameMessage {
    // -- Client → Server --
    /// Bind this connection to a room. `room_id` is raw user input.
    JoinRoom { room_id: String },

    /// Claim a display name; the server picks the role.
    CreateUsername { name: String },

    BeginGame,

    /// Client-reported game activity flag; cached only.
    GameStatusChange { status: bool },

    /// Client-reported turn owner; cached only.
    UpdateTeamUp { team: Side },

    /// A move made on the sender's board, relayed verbatim.
    UserMovedPiece {
        #[serde(rename = "move")]
        mv: serde_json::Value,
    },

    /// `color` is the side that captured `piece_kind`.
    PieceTaken { color: Side, piece_kind: String },

    /// `team` is the side that captured the opposing king.
    KingTaken { team: Side },

    StartNewGame,

    /// Full board resync.
    PiecesUpdate {
        pieces: serde_json::Value,
        team_up: Side,
    },

    /// Give up this connection's place in the room.
    ///
    /// The fields are what the client believes about itself; the server
    /// uses its own record of the session instead.
    LeaveGame {
        #[serde(default)]
        team: Option<Role>,
        #[serde(default)]
        name: Option<String>,
    },

    Resign { who: Side },

    UserWantsDraw,

    UserAcceptsDraw,

    /// Swap a seated member with a queued spectator.
    TradeWithSpectator { member: String, spectator: String },

    // -- Both directions --
    ResumeGame,

    // -- Server → Client --
    RoomJoined { room: RoomSnapshot },

    NoRoomFound,

    /// The name was accepted; this is the sender's role.
    UsernameCreated { role: Role, name: String },

    /// Someone else claimed a name.
    MemberJoined { role: Role, name: String },

    UsernameTaken,

    GameStarted { turn: Side },

    InsufficientPlayers,

    OpponentMove {
        #[serde(rename = "move")]
        mv: serde_json::Value,
    },

    GameOver { winner: Side },

    BoardReset,

    MemberLeft { role: Role, name: String },

    /// A spectator moved into the seat `role`.
    MemberPromoted { role: Role, name: String },

    /// The seat `role` is empty and nobody is queued for it.
    AwaitingReplacement { role: Role },

    MemberResigned { who: Side },

    DrawOffered,

    GameDrawn,

    /// `spectator` now holds the seat `role`; `member` joined the queue.
    MemberSpectatorTraded {
        role: Role,
        member: String,
        spectator: String,
    },
}

// ---------------------------------------------------------------------------
// Payload and envelope
// ---------------------------------------------------------------------------

/// The content of one frame.
///
/// Adjacently tagged, so a frame reads
/// `{ "type": "Game", "data": { "type": "beginGame" } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    Lobby(LobbyMessage),
    Game(GameMessage),

    /// Server → Client: the request could not be processed.
    ///
    /// `code` follows HTTP conventions: 400 bad request, 409 conflicting
    /// session state, 503 out of room codes.
    Error { code: u16, message: String },
}

/// The top-level wire frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-connection sequence number. Server frames count up from 1.
    #[serde(default)]
    pub seq: u64,

    /// Milliseconds since the sender's connection started.
    #[serde(default)]
    pub timestamp: u64,

    pub payload: Payload,
}

impl Envelope {
    pub fn new(seq: u64, timestamp: u64, payload: Payload) -> Self {
        Self {
            seq,
            timestamp,
            payload,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
