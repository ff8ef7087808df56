//! In-room game events.

use gambit_protocol::{GameMessage, Side};

/// A client message that acts on the room's match rather than on the
/// sender's membership.
///
/// Membership changes (`joinRoom`, `createUsername`, `leaveGame`,
/// `tradeWithSpectator`) have dedicated room commands with replies;
/// everything here is fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    BeginGame,
    GameStatusChange(bool),
    UpdateTeamUp(Side),
    MovedPiece(serde_json::Value),
    PieceTaken { side: Side, piece_kind: String },
    KingTaken(Side),
    StartNewGame,
    PiecesUpdate { pieces: serde_json::Value, turn: Side },
    Resign(Side),
    ResumeGame,
    OfferDraw,
    AcceptDraw,
}

impl TryFrom<GameMessage> for RoomEvent {
    type Error = GameMessage;

    /// Hands back the message unchanged if it is not a room event.
    fn try_from(msg: GameMessage) -> Result<Self, Self::Error> {
        let event = match msg {
            GameMessage::BeginGame => Self::BeginGame,
            GameMessage::GameStatusChange { status } => Self::GameStatusChange(status),
            GameMessage::UpdateTeamUp { team } => Self::UpdateTeamUp(team),
            GameMessage::UserMovedPiece { mv } => Self::MovedPiece(mv),
            GameMessage::PieceTaken { color, piece_kind } => Self::PieceTaken {
                side: color,
                piece_kind,
            },
            GameMessage::KingTaken { team } => Self::KingTaken(team),
            GameMessage::StartNewGame => Self::StartNewGame,
            GameMessage::PiecesUpdate { pieces, team_up } => Self::PiecesUpdate {
                pieces,
                turn: team_up,
            },
            GameMessage::Resign { who } => Self::Resign(who),
            GameMessage::ResumeGame => Self::ResumeGame,
            GameMessage::UserWantsDraw => Self::OfferDraw,
            GameMessage::UserAcceptsDraw => Self::AcceptDraw,
            other => return Err(other),
        };
        Ok(event)
    }
}
