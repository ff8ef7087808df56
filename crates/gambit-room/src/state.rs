//! A room's session and match state, with the rules that mutate it.
//!
//! Everything in this module is synchronous and free of I/O. The room
//! actor owns one [`RoomState`] and is the only thing that calls these
//! methods, so each one is atomic with respect to other room events.

use std::collections::VecDeque;

use gambit_protocol::{GameStatus, Role, RoomCode, RoomSnapshot, Side};

use crate::RoomError;

/// The outcome of removing a named member from the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vacancy {
    /// The role the departing member held.
    pub role: Role,
    /// The departing member's name.
    pub name: String,
    /// The spectator moved into the vacated seat, if any.
    pub promoted: Option<String>,
}

/// Seats, spectator queue, captures and match status for one room.
#[derive(Debug, Clone)]
pub struct RoomState {
    code: RoomCode,
    first: Option<String>,
    second: Option<String>,
    turn_owner: Option<Side>,
    captured_by_first: Vec<String>,
    captured_by_second: Vec<String>,
    spectators: VecDeque<String>,
    board: serde_json::Value,
    status: GameStatus,
    pending_joins: usize,
}

impl RoomState {
    /// A fresh room: no members, no pending joins, waiting to start.
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            first: None,
            second: None,
            turn_owner: None,
            captured_by_first: Vec::new(),
            captured_by_second: Vec::new(),
            spectators: VecDeque::new(),
            board: serde_json::Value::Null,
            status: GameStatus::Waiting,
            pending_joins: 0,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn turn_owner(&self) -> Option<Side> {
        self.turn_owner
    }

    /// Who sits in `side`, if anyone.
    pub fn seat(&self, side: Side) -> Option<&str> {
        match side {
            Side::First => self.first.as_deref(),
            Side::Second => self.second.as_deref(),
        }
    }

    /// The spectator queue, head first.
    pub fn spectators(&self) -> impl Iterator<Item = &str> {
        self.spectators.iter().map(String::as_str)
    }

    /// Pieces captured by `side`, in capture order.
    pub fn captured_by(&self, side: Side) -> &[String] {
        match side {
            Side::First => &self.captured_by_first,
            Side::Second => &self.captured_by_second,
        }
    }

    pub fn board(&self) -> &serde_json::Value {
        &self.board
    }

    pub fn pending_joins(&self) -> usize {
        self.pending_joins
    }

    // -- Membership -------------------------------------------------------

    /// `true` if `name` collides case-insensitively with either seat or
    /// any queued spectator.
    pub fn is_name_taken(&self, name: &str) -> bool {
        self.first
            .iter()
            .chain(&self.second)
            .chain(&self.spectators)
            .any(|n| same_name(n, name))
    }

    /// Counts a session that selected this room but has no name yet.
    pub fn begin_join(&mut self) {
        self.pending_joins += 1;
    }

    /// Forgets a pending join whose session left before picking a name.
    pub fn abandon_join(&mut self) {
        self.pending_joins = self.pending_joins.saturating_sub(1);
    }

    /// Completes a pending join by seating `name`.
    ///
    /// Seats fill in a fixed order: first, then second, then the back of
    /// the spectator queue. On success the pending join is consumed and
    /// the stored (trimmed) name is returned with the role.
    ///
    /// # Errors
    /// - [`RoomError::InvalidName`] if the name is blank.
    /// - [`RoomError::UsernameTaken`] on a case-insensitive collision.
    ///
    /// Neither error mutates the room.
    pub fn claim_seat(&mut self, name: &str) -> Result<(Role, String), RoomError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoomError::InvalidName(name.to_string()));
        }
        if self.is_name_taken(name) {
            return Err(RoomError::UsernameTaken(name.to_string()));
        }

        let name = name.to_string();
        let role = if self.first.is_none() {
            self.first = Some(name.clone());
            Role::First
        } else if self.second.is_none() {
            self.second = Some(name.clone());
            Role::Second
        } else {
            self.spectators.push_back(name.clone());
            Role::Spectator
        };
        self.pending_joins = self.pending_joins.saturating_sub(1);
        Ok((role, name))
    }

    /// Removes a named member.
    ///
    /// A departing spectator just leaves the queue. A departing player's
    /// seat goes to the head of the queue, or stays empty if the queue is
    /// empty. Returns `None` if `name` does not hold `role`.
    pub fn vacate(&mut self, role: Role, name: &str) -> Option<Vacancy> {
        let promoted = match role.seat() {
            None => {
                let idx = self.spectators.iter().position(|n| same_name(n, name))?;
                self.spectators.remove(idx);
                None
            }
            Some(side) => {
                if !self.seat(side).is_some_and(|n| same_name(n, name)) {
                    return None;
                }
                let next_in_line = self.spectators.pop_front();
                *self.seat_mut(side) = next_in_line.clone();
                next_in_line
            }
        };
        Some(Vacancy {
            role,
            name: name.to_string(),
            promoted,
        })
    }

    /// Swaps the seated `member` with the queued `spectator`.
    ///
    /// The spectator leaves the queue and takes the seat; the member joins
    /// the back of the queue. Returns the seat that changed hands.
    ///
    /// # Errors
    /// [`RoomError::InvalidTrade`] if `member` is not seated or
    /// `spectator` is not queued. Nothing is mutated in that case.
    pub fn trade(&mut self, member: &str, spectator: &str) -> Result<Side, RoomError> {
        let side = [Side::First, Side::Second]
            .into_iter()
            .find(|side| self.seat(*side).is_some_and(|n| same_name(n, member)))
            .ok_or_else(|| RoomError::InvalidTrade(format!("{member:?} is not seated")))?;
        let idx = self
            .spectators
            .iter()
            .position(|n| same_name(n, spectator))
            .ok_or_else(|| RoomError::InvalidTrade(format!("{spectator:?} is not spectating")))?;

        let incoming = self.spectators.remove(idx);
        if let Some(outgoing) = std::mem::replace(self.seat_mut(side), incoming) {
            self.spectators.push_back(outgoing);
        }
        Ok(side)
    }

    /// `true` when nobody is seated, nobody is queued and no join is in
    /// flight. Only then may the room be deleted.
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
            && self.second.is_none()
            && self.spectators.is_empty()
            && self.pending_joins == 0
    }

    // -- Match ------------------------------------------------------------

    /// Starts a match. Requires both seats to be filled.
    ///
    /// # Errors
    /// [`RoomError::InsufficientPlayers`], with the room unchanged.
    pub fn start(&mut self) -> Result<Side, RoomError> {
        if self.first.is_none() || self.second.is_none() {
            return Err(RoomError::InsufficientPlayers);
        }
        self.status = GameStatus::InProgress;
        self.turn_owner = Some(Side::First);
        Ok(Side::First)
    }

    /// Appends a piece captured by `side`.
    pub fn record_capture(&mut self, side: Side, piece_kind: String) {
        match side {
            Side::First => self.captured_by_first.push(piece_kind),
            Side::Second => self.captured_by_second.push(piece_kind),
        }
    }

    pub fn set_turn(&mut self, side: Side) {
        self.turn_owner = Some(side);
    }

    /// Full board resync: replaces the cached board and turn owner.
    pub fn replace_board(&mut self, pieces: serde_json::Value, turn: Side) {
        self.board = pieces;
        self.turn_owner = Some(turn);
    }

    /// Applies a client-reported activity flag. `true` marks the match as
    /// running; `false` ends a running match and is ignored otherwise.
    pub fn set_active(&mut self, active: bool) {
        if active {
            self.status = GameStatus::InProgress;
        } else if self.status == GameStatus::InProgress {
            self.status = GameStatus::Concluded;
        }
    }

    /// Marks the match as over (decisive result or agreed draw).
    pub fn conclude(&mut self) {
        self.status = GameStatus::Concluded;
    }

    /// Clears the board and captures and waits for a new start.
    pub fn reset(&mut self) {
        self.captured_by_first.clear();
        self.captured_by_second.clear();
        self.board = serde_json::Value::Null;
        self.turn_owner = Some(Side::First);
        self.status = GameStatus::Waiting;
    }

    /// The client-visible view of the room.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.code.clone(),
            first_player: self.first.clone(),
            second_player: self.second.clone(),
            turn_owner: self.turn_owner,
            captured_by_first: self.captured_by_first.clone(),
            captured_by_second: self.captured_by_second.clone(),
            spectators: self.spectators.iter().cloned().collect(),
            board: self.board.clone(),
            status: self.status,
        }
    }

    fn seat_mut(&mut self, side: Side) -> &mut Option<String> {
        match side {
            Side::First => &mut self.first,
            Side::Second => &mut self.second,
        }
    }
}

/// Display names compare case-insensitively.
pub(crate) fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

// =========================================================================
// Tests
// =========================================================================
