//! Room actor: an isolated Tokio task that owns one room.
//!
//! Each room runs in its own task and is driven through a bounded mpsc
//! channel. Commands are processed strictly one at a time, so every
//! membership change and game event is atomic with respect to the others,
//! and the relay order is the processing order.

use std::collections::HashMap;

use gambit_protocol::{GameMessage, Recipient, Role, RoomCode, RoomSnapshot, SessionId, Side};
use tokio::sync::{mpsc, oneshot};

use crate::state::same_name;
use crate::{MemberSender, Relay, RoomError, RoomEvent, RoomState};

/// Commands sent to a room actor through its channel.
///
/// Variants carrying a `oneshot::Sender` expect a reply; the rest are
/// fire-and-forget.
pub(crate) enum RoomCommand {
    /// Bind a session to the room as a pending join.
    BeginJoin {
        session: SessionId,
        sender: MemberSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Complete a pending join with a display name.
    ClaimSeat {
        session: SessionId,
        name: String,
        reply: oneshot::Sender<Result<(Role, String), RoomError>>,
    },

    /// A game event from a member.
    Event { session: SessionId, event: RoomEvent },

    /// Swap a seated member with a queued spectator.
    Trade {
        session: SessionId,
        member: String,
        spectator: String,
        reply: oneshot::Sender<Result<Side, RoomError>>,
    },

    /// Remove a session, named or still pending.
    Leave {
        session: SessionId,
        reply: oneshot::Sender<Result<LeaveOutcome, RoomError>>,
    },

    /// Request a snapshot of the room.
    Info { reply: oneshot::Sender<RoomInfo> },

    /// Stop the actor.
    Shutdown,
}

/// What a departure did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Somebody is still seated, queued or joining.
    Remaining,
    /// The room is empty and its actor has stopped. The registry must
    /// forget it.
    Emptied,
}

/// A point-in-time view of a room.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    /// What a joining client would see.
    pub snapshot: RoomSnapshot,
    /// Sessions bound to the room that have not picked a name.
    pub pending_joins: usize,
    /// Sessions bound to the room, named or not.
    pub members: usize,
}

/// Handle to a running room actor.
///
/// Cheap to clone. Once the room is gone every call returns
/// [`RoomError::NotFound`].
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub(crate) async fn begin_join(
        &self,
        session: SessionId,
        sender: MemberSender,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::BeginJoin {
            session,
            sender,
            reply,
        })
        .await?
    }

    /// Claims a seat for `session` under `name`.
    ///
    /// The room tells the session (and the rest of the room) the outcome
    /// itself, including `usernameTaken`; the returned error is for the
    /// caller's bookkeeping.
    pub async fn claim_seat(
        &self,
        session: SessionId,
        name: String,
    ) -> Result<(Role, String), RoomError> {
        self.request(|reply| RoomCommand::ClaimSeat {
            session,
            name,
            reply,
        })
        .await?
    }

    /// Sends a game event to the room (fire-and-forget).
    pub async fn send_event(
        &self,
        session: SessionId,
        event: RoomEvent,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Event { session, event })
            .await
            .map_err(|_| self.gone())
    }

    /// Swaps the seated `member` with the queued `spectator`. Returns the
    /// seat that changed hands.
    pub async fn trade(
        &self,
        session: SessionId,
        member: String,
        spectator: String,
    ) -> Result<Side, RoomError> {
        self.request(|reply| RoomCommand::Trade {
            session,
            member,
            spectator,
            reply,
        })
        .await?
    }

    pub(crate) async fn leave(&self, session: SessionId) -> Result<LeaveOutcome, RoomError> {
        self.request(|reply| RoomCommand::Leave { session, reply }).await?
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::Info { reply }).await
    }

    pub(crate) async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.gone())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| self.gone())?;
        reply_rx.await.map_err(|_| self.gone())
    }

    fn gone(&self) -> RoomError {
        RoomError::NotFound(self.code.clone())
    }
}

/// A bound session as the room sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Member {
    Pending,
    Named { role: Role, name: String },
}

struct RoomActor {
    state: RoomState,
    roster: HashMap<SessionId, Member>,
    relay: Relay,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        let code = self.state.code().clone();
        tracing::debug!(%code, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::BeginJoin {
                    session,
                    sender,
                    reply,
                } => {
                    let _ = reply.send(self.handle_begin_join(session, sender));
                }
                RoomCommand::ClaimSeat {
                    session,
                    name,
                    reply,
                } => {
                    let _ = reply.send(self.handle_claim_seat(session, &name));
                }
                RoomCommand::Event { session, event } => {
                    self.handle_event(session, event);
                }
                RoomCommand::Trade {
                    session,
                    member,
                    spectator,
                    reply,
                } => {
                    let _ = reply.send(self.handle_trade(session, &member, &spectator));
                }
                RoomCommand::Leave { session, reply } => {
                    let result = self.handle_leave(session);
                    let emptied = matches!(result, Ok(LeaveOutcome::Emptied));
                    let _ = reply.send(result);
                    if emptied {
                        break;
                    }
                }
                RoomCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Shutdown => break,
            }
        }

        tracing::debug!(%code, "room actor stopped");
    }

    fn handle_begin_join(
        &mut self,
        session: SessionId,
        sender: MemberSender,
    ) -> Result<(), RoomError> {
        if self.roster.contains_key(&session) {
            return Err(RoomError::AlreadyMember(session, self.state.code().clone()));
        }

        self.state.begin_join();
        self.roster.insert(session, Member::Pending);
        self.relay.add(session, sender);
        tracing::debug!(
            code = %self.state.code(),
            %session,
            pending = self.state.pending_joins(),
            "join pending"
        );

        self.relay.deliver(
            Recipient::Member(session),
            GameMessage::RoomJoined {
                room: self.state.snapshot(),
            },
        );
        Ok(())
    }

    fn handle_claim_seat(
        &mut self,
        session: SessionId,
        name: &str,
    ) -> Result<(Role, String), RoomError> {
        match self.roster.get(&session) {
            None => return Err(RoomError::NotAMember(session, self.state.code().clone())),
            Some(Member::Named { .. }) => return Err(RoomError::AlreadyNamed(session)),
            Some(Member::Pending) => {}
        }

        let (role, name) = match self.state.claim_seat(name) {
            Ok(seated) => seated,
            Err(err @ RoomError::UsernameTaken(_)) => {
                self.relay
                    .deliver(Recipient::Member(session), GameMessage::UsernameTaken);
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        self.roster.insert(
            session,
            Member::Named {
                role,
                name: name.clone(),
            },
        );
        tracing::info!(code = %self.state.code(), %session, ?role, %name, "member joined");

        self.relay.deliver(
            Recipient::Member(session),
            GameMessage::UsernameCreated {
                role,
                name: name.clone(),
            },
        );
        self.relay.deliver(
            Recipient::AllExcept(session),
            GameMessage::MemberJoined {
                role,
                name: name.clone(),
            },
        );
        Ok((role, name))
    }

    fn handle_event(&mut self, session: SessionId, event: RoomEvent) {
        if !self.roster.contains_key(&session) {
            tracing::warn!(
                code = %self.state.code(),
                %session,
                "event from non-member, ignoring"
            );
            return;
        }
        tracing::debug!(code = %self.state.code(), %session, ?event, "room event");

        match event {
            RoomEvent::BeginGame => match self.state.start() {
                Ok(turn) => {
                    tracing::info!(code = %self.state.code(), "game started");
                    self.relay
                        .deliver(Recipient::All, GameMessage::GameStarted { turn });
                }
                Err(_) => {
                    self.relay
                        .deliver(Recipient::All, GameMessage::InsufficientPlayers);
                }
            },
            RoomEvent::GameStatusChange(active) => self.state.set_active(active),
            RoomEvent::UpdateTeamUp(side) => self.state.set_turn(side),
            RoomEvent::MovedPiece(mv) => {
                self.relay.deliver(
                    Recipient::AllExcept(session),
                    GameMessage::OpponentMove { mv },
                );
            }
            RoomEvent::PieceTaken { side, piece_kind } => {
                self.state.record_capture(side, piece_kind);
            }
            RoomEvent::KingTaken(winner) => {
                self.state.conclude();
                tracing::info!(code = %self.state.code(), ?winner, "game over");
                self.relay
                    .deliver(Recipient::All, GameMessage::GameOver { winner });
            }
            RoomEvent::StartNewGame => {
                self.state.reset();
                self.relay.deliver(Recipient::All, GameMessage::BoardReset);
            }
            RoomEvent::PiecesUpdate { pieces, turn } => {
                self.state.replace_board(pieces, turn);
            }
            RoomEvent::Resign(who) => {
                self.relay
                    .deliver(Recipient::All, GameMessage::MemberResigned { who });
            }
            RoomEvent::ResumeGame => {
                self.relay
                    .deliver(Recipient::AllExcept(session), GameMessage::ResumeGame);
            }
            RoomEvent::OfferDraw => {
                self.relay
                    .deliver(Recipient::AllExcept(session), GameMessage::DrawOffered);
            }
            RoomEvent::AcceptDraw => {
                self.state.conclude();
                tracing::info!(code = %self.state.code(), "game drawn");
                self.relay.deliver(Recipient::All, GameMessage::GameDrawn);
            }
        }
    }

    fn handle_trade(
        &mut self,
        session: SessionId,
        member: &str,
        spectator: &str,
    ) -> Result<Side, RoomError> {
        if !self.roster.contains_key(&session) {
            return Err(RoomError::NotAMember(session, self.state.code().clone()));
        }

        let side = self.state.trade(member, spectator)?;
        let role = Role::from(side);

        // Report the names as stored, not as the requester typed them.
        let member = self
            .rename_role(member, Role::Spectator)
            .unwrap_or_else(|| member.to_string());
        let spectator = self
            .rename_role(spectator, role)
            .unwrap_or_else(|| spectator.to_string());
        tracing::info!(code = %self.state.code(), ?role, %member, %spectator, "seat traded");

        self.relay.deliver(
            Recipient::All,
            GameMessage::MemberSpectatorTraded {
                role,
                member,
                spectator,
            },
        );
        Ok(side)
    }

    fn handle_leave(&mut self, session: SessionId) -> Result<LeaveOutcome, RoomError> {
        let member = self
            .roster
            .remove(&session)
            .ok_or_else(|| RoomError::NotAMember(session, self.state.code().clone()))?;
        self.relay.remove(session);

        let vacancy = match member {
            Member::Pending => {
                self.state.abandon_join();
                tracing::debug!(code = %self.state.code(), %session, "join abandoned");
                None
            }
            Member::Named { role, name } => {
                let vacancy = self.state.vacate(role, &name);
                if vacancy.is_none() {
                    tracing::warn!(
                        code = %self.state.code(),
                        %session,
                        ?role,
                        %name,
                        "roster and seats disagree on departure"
                    );
                }
                tracing::info!(code = %self.state.code(), %session, ?role, %name, "member left");
                vacancy
            }
        };

        if self.state.is_empty() {
            return Ok(LeaveOutcome::Emptied);
        }

        let Some(vacancy) = vacancy else {
            return Ok(LeaveOutcome::Remaining);
        };

        self.relay.deliver(
            Recipient::All,
            GameMessage::MemberLeft {
                role: vacancy.role,
                name: vacancy.name,
            },
        );
        // A departing spectator frees no seat; `memberLeft` is the only notice.
        if vacancy.role.seat().is_some() {
            let notice = match vacancy.promoted {
                Some(promoted) => {
                    let name = self
                        .rename_role(&promoted, vacancy.role)
                        .unwrap_or(promoted);
                    tracing::info!(
                        code = %self.state.code(),
                        role = ?vacancy.role,
                        %name,
                        "spectator promoted"
                    );
                    GameMessage::MemberPromoted {
                        role: vacancy.role,
                        name,
                    }
                }
                None => GameMessage::AwaitingReplacement { role: vacancy.role },
            };
            self.relay.deliver(Recipient::All, notice);
        }
        Ok(LeaveOutcome::Remaining)
    }

    /// Moves the roster entry named `name` to `role`, returning the
    /// stored name.
    fn rename_role(&mut self, name: &str, role: Role) -> Option<String> {
        self.roster.values_mut().find_map(|member| match member {
            Member::Named {
                role: current,
                name: stored,
            } if same_name(stored, name) => {
                *current = role;
                Some(stored.clone())
            }
            _ => None,
        })
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            snapshot: self.state.snapshot(),
            pending_joins: self.state.pending_joins(),
            members: self.roster.len(),
        }
    }
}

/// Spawns a room actor for `code` and returns a handle to it.
///
/// `channel_size` bounds the command queue; senders wait when it is full.
pub(crate) fn spawn_room(code: RoomCode, channel_size: usize) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size.max(1));

    let actor = RoomActor {
        state: RoomState::new(code.clone()),
        roster: HashMap::new(),
        relay: Relay::new(),
        receiver: rx,
    };
    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
