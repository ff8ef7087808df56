//! Per-connection handler: lobby requests and routing into rooms.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The task waits on frames from the client and on events its room pushes
//! onto the session's outbound channel. A keepalive ticker in the same
//! loop pings the client and drops it once it goes quiet. Game
//! events go straight to the room actor through the handle cached at
//! join time; only lobby requests, joins and departures touch the shared
//! registry.

use std::sync::Arc;
use std::time::Instant;

use gambit_protocol::{
    Codec, Envelope, GameMessage, LobbyMessage, Payload, Role, RoomCode, SessionId,
};
use gambit_room::{MemberSender, RoomError, RoomEvent, RoomHandle};
use gambit_session::{SessionError, SessionState};
use gambit_transport::{Connection, Inbound, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use crate::GambitError;
use crate::server::ServerState;

/// Drop guard that runs the departure path when the handler exits.
///
/// Cleanup happens however the handler ends, including a panic. `Drop` is
/// synchronous, so the async part runs in a spawned task.
struct SessionGuard<C: Codec> {
    session: SessionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for SessionGuard<C> {
    fn drop(&mut self) {
        let session = self.session;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let closed = state.sessions.lock().await.close(session);
            let room = match closed {
                Ok(closed) => {
                    if let (Some(role), Some(name)) = (closed.role(), closed.name()) {
                        tracing::debug!(%session, %role, %name, "session dropped from its room");
                    }
                    closed.room().cloned()
                }
                Err(e) => {
                    tracing::warn!(%session, error = %e, "session already closed");
                    None
                }
            };
            if let Some(code) = room {
                depart(&state, &code, session).await;
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), GambitError> {
    let session = SessionId(conn.id().into_inner());
    tracing::debug!(%session, "handling new connection");

    // Open the session and arm the guard together; a failed open needs
    // no cleanup.
    state.sessions.lock().await.open(session)?;
    let _guard = SessionGuard {
        session,
        state: Arc::clone(&state),
    };

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let mut handler = Handler {
        session,
        state,
        conn,
        outbound: outbound_tx,
        room: None,
        seq: 1,
        start: Instant::now(),
    };

    let heartbeat = handler.state.heartbeat;
    let mut ticker = time::interval_at(
        time::Instant::now() + heartbeat.interval,
        heartbeat.interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Intervals since the client last sent anything.
    let mut missed = 0;

    loop {
        tokio::select! {
            incoming = handler.conn.recv() => match incoming {
                Ok(Some(inbound)) => {
                    missed = 0;
                    if let Inbound::Message(data) = inbound {
                        handler.on_frame(&data).await?;
                    }
                }
                Ok(None) => {
                    tracing::info!(%session, "connection closed cleanly");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%session, error = %e, "recv error");
                    break;
                }
            },
            Some(msg) = outbound_rx.recv() => handler.forward(msg).await?,
            _ = ticker.tick() => {
                if missed >= heartbeat.max_missed {
                    tracing::info!(%session, "connection timed out");
                    break;
                }
                missed += 1;
                handler.ping().await?;
            }
        }
    }

    // _guard drops here → departure fires.
    Ok(())
}

/// Removes `session` from the room `code`, deleting the room if that
/// empties it.
async fn depart<C: Codec>(state: &ServerState<C>, code: &RoomCode, session: SessionId) {
    let mut rooms = state.rooms.lock().await;
    if let Err(e) = rooms.leave(code, session).await {
        tracing::debug!(%code, %session, error = %e, "leave failed");
    }
}

struct Handler<C: Codec> {
    session: SessionId,
    state: Arc<ServerState<C>>,
    conn: WebSocketConnection,
    /// Given to every room this session joins.
    outbound: MemberSender,
    /// The room this session is bound to, if any.
    room: Option<RoomHandle>,
    seq: u64,
    start: Instant,
}

impl<C: Codec> Handler<C> {
    async fn on_frame(&mut self, data: &[u8]) -> Result<(), GambitError> {
        let envelope: Envelope = match self.state.codec.decode(data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(
                    session = %self.session,
                    error = %e,
                    "failed to decode envelope"
                );
                return Ok(());
            }
        };

        match envelope.payload {
            Payload::Lobby(msg) => self.on_lobby(msg).await,
            Payload::Game(msg) => self.on_game(msg).await,
            Payload::Error { code, message } => {
                tracing::debug!(
                    session = %self.session,
                    code,
                    %message,
                    "client reported error"
                );
                Ok(())
            }
        }
    }

    async fn on_lobby(&mut self, msg: LobbyMessage) -> Result<(), GambitError> {
        match msg {
            LobbyMessage::CreateRoom => {
                let created = self.state.rooms.lock().await.create_room();
                match created {
                    Ok(id) => {
                        self.send(Payload::Lobby(LobbyMessage::RoomCreated { id }))
                            .await
                    }
                    Err(e) => self.reject(e.into()).await,
                }
            }
            LobbyMessage::JoinExistingRoom { id } => {
                let live = match RoomCode::parse(&id) {
                    Ok(code) => {
                        let rooms = self.state.rooms.lock().await;
                        rooms.contains(&code).then_some(code)
                    }
                    Err(_) => None,
                };
                match live {
                    Some(id) => {
                        self.send(Payload::Lobby(LobbyMessage::RoomAllowed { id }))
                            .await
                    }
                    None => {
                        tracing::debug!(session = %self.session, %id, "no such room");
                        Ok(())
                    }
                }
            }
            other => {
                tracing::debug!(
                    session = %self.session,
                    ?other,
                    "ignoring lobby notification from client"
                );
                Ok(())
            }
        }
    }

    async fn on_game(&mut self, msg: GameMessage) -> Result<(), GambitError> {
        match msg {
            GameMessage::JoinRoom { room_id } => self.join_room(&room_id).await,
            GameMessage::CreateUsername { name } => self.create_username(name).await,
            GameMessage::LeaveGame { .. } => {
                self.leave_room().await;
                Ok(())
            }
            GameMessage::TradeWithSpectator { member, spectator } => {
                let Some(room) = self.room.clone() else {
                    return self.reject(SessionError::NotBound(self.session).into()).await;
                };
                match room.trade(self.session, member, spectator).await {
                    Ok(_) => Ok(()),
                    Err(e) => self.room_failed(e).await,
                }
            }
            other => match RoomEvent::try_from(other) {
                Ok(event) => {
                    let Some(room) = self.room.clone() else {
                        return self.reject(SessionError::NotBound(self.session).into()).await;
                    };
                    match room.send_event(self.session, event).await {
                        Ok(()) => Ok(()),
                        Err(e) => self.room_failed(e).await,
                    }
                }
                Err(other) => {
                    tracing::debug!(
                        session = %self.session,
                        ?other,
                        "ignoring game notification from client"
                    );
                    self.error(400, "unexpected message").await
                }
            },
        }
    }

    async fn join_room(&mut self, raw: &str) -> Result<(), GambitError> {
        if let Some(room) = &self.room {
            let err = SessionError::AlreadyBound(self.session, room.code().clone());
            return self.reject(err.into()).await;
        }
        let Ok(code) = RoomCode::parse(raw) else {
            return self.send(Payload::Game(GameMessage::NoRoomFound)).await;
        };

        let joined = self
            .state
            .rooms
            .lock()
            .await
            .begin_join(&code, self.session, self.outbound.clone())
            .await;

        match joined {
            Ok(handle) => {
                self.state.sessions.lock().await.bind(self.session, code)?;
                self.room = Some(handle);
                Ok(())
            }
            Err(RoomError::NotFound(_)) => {
                self.send(Payload::Game(GameMessage::NoRoomFound)).await
            }
            Err(e) => self.reject(e.into()).await,
        }
    }

    async fn create_username(&mut self, name: String) -> Result<(), GambitError> {
        let Some(room) = self.room.clone() else {
            return self.reject(SessionError::NotBound(self.session).into()).await;
        };
        match room.claim_seat(self.session, name).await {
            Ok((role, name)) => {
                self.state
                    .sessions
                    .lock()
                    .await
                    .assign(self.session, role, name)?;
                Ok(())
            }
            // The room already told the client.
            Err(RoomError::UsernameTaken(_)) => Ok(()),
            Err(e) => self.room_failed(e).await,
        }
    }

    /// Gives up this session's place in its room, if it has one.
    async fn leave_room(&mut self) {
        let Some(room) = self.room.take() else {
            tracing::debug!(session = %self.session, "leave without a room");
            return;
        };
        let unbound = self.state.sessions.lock().await.unbind(self.session);
        match unbound {
            Ok(SessionState::Assigned { role, name, .. }) => {
                tracing::debug!(session = %self.session, %role, %name, "session left its room");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(session = %self.session, error = %e, "unbind failed"),
        }
        depart(&self.state, room.code(), self.session).await;
    }

    /// Sends a room event to the client, keeping the session's role in
    /// step with seat changes that involve it.
    async fn forward(&mut self, msg: GameMessage) -> Result<(), GambitError> {
        let moved_to = |me: &str| match &msg {
            GameMessage::MemberPromoted { role, name } if name == me => Some(*role),
            GameMessage::MemberSpectatorTraded {
                role, spectator, ..
            } if spectator == me => Some(*role),
            GameMessage::MemberSpectatorTraded { member, .. } if member == me => {
                Some(Role::Spectator)
            }
            _ => None,
        };

        if matches!(
            msg,
            GameMessage::MemberPromoted { .. } | GameMessage::MemberSpectatorTraded { .. }
        ) {
            let mut sessions = self.state.sessions.lock().await;
            let new_role = sessions
                .get(&self.session)
                .and_then(|s| s.name())
                .and_then(moved_to);
            if let Some(role) = new_role {
                sessions.reassign(self.session, role)?;
                tracing::debug!(session = %self.session, ?role, "role changed");
            }
        }

        self.send(Payload::Game(msg)).await
    }

    /// Handles a room error: a vanished room unbinds the session, anything
    /// else goes back to the client as an error payload.
    async fn room_failed(&mut self, err: RoomError) -> Result<(), GambitError> {
        if let RoomError::NotFound(code) = &err {
            tracing::debug!(session = %self.session, %code, "room is gone");
            self.room = None;
            let _ = self.state.sessions.lock().await.unbind(self.session);
        }
        self.reject(err.into()).await
    }

    async fn reject(&mut self, err: GambitError) -> Result<(), GambitError> {
        tracing::debug!(session = %self.session, error = %err, "request rejected");
        self.error(err.status_code(), &err.to_string()).await
    }

    async fn error(&mut self, code: u16, message: &str) -> Result<(), GambitError> {
        self.send(Payload::Error {
            code,
            message: message.to_string(),
        })
        .await
    }

    async fn send(&mut self, payload: Payload) -> Result<(), GambitError> {
        let envelope = Envelope::new(self.next_seq(), self.elapsed_ms(), payload);
        let bytes = self.state.codec.encode(&envelope)?;
        time::timeout(self.state.heartbeat.timeout(), self.conn.send(&bytes))
            .await
            .map_err(|_| GambitError::SendTimeout(self.session))??;
        Ok(())
    }

    async fn ping(&self) -> Result<(), GambitError> {
        time::timeout(self.state.heartbeat.timeout(), self.conn.ping())
            .await
            .map_err(|_| GambitError::SendTimeout(self.session))??;
        Ok(())
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Increments and returns the next sequence number.
    fn next_seq(&mut self) -> u64 {
        let current = self.seq;
        self.seq += 1;
        current
    }
}
