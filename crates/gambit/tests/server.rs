//! Integration tests for the Gambit server, handler, and full connection flow.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gambit::prelude::*;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// How long to wait for a frame that should arrive.
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to wait before concluding that no frame is coming.
const QUIET_PERIOD: Duration = Duration::from_millis(150);

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    start_server_with(GambitServerBuilder::new()).await
}

async fn start_server_with(builder: GambitServerBuilder) -> String {
    let server = builder
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, payload: Payload) {
    let text = serde_json::to_string(&Envelope::new(0, 0, payload)).expect("encode");
    ws.send(Message::Text(text.into())).await.expect("send");
}

async fn send_game(ws: &mut ClientWs, msg: GameMessage) {
    send(ws, Payload::Game(msg)).await;
}

/// Receives the next envelope, skipping control frames.
async fn recv(ws: &mut ClientWs) -> Envelope {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("recv error");
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).expect("decode"),
            Message::Binary(data) => return serde_json::from_slice(&data).expect("decode"),
            _ => continue,
        }
    }
}

async fn recv_game(ws: &mut ClientWs) -> GameMessage {
    match recv(ws).await.payload {
        Payload::Game(msg) => msg,
        other => panic!("expected a game message, got {other:?}"),
    }
}

async fn recv_two(ws: &mut ClientWs) -> (GameMessage, GameMessage) {
    (recv_game(ws).await, recv_game(ws).await)
}

async fn recv_error_code(ws: &mut ClientWs) -> u16 {
    match recv(ws).await.payload {
        Payload::Error { code, .. } => code,
        other => panic!("expected an error, got {other:?}"),
    }
}

/// Asserts that no data frame arrives for a short while.
async fn assert_silent(ws: &mut ClientWs) {
    let deadline = tokio::time::Instant::now() + QUIET_PERIOD;
    while let Ok(Some(Ok(msg))) = tokio::time::timeout_at(deadline, ws.next()).await {
        if msg.is_text() || msg.is_binary() {
            panic!("expected silence, got {msg:?}");
        }
    }
}

async fn create_room(ws: &mut ClientWs) -> RoomCode {
    send(ws, Payload::Lobby(LobbyMessage::CreateRoom)).await;
    match recv(ws).await.payload {
        Payload::Lobby(LobbyMessage::RoomCreated { id }) => id,
        other => panic!("expected roomCreated, got {other:?}"),
    }
}

/// Joins `code` and claims `name`, returning the assigned role.
async fn join_as(ws: &mut ClientWs, code: &RoomCode, name: &str) -> Role {
    send_game(
        ws,
        GameMessage::JoinRoom {
            room_id: code.to_string(),
        },
    )
    .await;
    match recv_game(ws).await {
        GameMessage::RoomJoined { room } => assert_eq!(&room.id, code),
        other => panic!("expected roomJoined, got {other:?}"),
    }

    send_game(ws, GameMessage::CreateUsername { name: name.into() }).await;
    match recv_game(ws).await {
        GameMessage::UsernameCreated { role, name: stored } => {
            assert_eq!(stored, name);
            role
        }
        other => panic!("expected usernameCreated, got {other:?}"),
    }
}

/// A room with `alice` seated first and `bob` second. Both inboxes are
/// empty on return.
async fn seated_pair(addr: &str) -> (RoomCode, ClientWs, ClientWs) {
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    let code = create_room(&mut alice).await;

    assert_eq!(join_as(&mut alice, &code, "alice").await, Role::First);
    assert_eq!(join_as(&mut bob, &code, "bob").await, Role::Second);
    assert_eq!(
        recv_game(&mut alice).await,
        GameMessage::MemberJoined {
            role: Role::Second,
            name: "bob".into()
        }
    );
    (code, alice, bob)
}

/// Polls the lobby until `code` stops resolving.
async fn wait_until_deleted(ws: &mut ClientWs, code: &RoomCode) {
    for _ in 0..20 {
        send(
            ws,
            Payload::Lobby(LobbyMessage::JoinExistingRoom {
                id: code.to_string(),
            }),
        )
        .await;
        match tokio::time::timeout(QUIET_PERIOD, recv(ws)).await {
            Err(_) => return,
            Ok(env) => assert!(matches!(
                env.payload,
                Payload::Lobby(LobbyMessage::RoomAllowed { .. })
            )),
        }
    }
    panic!("room {code} was never deleted");
}

// =========================================================================
// Lobby
// =========================================================================

#[tokio::test]
async fn test_create_room_returns_code() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, Payload::Lobby(LobbyMessage::CreateRoom)).await;
    let env = recv(&mut ws).await;

    assert_eq!(env.seq, 1, "server frames count from 1");
    match env.payload {
        Payload::Lobby(LobbyMessage::RoomCreated { id }) => {
            assert_eq!(id.as_str().len(), 6);
            assert!(id.as_str().bytes().all(|b| b.is_ascii_lowercase()));
        }
        other => panic!("expected roomCreated, got {other:?}"),
    }
}

#[tokio::test]
async fn test_created_codes_are_distinct() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let a = create_room(&mut ws).await;
    let b = create_room(&mut ws).await;
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_create_room_at_room_limit_is_503() {
    let addr = start_server_with(GambitServerBuilder::new().registry_config(RegistryConfig {
        max_rooms: 1,
        ..RegistryConfig::default()
    }))
    .await;
    let mut ws = connect(&addr).await;

    create_room(&mut ws).await;
    send(&mut ws, Payload::Lobby(LobbyMessage::CreateRoom)).await;
    assert_eq!(recv_error_code(&mut ws).await, 503);
}

#[tokio::test]
async fn test_join_existing_room_normalizes_case() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    let code = create_room(&mut ws).await;

    send(
        &mut ws,
        Payload::Lobby(LobbyMessage::JoinExistingRoom {
            id: code.as_str().to_uppercase(),
        }),
    )
    .await;
    match recv(&mut ws).await.payload {
        Payload::Lobby(LobbyMessage::RoomAllowed { id }) => assert_eq!(id, code),
        other => panic!("expected roomAllowed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_existing_unknown_room_is_silent() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    for id in ["zzzzzz", "not a code", ""] {
        send(&mut ws, Payload::Lobby(LobbyMessage::JoinExistingRoom { id: id.into() })).await;
    }
    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn test_undecodable_frame_is_skipped() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::Text("{not json".into())).await.unwrap();
    ws.send(Message::Text(json!({ "payload": { "type": "Nope" } }).to_string().into()))
        .await
        .unwrap();

    // The connection is still usable.
    create_room(&mut ws).await;
}

// =========================================================================
// Role assignment
// =========================================================================

#[tokio::test]
async fn test_join_unknown_room_sends_no_room_found() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send_game(
        &mut ws,
        GameMessage::JoinRoom {
            room_id: "qqqqqq".into(),
        },
    )
    .await;
    assert_eq!(recv_game(&mut ws).await, GameMessage::NoRoomFound);
}

#[tokio::test]
async fn test_room_joined_snapshot_shows_members() {
    let addr = start_server().await;
    let (code, _alice, _bob) = seated_pair(&addr).await;
    let mut carol = connect(&addr).await;

    send_game(
        &mut carol,
        GameMessage::JoinRoom {
            room_id: code.to_string(),
        },
    )
    .await;
    match recv_game(&mut carol).await {
        GameMessage::RoomJoined { room } => {
            assert_eq!(room.first_player.as_deref(), Some("alice"));
            assert_eq!(room.second_player.as_deref(), Some("bob"));
            assert!(room.spectators.is_empty());
            assert_eq!(room.status, GameStatus::Waiting);
        }
        other => panic!("expected roomJoined, got {other:?}"),
    }
}

#[tokio::test]
async fn test_duplicate_name_rejected_case_insensitively() {
    let addr = start_server().await;
    let (code, mut alice, mut bob) = seated_pair(&addr).await;
    let mut third = connect(&addr).await;

    send_game(
        &mut third,
        GameMessage::JoinRoom {
            room_id: code.to_string(),
        },
    )
    .await;
    recv_game(&mut third).await;
    send_game(
        &mut third,
        GameMessage::CreateUsername {
            name: "ALICE".into(),
        },
    )
    .await;

    assert_eq!(recv_game(&mut third).await, GameMessage::UsernameTaken);
    assert_silent(&mut alice).await;
    assert_silent(&mut bob).await;

    // Still bound; a fresh name lands in the spectator queue.
    send_game(
        &mut third,
        GameMessage::CreateUsername {
            name: "carol".into(),
        },
    )
    .await;
    assert_eq!(
        recv_game(&mut third).await,
        GameMessage::UsernameCreated {
            role: Role::Spectator,
            name: "carol".into()
        }
    );
    let joined = GameMessage::MemberJoined {
        role: Role::Spectator,
        name: "carol".into(),
    };
    assert_eq!(recv_game(&mut alice).await, joined);
    assert_eq!(recv_game(&mut bob).await, joined);
}

#[tokio::test]
async fn test_blank_name_is_bad_request() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    let code = create_room(&mut ws).await;

    send_game(
        &mut ws,
        GameMessage::JoinRoom {
            room_id: code.to_string(),
        },
    )
    .await;
    recv_game(&mut ws).await;
    send_game(&mut ws, GameMessage::CreateUsername { name: "   ".into() }).await;

    assert_eq!(recv_error_code(&mut ws).await, 400);
}

#[tokio::test]
async fn test_game_message_without_room_is_bad_request() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send_game(&mut ws, GameMessage::CreateUsername { name: "x".into() }).await;
    assert_eq!(recv_error_code(&mut ws).await, 400);

    send_game(&mut ws, GameMessage::BeginGame).await;
    assert_eq!(recv_error_code(&mut ws).await, 400);
}

#[tokio::test]
async fn test_conflicting_session_state_is_409() {
    let addr = start_server().await;
    let (code, mut alice, _bob) = seated_pair(&addr).await;

    send_game(
        &mut alice,
        GameMessage::JoinRoom {
            room_id: code.to_string(),
        },
    )
    .await;
    assert_eq!(recv_error_code(&mut alice).await, 409);

    send_game(
        &mut alice,
        GameMessage::CreateUsername {
            name: "again".into(),
        },
    )
    .await;
    assert_eq!(recv_error_code(&mut alice).await, 409);
}

// =========================================================================
// Game relay
// =========================================================================

#[tokio::test]
async fn test_begin_game_with_one_player() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    let code = create_room(&mut ws).await;
    join_as(&mut ws, &code, "alice").await;

    send_game(&mut ws, GameMessage::BeginGame).await;
    assert_eq!(recv_game(&mut ws).await, GameMessage::InsufficientPlayers);
}

#[tokio::test]
async fn test_full_game_flow() {
    let addr = start_server().await;
    let (_code, mut alice, mut bob) = seated_pair(&addr).await;

    send_game(&mut alice, GameMessage::BeginGame).await;
    let started = GameMessage::GameStarted { turn: Side::First };
    assert_eq!(recv_game(&mut alice).await, started);
    assert_eq!(recv_game(&mut bob).await, started);

    let mv = json!({ "from": "e2", "to": "e4" });
    send_game(&mut alice, GameMessage::UserMovedPiece { mv: mv.clone() }).await;
    assert_eq!(recv_game(&mut bob).await, GameMessage::OpponentMove { mv });

    send_game(&mut bob, GameMessage::UpdateTeamUp { team: Side::First }).await;
    send_game(
        &mut bob,
        GameMessage::PieceTaken {
            color: Side::Second,
            piece_kind: "pawn".into(),
        },
    )
    .await;
    send_game(&mut bob, GameMessage::KingTaken { team: Side::Second }).await;
    let over = GameMessage::GameOver {
        winner: Side::Second,
    };
    assert_eq!(recv_game(&mut alice).await, over);
    assert_eq!(recv_game(&mut bob).await, over);

    send_game(&mut alice, GameMessage::StartNewGame).await;
    assert_eq!(recv_game(&mut alice).await, GameMessage::BoardReset);
    assert_eq!(recv_game(&mut bob).await, GameMessage::BoardReset);

    // The mover never hears its own move.
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn test_draw_and_resign() {
    let addr = start_server().await;
    let (_code, mut alice, mut bob) = seated_pair(&addr).await;

    send_game(&mut alice, GameMessage::UserWantsDraw).await;
    assert_eq!(recv_game(&mut bob).await, GameMessage::DrawOffered);
    send_game(&mut bob, GameMessage::UserAcceptsDraw).await;
    assert_eq!(recv_game(&mut alice).await, GameMessage::GameDrawn);
    assert_eq!(recv_game(&mut bob).await, GameMessage::GameDrawn);

    send_game(&mut bob, GameMessage::Resign { who: Side::Second }).await;
    let resigned = GameMessage::MemberResigned { who: Side::Second };
    assert_eq!(recv_game(&mut alice).await, resigned);
    assert_eq!(recv_game(&mut bob).await, resigned);
}

#[tokio::test]
async fn test_resume_game_goes_to_others() {
    let addr = start_server().await;
    let (_code, mut alice, mut bob) = seated_pair(&addr).await;

    send_game(&mut bob, GameMessage::ResumeGame).await;
    assert_eq!(recv_game(&mut alice).await, GameMessage::ResumeGame);
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    let addr = start_server().await;
    let (_a, mut alice, _bob) = seated_pair(&addr).await;
    let (_b, mut carol, _dave) = seated_pair(&addr).await;

    send_game(&mut alice, GameMessage::StartNewGame).await;
    assert_eq!(recv_game(&mut alice).await, GameMessage::BoardReset);
    assert_silent(&mut carol).await;
}

// =========================================================================
// Departures
// =========================================================================

#[tokio::test]
async fn test_disconnect_promotes_spectator() {
    let addr = start_server().await;
    let (code, mut alice, mut bob) = seated_pair(&addr).await;
    let mut carol = connect(&addr).await;
    assert_eq!(join_as(&mut carol, &code, "carol").await, Role::Spectator);
    recv_game(&mut alice).await;
    recv_game(&mut bob).await;

    alice.close(None).await.unwrap();
    drop(alice);

    let left = GameMessage::MemberLeft {
        role: Role::First,
        name: "alice".into(),
    };
    let promoted = GameMessage::MemberPromoted {
        role: Role::First,
        name: "carol".into(),
    };
    for ws in [&mut bob, &mut carol] {
        assert_eq!(recv_game(ws).await, left);
        assert_eq!(recv_game(ws).await, promoted);
    }

    // carol now plays first; a start needs only the two seats.
    send_game(&mut carol, GameMessage::BeginGame).await;
    assert_eq!(
        recv_game(&mut bob).await,
        GameMessage::GameStarted { turn: Side::First }
    );
}

#[tokio::test]
async fn test_silent_client_is_dropped_and_spectator_promoted() {
    let addr = start_server_with(GambitServerBuilder::new().heartbeat(HeartbeatConfig {
        interval: Duration::from_millis(100),
        max_missed: 5,
    }))
    .await;
    let (code, alice, mut bob) = seated_pair(&addr).await;
    let mut carol = connect(&addr).await;
    assert_eq!(join_as(&mut carol, &code, "carol").await, Role::Spectator);
    recv_game(&mut bob).await;

    // alice keeps her socket open but never reads again, so she never
    // answers a ping. bob and carol answer theirs while they wait.
    let _alice = alice;

    let left = GameMessage::MemberLeft {
        role: Role::First,
        name: "alice".into(),
    };
    let promoted = GameMessage::MemberPromoted {
        role: Role::First,
        name: "carol".into(),
    };
    // Wait on both at once; a client that is not being read does not pong.
    let (for_bob, for_carol) = tokio::join!(recv_two(&mut bob), recv_two(&mut carol));
    assert_eq!(for_bob, (left.clone(), promoted.clone()));
    assert_eq!(for_carol, (left, promoted));
}

#[tokio::test]
async fn test_responsive_client_outlives_heartbeat_timeout() {
    let addr = start_server_with(GambitServerBuilder::new().heartbeat(HeartbeatConfig {
        interval: Duration::from_millis(50),
        max_missed: 4,
    }))
    .await;
    let (_code, mut alice, mut bob) = seated_pair(&addr).await;

    // Both clients keep reading well past the timeout, answering pings.
    for _ in 0..4 {
        tokio::join!(assert_silent(&mut alice), assert_silent(&mut bob));
    }

    send_game(&mut alice, GameMessage::BeginGame).await;
    assert_eq!(
        recv_game(&mut bob).await,
        GameMessage::GameStarted { turn: Side::First }
    );
}

#[tokio::test]
async fn test_leave_game_with_empty_queue() {
    let addr = start_server().await;
    let (_code, mut alice, mut bob) = seated_pair(&addr).await;

    // The payload is only a hint; the server uses its own record.
    send_game(
        &mut bob,
        GameMessage::LeaveGame {
            team: Some(Role::First),
            name: Some("alice".into()),
        },
    )
    .await;

    assert_eq!(
        recv_game(&mut alice).await,
        GameMessage::MemberLeft {
            role: Role::Second,
            name: "bob".into()
        }
    );
    assert_eq!(
        recv_game(&mut alice).await,
        GameMessage::AwaitingReplacement { role: Role::Second }
    );
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn test_last_leave_deletes_room() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    let code = create_room(&mut ws).await;
    join_as(&mut ws, &code, "alice").await;

    send_game(
        &mut ws,
        GameMessage::LeaveGame {
            team: None,
            name: None,
        },
    )
    .await;
    // Frames are handled in order, so the leave is done before this join.
    send_game(
        &mut ws,
        GameMessage::JoinRoom {
            room_id: code.to_string(),
        },
    )
    .await;
    assert_eq!(recv_game(&mut ws).await, GameMessage::NoRoomFound);
}

#[tokio::test]
async fn test_disconnect_of_last_member_deletes_room() {
    let addr = start_server().await;
    let mut observer = connect(&addr).await;
    let mut ws = connect(&addr).await;
    let code = create_room(&mut ws).await;
    join_as(&mut ws, &code, "alice").await;

    ws.close(None).await.unwrap();
    drop(ws);

    wait_until_deleted(&mut observer, &code).await;
}

#[tokio::test]
async fn test_pending_join_keeps_room_alive() {
    let addr = start_server().await;
    let (code, mut alice, mut bob) = seated_pair(&addr).await;

    // carol binds to the room but never picks a name.
    let mut carol = connect(&addr).await;
    send_game(
        &mut carol,
        GameMessage::JoinRoom {
            room_id: code.to_string(),
        },
    )
    .await;
    recv_game(&mut carol).await;

    for ws in [&mut alice, &mut bob] {
        send_game(
            ws,
            GameMessage::LeaveGame {
                team: None,
                name: None,
            },
        )
        .await;
    }

    // A pending member is in the room, so it hears both departures. Wait
    // for all four notices before claiming a seat.
    for _ in 0..4 {
        match recv_game(&mut carol).await {
            GameMessage::MemberLeft { .. } | GameMessage::AwaitingReplacement { .. } => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    // carol can still finish joining, and takes the first seat.
    send_game(
        &mut carol,
        GameMessage::CreateUsername {
            name: "carol".into(),
        },
    )
    .await;
    assert_eq!(
        recv_game(&mut carol).await,
        GameMessage::UsernameCreated {
            role: Role::First,
            name: "carol".into()
        }
    );
}
