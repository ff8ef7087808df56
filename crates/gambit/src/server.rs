//! `GambitServer` builder and server loop.
//!
//! This is the entry point for running a Gambit server. It ties together
//! all the layers: transport → protocol → session → room.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gambit_protocol::{Codec, JsonCodec};
use gambit_room::{RegistryConfig, RoomRegistry};
use gambit_session::SessionManager;
use gambit_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::GambitError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// The two locks are never held at the same time.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: Mutex<RoomRegistry>,
    pub(crate) codec: C,
    pub(crate) heartbeat: HeartbeatConfig,
}

/// Keepalive settings for client connections.
///
/// The server pings every client each `interval`. Any frame from the
/// client, a pong included, counts as a sign of life; a client that stays
/// silent for `max_missed` intervals in a row is disconnected. The same
/// budget bounds how long a single send may block on a peer that stopped
/// reading.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    pub interval: Duration,
    pub max_missed: u32,
}

impl HeartbeatConfig {
    /// How long a client may stay silent before it is dropped.
    pub fn timeout(&self) -> Duration {
        self.interval * self.max_missed
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_missed: 3,
        }
    }
}

/// Builder for configuring and starting a Gambit server.
///
/// # Example
///
/// ```rust,no_run
/// use gambit::prelude::*;
///
/// # async fn run() -> Result<(), GambitError> {
/// let server = GambitServer::builder()
///     .bind("0.0.0.0:8000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct GambitServerBuilder {
    bind_addr: String,
    registry_config: RegistryConfig,
    heartbeat: HeartbeatConfig,
}

impl GambitServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            registry_config: RegistryConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the room registry configuration.
    pub fn registry_config(mut self, config: RegistryConfig) -> Self {
        self.registry_config = config;
        self
    }

    /// Sets the client keepalive settings.
    pub fn heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<GambitServer<JsonCodec>, GambitError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new()),
            rooms: Mutex::new(RoomRegistry::new(self.registry_config)),
            codec: JsonCodec,
            heartbeat: self.heartbeat,
        });

        Ok(GambitServer { transport, state })
    }
}

impl Default for GambitServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Gambit server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GambitServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl GambitServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> GambitServerBuilder {
        GambitServerBuilder::new()
    }
}

impl<C: Codec> GambitServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, GambitError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), GambitError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "gambit server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
