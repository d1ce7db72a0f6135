//! TCP client for talking to a game server
//!
//! Used by integration tests and bots. Tracks the room it is seated in and
//! the last roster it saw; everything else is passed through as
//! [`ServerEvent`]s. The event stream ends when the connection drops.
//!
//! A quiet client pings every [`KEEPALIVE_INTERVAL`] so the server's idle
//! timeout does not drop it; the matching `pong`s show up in the stream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use impostor_core::models::PlayerView;

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{ClientMessage, ServerEvent};

/// How often a connected client pings; well under the server's default
/// idle timeout
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Client handle for network operations
pub struct Client {
    state: Arc<RwLock<ClientState>>,
    event_rx: mpsc::Receiver<ServerEvent>,
    cmd_tx: mpsc::Sender<ClientCommand>,
}

struct ClientState {
    connection: ConnectionState,
    room_code: Option<String>,
    players: Vec<PlayerView>,
}

enum ClientCommand {
    Send(ClientMessage),
    Disconnect,
}

impl Client {
    /// Connect to a game server
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        info!(addr = %addr, "Connecting to server");

        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = tokio::io::split(stream);

        let state = Arc::new(RwLock::new(ClientState {
            connection: ConnectionState::Connected,
            room_code: None,
            players: Vec::new(),
        }));

        let (event_tx, event_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(64);

        tokio::spawn(connection_task(
            reader,
            writer,
            state.clone(),
            event_tx,
            cmd_rx,
        ));

        Ok(Client {
            state,
            event_rx,
            cmd_tx,
        })
    }

    /// Get the next server event; `None` once disconnected
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.event_rx.recv().await
    }

    /// Queue an action for the server
    pub async fn send(&self, msg: ClientMessage) -> Result<()> {
        self.cmd_tx
            .send(ClientCommand::Send(msg))
            .await
            .map_err(|_| Error::NotConnected)
    }

    /// Send a ping
    pub async fn ping(&self) -> Result<()> {
        self.send(ClientMessage::Ping).await
    }

    /// Close the connection. The server treats this as a dropped
    /// connection, not a voluntary leave.
    pub async fn disconnect(&self) {
        let _ = self.cmd_tx.send(ClientCommand::Disconnect).await;
    }

    /// Get current connection state
    pub async fn connection_state(&self) -> ConnectionState {
        self.state.read().await.connection
    }

    /// Room this client was last seated in
    pub async fn room_code(&self) -> Option<String> {
        self.state.read().await.room_code.clone()
    }

    /// Last roster received
    pub async fn players(&self) -> Vec<PlayerView> {
        self.state.read().await.players.clone()
    }
}

/// Main connection task
async fn connection_task(
    mut reader: ReadHalf<TcpStream>,
    mut writer: WriteHalf<TcpStream>,
    state: Arc<RwLock<ClientState>>,
    event_tx: mpsc::Sender<ServerEvent>,
    mut cmd_rx: mpsc::Receiver<ClientCommand>,
) {
    let mut keepalive = interval_at(Instant::now() + KEEPALIVE_INTERVAL, KEEPALIVE_INTERVAL);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // Incoming event from server
            result = read_frame::<_, ServerEvent>(&mut reader) => {
                match result {
                    Ok(event) => {
                        track(&state, &event).await;
                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(Error::Decode(e)) => {
                        debug!(error = %e, "Ignoring unknown event");
                    }
                    Err(Error::ConnectionClosed) => {
                        debug!("Server closed connection");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Read error");
                        break;
                    }
                }
            }

            // Outgoing command
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ClientCommand::Send(msg)) => {
                        if let Err(e) = write_frame(&mut writer, &msg).await {
                            warn!(error = %e, "Write error");
                            break;
                        }
                        keepalive.reset();
                    }
                    Some(ClientCommand::Disconnect) | None => {
                        debug!("Disconnect requested");
                        break;
                    }
                }
            }

            _ = keepalive.tick() => {
                if let Err(e) = write_frame(&mut writer, &ClientMessage::Ping).await {
                    warn!(error = %e, "Keepalive failed");
                    break;
                }
            }
        }
    }

    // Cleanup
    {
        let mut s = state.write().await;
        s.connection = ConnectionState::Disconnected;
    }
    info!("Disconnected from server");
}

/// Keep the local view of the room in step with the server
async fn track(state: &Arc<RwLock<ClientState>>, event: &ServerEvent) {
    let mut s = state.write().await;
    match event {
        ServerEvent::RoomCreated(entered) | ServerEvent::RoomJoined(entered) => {
            s.room_code = Some(entered.room_code.clone());
            s.players = entered.players.clone();
        }
        ServerEvent::UpdatePlayers(players) => {
            s.players = players.clone();
        }
        ServerEvent::GameStarted(view) => {
            s.players = view.players.clone();
        }
        _ => {}
    }
}
