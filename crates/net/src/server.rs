//! TCP server hosting game rooms
//!
//! Every connection gets a reader loop and a writer task. Readers push
//! decoded actions into one queue; a single orchestrator task drains it, so
//! room state is only ever touched from one place. Grace timers post back
//! into the same queue.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use impostor_core::{
    ConnectionId, Dictionary, Gateway, GraceTimers, LossToken, Orchestrator, ServerConfig,
    ServerEvent,
};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::hub::ConnectionHub;
use crate::protocol::ClientMessage;
use crate::timers::TokioTimers;

/// Per-connection outbound queue depth
const OUTBOUND_QUEUE: usize = 64;

/// Orchestrator inbox depth
const EVENT_QUEUE: usize = 1024;

/// Everything the orchestrator task reacts to
pub(crate) enum Event {
    Opened {
        conn: ConnectionId,
        tx: mpsc::Sender<ServerEvent>,
    },
    Message {
        conn: ConnectionId,
        msg: ClientMessage,
    },
    Closed {
        conn: ConnectionId,
    },
    GraceExpired {
        room: String,
        token: LossToken,
    },
    Inspect {
        reply: oneshot::Sender<ServerStats>,
    },
}

/// Point-in-time counters, mostly for tests and health checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerStats {
    pub rooms: usize,
    pub connections: usize,
    pub pending_losses: usize,
    pub armed_timers: usize,
}

/// Side-effect sink handed to the orchestrator
struct Outlet {
    hub: ConnectionHub,
    timers: TokioTimers,
}

impl Gateway for Outlet {
    fn send(&mut self, conn: ConnectionId, event: ServerEvent) {
        self.hub.send(conn, event);
    }

    fn broadcast(&mut self, room: &str, event: ServerEvent) {
        self.hub.broadcast(room, event);
    }

    fn subscribe(&mut self, conn: ConnectionId, room: &str) {
        self.hub.subscribe(conn, room);
    }

    fn unsubscribe(&mut self, conn: ConnectionId, room: &str) {
        self.hub.unsubscribe(conn, room);
    }
}

impl GraceTimers for Outlet {
    fn arm(&mut self, room: &str, token: LossToken, after: Duration) {
        self.timers.arm(room, token, after);
    }

    fn cancel(&mut self, room: &str, token: LossToken) {
        self.timers.cancel(room, token);
    }
}

/// Game server handle
pub struct Server {
    addr: SocketAddr,
    events: mpsc::Sender<Event>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind and start serving
    pub async fn start(config: &ServerConfig, dictionary: Box<dyn Dictionary>) -> Result<Self> {
        let listener = TcpListener::bind(config.socket_addr()).await?;
        let bound_addr = listener.local_addr()?;

        info!(
            addr = %bound_addr,
            grace_secs = config.grace_period_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_connections = config.max_connections,
            "Server started"
        );

        let (shutdown_tx, _) = broadcast::channel(1);
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);

        let orchestrator = Orchestrator::new(config.rules(), dictionary);
        let outlet = Outlet {
            hub: ConnectionHub::new(),
            timers: TokioTimers::new(event_tx.clone()),
        };
        tokio::spawn(orchestrator_task(
            orchestrator,
            outlet,
            event_rx,
            shutdown_tx.subscribe(),
        ));

        let limit = Arc::new(Semaphore::new(config.max_connections.max(1)));
        tokio::spawn(accept_loop(
            listener,
            event_tx.clone(),
            limit,
            config.idle_timeout(),
            shutdown_tx.clone(),
        ));

        Ok(Server {
            addr: bound_addr,
            events: event_tx,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn stats(&self) -> Result<ServerStats> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(Event::Inspect { reply })
            .await
            .map_err(|_| Error::ServerStopped)?;
        rx.await.map_err(|_| Error::ServerStopped)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    events: mpsc::Sender<Event>,
    limit: Arc<Semaphore>,
    idle: Option<Duration>,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut shutdown_rx = shutdown_tx.subscribe();
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        let Ok(permit) = limit.clone().try_acquire_owned() else {
                            warn!(addr = %addr, "Connection limit reached; refusing");
                            drop(stream);
                            continue;
                        };
                        debug!(addr = %addr, "New connection");
                        tokio::spawn(handle_connection(
                            stream,
                            addr,
                            events.clone(),
                            permit,
                            idle,
                            shutdown_tx.subscribe(),
                        ));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Handle a single client connection
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    events: mpsc::Sender<Event>,
    _permit: OwnedSemaphorePermit,
    idle: Option<Duration>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let conn = Uuid::new_v4();
    let (mut reader, writer) = tokio::io::split(stream);

    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
    let writer_handle = tokio::spawn(writer_task(writer, rx));

    if events
        .send(Event::Opened {
            conn,
            tx: tx.clone(),
        })
        .await
        .is_err()
    {
        writer_handle.abort();
        return;
    }
    info!(addr = %addr, conn = %conn, "Connection opened");

    // Read loop
    loop {
        tokio::select! {
            result = next_frame(&mut reader, idle) => {
                match result {
                    Ok(ClientMessage::Ping) => {
                        let _ = tx.try_send(ServerEvent::Pong);
                    }
                    Ok(msg) => {
                        debug!(conn = %conn, action = msg.action(), "Action received");
                        if events.send(Event::Message { conn, msg }).await.is_err() {
                            break;
                        }
                    }
                    Err(Error::Decode(e)) => {
                        debug!(conn = %conn, error = %e, "Ignoring malformed message");
                    }
                    Err(Error::ConnectionClosed) => {
                        debug!(conn = %conn, "Connection closed");
                        break;
                    }
                    Err(Error::IdleTimeout(limit)) => {
                        info!(conn = %conn, idle_secs = limit.as_secs(), "Peer went silent; dropping");
                        break;
                    }
                    Err(e) => {
                        warn!(conn = %conn, error = %e, "Read error");
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    // Cleanup
    let _ = events.send(Event::Closed { conn }).await;
    writer_handle.abort();

    info!(conn = %conn, "Connection closed");
}

/// Read the next action, giving up once the peer has been silent for `idle`
async fn next_frame(
    reader: &mut ReadHalf<TcpStream>,
    idle: Option<Duration>,
) -> Result<ClientMessage> {
    match idle {
        Some(limit) => tokio::time::timeout(limit, read_frame(reader))
            .await
            .map_err(|_| Error::IdleTimeout(limit))?,
        None => read_frame(reader).await,
    }
}

/// Writer task - sends events to the client
async fn writer_task(mut writer: WriteHalf<TcpStream>, mut rx: mpsc::Receiver<ServerEvent>) {
    while let Some(event) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &event).await {
            debug!(error = %e, "Write failed");
            break;
        }
    }
}

/// Owns all room state; handles one event at a time
async fn orchestrator_task(
    mut orchestrator: Orchestrator,
    mut outlet: Outlet,
    mut events: mpsc::Receiver<Event>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => dispatch(&mut orchestrator, &mut outlet, event),
                    None => break,
                }
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    outlet.timers.abort_all();
    info!(rooms = orchestrator.registry().len(), "Orchestrator stopped");
}

fn dispatch(orchestrator: &mut Orchestrator, outlet: &mut Outlet, event: Event) {
    match event {
        Event::Opened { conn, tx } => outlet.hub.register(conn, tx),
        Event::Message { conn, msg } => route(orchestrator, outlet, conn, msg),
        Event::Closed { conn } => {
            orchestrator.connection_closed(outlet, conn);
            outlet.hub.deregister(conn);
        }
        Event::GraceExpired { room, token } => {
            outlet.timers.fired(token);
            orchestrator.grace_expired(outlet, &room, token);
        }
        Event::Inspect { reply } => {
            let _ = reply.send(ServerStats {
                rooms: orchestrator.registry().len(),
                connections: outlet.hub.connection_count(),
                pending_losses: orchestrator.presence().pending_count(),
                armed_timers: outlet.timers.armed_count(),
            });
        }
    }
}

fn route(orchestrator: &mut Orchestrator, outlet: &mut Outlet, conn: ConnectionId, msg: ClientMessage) {
    match msg {
        ClientMessage::CreateRoom(create) => {
            orchestrator.create_room(outlet, conn, &create.nickname, create.avatar, create.settings)
        }
        ClientMessage::JoinRoom(join) => {
            orchestrator.join_room(outlet, conn, &join.room_code, &join.nickname, join.avatar)
        }
        ClientMessage::StartGame(start) => {
            orchestrator.start_game(outlet, conn, &start.room_code, start.config)
        }
        ClientMessage::StartDebate(room) => orchestrator.start_debate(outlet, conn, &room.room_code),
        ClientMessage::VotePlayer(vote) => {
            orchestrator.vote(outlet, conn, &vote.room_code, vote.voted_id)
        }
        ClientMessage::LeaveRoom => orchestrator.leave_room(outlet, conn),
        ClientMessage::ReturnToLobby(room) => {
            orchestrator.return_to_lobby(outlet, conn, &room.room_code)
        }
        ClientMessage::Ping => outlet.hub.send(conn, ServerEvent::Pong),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    use impostor_core::models::{PlayerView, Role};
    use impostor_core::WordBank;

    use crate::client::Client;

    const WAIT: Duration = Duration::from_secs(5);

    fn config(grace_period_secs: u64) -> ServerConfig {
        ServerConfig {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            grace_period_secs,
            ..Default::default()
        }
    }

    async fn start(config: &ServerConfig) -> Server {
        Server::start(config, Box::new(WordBank::builtin()))
            .await
            .unwrap()
    }

    /// Skip events until one named `name` arrives
    async fn expect(client: &mut Client, name: &str) -> ServerEvent {
        loop {
            let event = tokio::time::timeout(WAIT, client.next_event())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {}", name))
                .unwrap_or_else(|| panic!("connection closed waiting for {}", name));
            if event.name() == name {
                return event;
            }
        }
    }

    async fn roster(client: &mut Client) -> Vec<PlayerView> {
        match expect(client, "update_players").await {
            ServerEvent::UpdatePlayers(players) => players,
            _ => unreachable!(),
        }
    }

    /// Host plus two guests seated in one room
    async fn seated(server: &Server) -> (String, Vec<Client>) {
        let mut host = Client::connect(server.addr()).await.unwrap();
        host.send(ClientMessage::create_room("host", None))
            .await
            .unwrap();
        let code = match expect(&mut host, "room_created").await {
            ServerEvent::RoomCreated(entered) => entered.room_code,
            _ => unreachable!(),
        };

        let mut clients = vec![host];
        for name in ["p2", "p3"] {
            let mut guest = Client::connect(server.addr()).await.unwrap();
            guest
                .send(ClientMessage::join_room(code.to_lowercase(), name))
                .await
                .unwrap();
            expect(&mut guest, "room_joined").await;
            clients.push(guest);
        }
        // Host sees the roster grow to three
        while roster(&mut clients[0]).await.len() < 3 {}
        (code, clients)
    }

    #[tokio::test]
    async fn test_server_start() {
        let server = start(&config(30)).await;
        assert!(server.addr().port() > 0);
        assert_eq!(server.stats().await.unwrap().rooms, 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_full_round() {
        let server = start(&config(30)).await;
        let (code, mut clients) = seated(&server).await;

        clients[0]
            .send(ClientMessage::start_game(&code, None))
            .await
            .unwrap();

        let mut impostors = 0;
        let mut players = Vec::new();
        for client in clients.iter_mut() {
            let ServerEvent::GameStarted(view) = expect(client, "game_started").await else {
                unreachable!();
            };
            if view.role == Role::Impostor {
                impostors += 1;
                assert_eq!(view.word, "???");
            }
            players = view.players;
        }
        assert_eq!(impostors, 1);

        let target = players.iter().find(|p| p.name == "p2").unwrap().id;
        clients[1]
            .send(ClientMessage::start_debate(&code))
            .await
            .unwrap();
        for client in clients.iter_mut() {
            expect(client, "debate_started").await;
            client.send(ClientMessage::vote(&code, target)).await.unwrap();
        }

        for client in clients.iter_mut() {
            let ServerEvent::VotingResults(results) = expect(client, "voting_results").await
            else {
                unreachable!();
            };
            assert!(!results.is_tie);
            assert_eq!(results.most_voted_player.unwrap().name, "p2");
            assert_eq!(results.votes_detail[&target], 3);
            assert_eq!(results.impostors.len(), 1);
        }
        server.shutdown();
    }

    #[tokio::test]
    async fn test_rejoin_within_grace() {
        let server = start(&config(30)).await;
        let (code, mut clients) = seated(&server).await;

        let dropped = clients.pop().unwrap();
        dropped.disconnect().await;
        let players = roster(&mut clients[0]).await;
        assert!(!players.iter().find(|p| p.name == "p3").unwrap().connected);
        assert_eq!(server.stats().await.unwrap().pending_losses, 1);

        let mut back = Client::connect(server.addr()).await.unwrap();
        back.send(ClientMessage::join_room(&code, "p3")).await.unwrap();
        let ServerEvent::RoomJoined(entered) = expect(&mut back, "room_joined").await else {
            unreachable!();
        };
        assert_eq!(entered.players.len(), 3);
        assert!(entered.players.iter().all(|p| p.connected));

        let stats = server.stats().await.unwrap();
        assert_eq!(stats.pending_losses, 0);
        assert_eq!(stats.armed_timers, 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_zero_grace_removes_and_destroys() {
        let server = start(&config(0)).await;
        let (_, mut clients) = seated(&server).await;

        let host = clients.remove(0);
        host.disconnect().await;
        let players = roster(&mut clients[0]).await;
        assert_eq!(players.len(), 2);
        assert!(players.iter().find(|p| p.name == "p2").unwrap().is_host);

        for client in clients {
            client.disconnect().await;
        }
        // Closing is asynchronous; poll until the room is gone
        let mut rooms = 1;
        for _ in 0..50 {
            rooms = server.stats().await.unwrap().rooms;
            if rooms == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(rooms, 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_rejection_reported() {
        let server = start(&config(30)).await;
        let mut client = Client::connect(server.addr()).await.unwrap();

        client
            .send(ClientMessage::join_room("QQQQ", "ana"))
            .await
            .unwrap();
        let ServerEvent::ErrorMessage(text) = expect(&mut client, "error_message").await else {
            unreachable!();
        };
        assert_eq!(text, "Room QQQQ does not exist");
        server.shutdown();
    }

    #[tokio::test]
    async fn test_malformed_frame_skipped() {
        let server = start(&config(30)).await;
        let stream = TcpStream::connect(server.addr()).await.unwrap();
        let (mut reader, mut writer) = tokio::io::split(stream);

        write_frame(&mut writer, &serde_json::json!({"event": "dance"}))
            .await
            .unwrap();
        write_frame(&mut writer, &ClientMessage::Ping).await.unwrap();

        let reply: ServerEvent = tokio::time::timeout(WAIT, read_frame(&mut reader))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply, ServerEvent::Pong);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let limited = ServerConfig {
            max_connections: 1,
            ..config(30)
        };
        let server = start(&limited).await;

        let mut first = Client::connect(server.addr()).await.unwrap();
        first.send(ClientMessage::Ping).await.unwrap();
        expect(&mut first, "pong").await;

        let mut second = TcpStream::connect(server.addr()).await.unwrap();
        let result = tokio::time::timeout(WAIT, read_frame::<_, ServerEvent>(&mut second))
            .await
            .unwrap();
        assert!(result.is_err());
        server.shutdown();
    }

    #[tokio::test]
    async fn test_silent_peer_enters_grace() {
        let quiet = ServerConfig {
            idle_timeout_secs: 1,
            ..config(30)
        };
        let server = start(&quiet).await;

        // A raw socket takes a seat and then never speaks again
        let stream = TcpStream::connect(server.addr()).await.unwrap();
        let (mut reader, mut writer) = tokio::io::split(stream);
        write_frame(&mut writer, &ClientMessage::create_room("ghost", None))
            .await
            .unwrap();
        let created: ServerEvent = tokio::time::timeout(WAIT, read_frame(&mut reader))
            .await
            .unwrap()
            .unwrap();
        let ServerEvent::RoomCreated(entered) = created else {
            panic!("Expected RoomCreated, got {:?}", created);
        };

        let mut pending = 0;
        for _ in 0..100 {
            pending = server.stats().await.unwrap().pending_losses;
            if pending == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(pending, 1);
        assert_eq!(server.stats().await.unwrap().rooms, 1);

        let mut back = Client::connect(server.addr()).await.unwrap();
        back.send(ClientMessage::join_room(&entered.room_code, "ghost"))
            .await
            .unwrap();
        let ServerEvent::RoomJoined(rejoined) = expect(&mut back, "room_joined").await else {
            unreachable!();
        };
        assert_eq!(rejoined.players.len(), 1);
        assert!(rejoined.players[0].connected);
        assert!(rejoined.players[0].is_host);
        assert_eq!(server.stats().await.unwrap().pending_losses, 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_ping_keeps_connection_alive() {
        let quiet = ServerConfig {
            idle_timeout_secs: 1,
            ..config(30)
        };
        let server = start(&quiet).await;

        let stream = TcpStream::connect(server.addr()).await.unwrap();
        let (mut reader, mut writer) = tokio::io::split(stream);
        for _ in 0..8 {
            tokio::time::sleep(Duration::from_millis(250)).await;
            write_frame(&mut writer, &ClientMessage::Ping).await.unwrap();
            let reply: ServerEvent = tokio::time::timeout(WAIT, read_frame(&mut reader))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(reply, ServerEvent::Pong);
        }
        assert_eq!(server.stats().await.unwrap().connections, 1);
        server.shutdown();
    }
}
