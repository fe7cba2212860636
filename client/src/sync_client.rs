//! WebSocket connection to the sandbox server.
//!
//! [`SyncClient::handshake`] performs the handshake (welcome + protocol check)
//! and [`PendingClient::start`] then hands the socket to a background task
//! with the world-update callback already installed. Outgoing messages are
//! queued on a channel and never block the caller; incoming world events are
//! passed to the registered callback as soon as they are read.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use sandbox_shared::protocol::{
    ClientMsg, ConnectionId, GenerateWorldMsg, PlayerState, PlayerWire, ServerMsg, WorldStateMsg,
    PROTOCOL_VERSION,
};
use sandbox_shared::world::WorldObjectSpec;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const WELCOME_TIMEOUT: Duration = Duration::from_secs(5);

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Server-pushed world events, one variant per kind.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldUpdate {
    CurrentWorldState(WorldStateMsg),
    NewPlayer(PlayerWire),
    UpdatePlayer(PlayerWire),
    RemovePlayer { id: ConnectionId },
    NewWorldGenerated(WorldStateMsg),
}

impl WorldUpdate {
    /// `None` for handshake messages that carry no world data.
    pub fn from_server(msg: ServerMsg) -> Option<Self> {
        match msg {
            ServerMsg::Welcome(_) => None,
            ServerMsg::CurrentWorldState(w) => Some(WorldUpdate::CurrentWorldState(w)),
            ServerMsg::NewPlayer(p) => Some(WorldUpdate::NewPlayer(p)),
            ServerMsg::UpdatePlayer(p) => Some(WorldUpdate::UpdatePlayer(p)),
            ServerMsg::RemovePlayer { id } => Some(WorldUpdate::RemovePlayer { id }),
            ServerMsg::NewWorldGenerated(w) => Some(WorldUpdate::NewWorldGenerated(w)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported URL scheme {0:?}, expected ws or wss")]
    UnsupportedScheme(String),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("protocol mismatch: server speaks v{server}, client speaks v{client}")]
    ProtocolMismatch { server: u32, client: u32 },
    #[error("connection closed before the server sent a welcome")]
    ClosedBeforeWelcome,
    #[error("timed out waiting for the server welcome")]
    WelcomeTimeout,
    #[error("connection closed")]
    Closed,
}

type Callback = Box<dyn FnMut(WorldUpdate) + Send>;

pub struct SyncClient {
    self_id: ConnectionId,
    outgoing: mpsc::UnboundedSender<ClientMsg>,
    callback: Arc<Mutex<Option<Callback>>>,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown: Option<mpsc::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyncClient {
    /// Handshake and start the connection task. Events are dropped until
    /// [`SyncClient::on_world_update`] is called; use [`SyncClient::handshake`]
    /// and [`PendingClient::start`] to have the callback in place from the
    /// first event.
    pub async fn connect(url: &str) -> Result<Self, SyncError> {
        Ok(Self::handshake(url).await?.spawn(None))
    }

    /// Connect and wait for the server welcome without reading any further.
    /// Later frames stay queued on the socket until the client is started.
    pub async fn handshake(url: &str) -> Result<PendingClient, SyncError> {
        let url = url::Url::parse(url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(SyncError::UnsupportedScheme(url.scheme().to_string()));
        }

        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        tracing::info!("Connecting to {}", url);

        let (mut ws, _) = connect_async(url.as_str()).await?;
        let self_id = match tokio::time::timeout(WELCOME_TIMEOUT, await_welcome(&mut ws)).await {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => {
                let _ = ws.close(None).await;
                return Err(e);
            }
            Err(_) => {
                let _ = ws.close(None).await;
                return Err(SyncError::WelcomeTimeout);
            }
        };
        tracing::info!("Joined as {}", self_id);

        Ok(PendingClient {
            self_id,
            ws,
            state_tx,
            state_rx,
        })
    }

    /// The id the server assigned to this connection.
    pub fn self_id(&self) -> &ConnectionId {
        &self.self_id
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// A receiver that observes connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn init_player(&self, state: PlayerState) -> Result<(), SyncError> {
        self.send(ClientMsg::InitPlayer(state))
    }

    pub fn update_player(&self, state: PlayerState) -> Result<(), SyncError> {
        self.send(ClientMsg::UpdatePlayer(state))
    }

    pub fn generate_world(&self, random_objects: Vec<WorldObjectSpec>) -> Result<(), SyncError> {
        self.send(ClientMsg::GenerateWorld(GenerateWorldMsg { random_objects }))
    }

    /// Register the single world-update callback, replacing any previous one.
    /// It runs on the connection task, so it should return quickly. Events
    /// that arrive while no callback is registered are dropped.
    pub fn on_world_update<F>(&self, callback: F)
    where
        F: FnMut(WorldUpdate) + Send + 'static,
    {
        if let Ok(mut slot) = self.callback.lock() {
            *slot = Some(Box::new(callback));
        }
    }

    fn send(&self, msg: ClientMsg) -> Result<(), SyncError> {
        self.outgoing.send(msg).map_err(|_| SyncError::Closed)
    }

    /// Close the socket and wait for the connection task to finish.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(()).await;
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// A connection that has completed the handshake but is not yet reading
/// world events.
pub struct PendingClient {
    self_id: ConnectionId,
    ws: Ws,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl PendingClient {
    pub fn self_id(&self) -> &ConnectionId {
        &self.self_id
    }

    /// Start the connection task with `callback` already registered, so no
    /// world event can slip past it.
    pub fn start<F>(self, callback: F) -> SyncClient
    where
        F: FnMut(WorldUpdate) + Send + 'static,
    {
        self.spawn(Some(Box::new(callback)))
    }

    fn spawn(self, callback: Option<Callback>) -> SyncClient {
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = mpsc::channel(1);
        let callback = Arc::new(Mutex::new(callback));

        let _ = self.state_tx.send(ConnectionState::Connected);
        let task = tokio::spawn(run_connection(
            self.ws,
            outgoing_rx,
            shutdown_rx,
            Arc::clone(&callback),
            self.state_tx,
        ));

        SyncClient {
            self_id: self.self_id,
            outgoing,
            callback,
            state_rx: self.state_rx,
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn await_welcome(ws: &mut Ws) -> Result<ConnectionId, SyncError> {
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) => match serde_json::from_str::<ServerMsg>(text.as_str()) {
                Ok(ServerMsg::Welcome(welcome)) => {
                    if welcome.protocol_version != PROTOCOL_VERSION {
                        return Err(SyncError::ProtocolMismatch {
                            server: welcome.protocol_version,
                            client: PROTOCOL_VERSION,
                        });
                    }
                    return Ok(welcome.self_id);
                }
                Ok(other) => tracing::debug!("Ignoring {:?} before welcome", other),
                Err(e) => tracing::warn!("Unparseable frame before welcome: {}", e),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(SyncError::ClosedBeforeWelcome)
}

async fn run_connection(
    ws: Ws,
    mut outgoing_rx: mpsc::UnboundedReceiver<ClientMsg>,
    mut shutdown_rx: mpsc::Receiver<()>,
    callback: Arc<Mutex<Option<Callback>>>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            // Client -> Server
            Some(msg) = outgoing_rx.recv() => {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!("Failed to serialize {:?}: {}", msg, e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(json.into())).await {
                    tracing::warn!("Send failed: {}", e);
                    break;
                }
            }

            // Server -> Client
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerMsg>(text.as_str()) {
                            Ok(server_msg) => {
                                if let Some(update) = WorldUpdate::from_server(server_msg) {
                                    deliver(&callback, update);
                                }
                            }
                            Err(e) => tracing::warn!("Unparseable frame from server: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("Server closed the connection");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!("Connection error: {}", e);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }

            _ = shutdown_rx.recv() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    // Close the queue first so sends fail once the state reads Disconnected
    drop(outgoing_rx);
    let _ = state_tx.send(ConnectionState::Disconnected);
}

fn deliver(callback: &Mutex<Option<Callback>>, update: WorldUpdate) {
    match callback.lock() {
        Ok(mut slot) => match slot.as_mut() {
            Some(cb) => cb(update),
            None => tracing::debug!("No world-update callback; dropped {:?}", update),
        },
        Err(_) => tracing::error!("World-update callback panicked earlier; dropping update"),
    }
}
