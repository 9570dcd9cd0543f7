//! WebSocket Ledger Server
//!
//! Async WebSocket front end for the ledger host. Handles authentication,
//! routes operations and queries, pushes registry events to every
//! authenticated session and runs the keeper on an interval.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::core::address::Address;
use crate::core::context::Timestamp;
use crate::game::events::GameEvent;
use crate::host::{LedgerHost, Operation};
use crate::network::auth::{authenticate, AuthConfig, AuthError};
use crate::network::protocol::{
    AuthRequest, AuthResult, BalanceInfo, ClientMessage, ErrorCode, LedgerStatus, ServerError,
    ServerMessage,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Idle connections are dropped after this long.
    pub connection_timeout: Duration,
    /// How often the keeper loop wakes.
    pub keeper_interval: Duration,
    /// JWT settings.
    pub auth: AuthConfig,
    /// Without JWT, accept a bare address as the auth token. Local
    /// development only: anyone can act as any non-reserved account.
    pub insecure_dev_auth: bool,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            connection_timeout: Duration::from_secs(300),
            keeper_interval: Duration::from_secs(60),
            auth: AuthConfig::default(),
            insecure_dev_auth: false,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection limit reached.
    #[error("Connection limit reached")]
    ConnectionLimitReached,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

type Clients = Arc<RwLock<BTreeMap<Uuid, ConnectedClient>>>;
type SharedHost = Arc<Mutex<LedgerHost>>;

/// Connected client state.
struct ConnectedClient {
    /// Remote address.
    peer: SocketAddr,
    /// Ledger account (after auth).
    address: Option<Address>,
    /// Last activity.
    last_activity: Instant,
    /// Outbound queue.
    sender: mpsc::Sender<ServerMessage>,
}

/// The ledger server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// The ledger.
    host: SharedHost,
    /// Connected clients.
    clients: Clients,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a server over `host`.
    pub fn new(config: ServerConfig, host: LedgerHost) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        if config.auth.is_configured() {
            if config.insecure_dev_auth {
                warn!("Bare-address auth ignored: JWT auth is configured");
            }
        } else if config.insecure_dev_auth {
            warn!("INSECURE dev auth enabled: clients authenticate with a bare address");
        } else {
            warn!("JWT auth not configured: every auth attempt will be refused");
        }

        Self {
            config,
            host: Arc::new(Mutex::new(host)),
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Shared handle on the ledger.
    pub fn host(&self) -> SharedHost {
        self.host.clone()
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Ledger server listening on {}", self.config.bind_addr);

        let keeper_host = self.host.clone();
        let keeper_clients = self.clients.clone();
        let keeper_every = self.config.keeper_interval;
        let keeper_handle = tokio::spawn(async move {
            Self::run_keeper_loop(keeper_host, keeper_clients, keeper_every).await;
        });

        let cleanup_clients = self.clients.clone();
        let idle_timeout = self.config.connection_timeout;
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_clients, idle_timeout).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("{}, rejecting {}", GameServerError::ConnectionLimitReached, addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        keeper_handle.abort();
        cleanup_handle.abort();

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let host = self.host.clone();
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);
            let client_id = Uuid::new_v4();

            clients.write().await.insert(
                client_id,
                ConnectedClient {
                    peer: addr,
                    address: None,
                    last_activity: Instant::now(),
                    sender: msg_tx.clone(),
                },
            );

            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        let parsed = match msg {
                            Some(Ok(Message::Text(text))) => ClientMessage::from_json(&text),
                            Some(Ok(Message::Binary(data))) => ClientMessage::from_slice(&data),
                            Some(Ok(Message::Ping(_))) => {
                                let _ = msg_tx.send(ServerMessage::Pong { timestamp: 0, server_time: now_millis() }).await;
                                continue;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => continue,
                        };

                        let client_msg = match parsed {
                            Ok(m) => m,
                            Err(e) => {
                                debug!("Invalid message from {}: {}", addr, e);
                                let _ = msg_tx
                                    .send(ServerMessage::Error(ServerError::new(
                                        ErrorCode::InvalidInput,
                                        format!("Invalid message format: {}", e),
                                    )))
                                    .await;
                                continue;
                            }
                        };

                        if let Some(client) = clients.write().await.get_mut(&client_id) {
                            client.last_activity = Instant::now();
                        }

                        Self::handle_client_message(client_id, client_msg, &clients, &host, &config, &msg_tx).await;
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            sender_task.abort();
            clients.write().await.remove(&client_id);
            info!("Client {} ({}) cleaned up", client_id, addr);
        });
    }

    /// Handle a client message.
    async fn handle_client_message(
        client_id: Uuid,
        msg: ClientMessage,
        clients: &Clients,
        host: &SharedHost,
        config: &ServerConfig,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        let reply = match msg {
            ClientMessage::Auth(auth) => Self::handle_auth(client_id, auth, clients, host, config).await,
            ClientMessage::Ping { timestamp } => ServerMessage::Pong { timestamp, server_time: now_millis() },
            ClientMessage::Execute { request_id, operation } => {
                match session_address(client_id, clients).await {
                    Some(caller) => Self::handle_execute(caller, request_id, operation, clients, host).await,
                    None => not_authenticated(),
                }
            }
            ClientMessage::GetBalances { account } => {
                match account.or(session_address(client_id, clients).await) {
                    Some(account) => {
                        let host = host.lock().await;
                        ServerMessage::Balances(BalanceInfo {
                            account,
                            wallet: host.wallet_deposits(&account),
                            vault: host.vault_deposits(&account),
                            token: host.token_balance(&account),
                            native: host.native_balance(&account),
                        })
                    }
                    None => not_authenticated(),
                }
            }
            ClientMessage::GetGame { game_id } => {
                let host = host.lock().await;
                ServerMessage::Game {
                    game_id,
                    status: host.registry().status(game_id),
                    game: host.game(game_id).cloned(),
                }
            }
            ClientMessage::GetCounter => ServerMessage::Counter { counter: host.lock().await.registry().counter() },
            ClientMessage::GetOpenGames => ServerMessage::OpenGames { game_ids: host.lock().await.registry().open_games() },
            ClientMessage::GetLedgerStatus => {
                let mut host = host.lock().await;
                host.sync_time(ledger_now());
                ServerMessage::LedgerStatus(LedgerStatus {
                    timestamp: host.now(),
                    block_height: host.block_height(),
                    counter: host.registry().counter(),
                    upkeep_due: host.upkeep_due(),
                })
            }
        };

        let _ = sender.send(reply).await;
    }

    /// Handle authentication.
    ///
    /// Sessions never act as a deployed component. In bare-address mode
    /// they cannot act as the deployer either.
    async fn handle_auth(
        client_id: Uuid,
        auth: AuthRequest,
        clients: &Clients,
        host: &SharedHost,
        config: &ServerConfig,
    ) -> ServerMessage {
        let result = Self::resolve_session(&auth.token, host, config).await;

        match result {
            Ok(address) => {
                if let Some(client) = clients.write().await.get_mut(&client_id) {
                    client.address = Some(address);
                }
                debug!("Client {} authenticated as {}", client_id, address);
                ServerMessage::AuthResult(AuthResult {
                    success: true,
                    address: Some(address),
                    error: None,
                    server_version: config.version.clone(),
                })
            }
            Err(e) => {
                debug!(code = e.code(), "Client {} failed auth: {}", client_id, e);
                ServerMessage::AuthResult(AuthResult {
                    success: false,
                    address: None,
                    error: Some(e.to_string()),
                    server_version: config.version.clone(),
                })
            }
        }
    }

    async fn resolve_session(token: &str, host: &SharedHost, config: &ServerConfig) -> Result<Address, AuthError> {
        let address = if config.auth.is_configured() {
            authenticate(token, &config.auth)?
        } else if config.insecure_dev_auth {
            token.parse::<Address>().map_err(|_| AuthError::InvalidSubject(token.to_string()))?
        } else {
            return Err(AuthError::NotConfigured);
        };

        let host = host.lock().await;
        let bare = !config.auth.is_configured();
        if host.addresses().contains(&address) || (bare && address == host.deployer()) {
            return Err(AuthError::ReservedAccount(address));
        }
        Ok(address)
    }

    /// Apply an operation and fan out the events it produced.
    async fn handle_execute(
        caller: Address,
        request_id: Option<u64>,
        operation: Operation,
        clients: &Clients,
        host: &SharedHost,
    ) -> ServerMessage {
        let (result, block_height, events) = {
            let mut host = host.lock().await;
            host.sync_time(ledger_now());
            let before = host.registry().events().len();
            let result = host.execute(caller, operation);
            let events = host.registry().events().get(before..).map(<[GameEvent]>::to_vec).unwrap_or_default();
            (result, host.block_height(), events)
        };

        broadcast_events(clients, events).await;

        match result {
            Ok(receipt) => ServerMessage::Receipt { request_id, block_height, receipt },
            Err(e) => ServerMessage::Error(ServerError::rejected(request_id, e.code(), e.to_string())),
        }
    }

    /// Sync ledger time and run upkeep whenever it is due.
    async fn run_keeper_loop(host: SharedHost, clients: Clients, every: Duration) {
        let mut interval = interval(every);

        loop {
            interval.tick().await;

            let events = {
                let mut host = host.lock().await;
                host.sync_time(ledger_now());
                if !host.upkeep_due() {
                    continue;
                }
                let keeper = host.keeper().address();
                let before = host.registry().events().len();
                match host.execute(keeper, Operation::PerformUpkeep) {
                    Ok(receipt) => debug!("Keeper upkeep: {:?}", receipt),
                    Err(e) => warn!(code = e.code(), "Keeper upkeep failed: {}", e),
                }
                host.registry().events().get(before..).map(<[GameEvent]>::to_vec).unwrap_or_default()
            };

            broadcast_events(&clients, events).await;
        }
    }

    /// Drop clients idle longer than `idle_timeout`.
    async fn run_cleanup_loop(clients: Clients, idle_timeout: Duration) {
        let mut interval = interval(Duration::from_secs(60));

        loop {
            interval.tick().await;
            let now = Instant::now();

            let mut clients = clients.write().await;
            clients.retain(|id, c| {
                let keep = now.duration_since(c.last_activity) <= idle_timeout;
                if !keep {
                    info!("Removed idle client {} ({})", id, c.peer);
                }
                keep
            });
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Get authenticated session count.
    pub async fn session_count(&self) -> usize {
        self.clients.read().await.values().filter(|c| c.address.is_some()).count()
    }
}

async fn session_address(client_id: Uuid, clients: &Clients) -> Option<Address> {
    clients.read().await.get(&client_id).and_then(|c| c.address)
}

async fn broadcast_events(clients: &Clients, events: Vec<GameEvent>) {
    if events.is_empty() {
        return;
    }
    let clients = clients.read().await;
    for client in clients.values().filter(|c| c.address.is_some()) {
        if client.sender.try_send(ServerMessage::Events { events: events.clone() }).is_err() {
            debug!("Dropped events for slow client {}", client.peer);
        }
    }
}

fn not_authenticated() -> ServerMessage {
    ServerMessage::Error(ServerError::new(ErrorCode::NotAuthenticated, "Authenticate first"))
}

fn ledger_now() -> Timestamp {
    chrono::Utc::now().timestamp().max(0) as Timestamp
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
