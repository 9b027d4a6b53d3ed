//! # Event Hub Server
//!
//! WebSocket server that relays every [`LedgerEvent`] to connected
//! terminals. Terminals only listen; anything they send besides control
//! frames is ignored.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Event Hub Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      EventHub (Axum)                            │   │
//! │  │                                                                 │   │
//! │  │  /health ──▶ "OK"                                              │   │
//! │  │  /ws     ──▶ WebSocket upgrade                                 │   │
//! │  │                   │                                             │   │
//! │  │                   ▼                                             │   │
//! │  │          ┌──────────────────┐                                   │   │
//! │  │          │ per-connection:  │                                   │   │
//! │  │          │  subscribe()     │ ◀──── Broadcaster                 │   │
//! │  │          │  forward task    │                                   │   │
//! │  │          │  ping task       │                                   │   │
//! │  │          │  receive loop    │                                   │   │
//! │  │          └────────┬─────────┘                                   │   │
//! │  │         ┌─────────┼─────────┐                                   │   │
//! │  │         ▼         ▼         ▼                                   │   │
//! │  │    Terminal #1  Terminal #2  Terminal #3                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  A terminal that lags behind the channel capacity skips the oldest     │
//! │  events and keeps its connection.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::{interval, Duration, Instant};
use tracing::{debug, info, warn};

use crate::broadcaster::Broadcaster;
use crate::error::{RealtimeError, RealtimeResult};

// =============================================================================
// Constants
// =============================================================================

/// Default WebSocket port for the event hub.
pub const DEFAULT_HUB_PORT: u16 = 8766;

/// Ping interval to keep idle connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Inbound frames are control-only; anything large is a misbehaving client.
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

// =============================================================================
// Hub Configuration
// =============================================================================

/// Configuration for the event hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Port to listen on. `0` picks a free port.
    pub port: u16,
    /// Bind address (default: 0.0.0.0).
    pub bind_addr: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        HubConfig {
            port: DEFAULT_HUB_PORT,
            bind_addr: "0.0.0.0".to_string(),
        }
    }
}

impl HubConfig {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Hub State
// =============================================================================

/// A connected terminal.
#[derive(Debug, Clone)]
pub struct ConnectedClient {
    pub addr: SocketAddr,
    pub connected_at: Instant,
}

struct HubState {
    broadcaster: Broadcaster,
    clients: RwLock<HashMap<u64, ConnectedClient>>,
    next_client_id: AtomicU64,
}

impl HubState {
    async fn register(&self, addr: SocketAddr) -> u64 {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        self.clients.write().await.insert(
            id,
            ConnectedClient {
                addr,
                connected_at: Instant::now(),
            },
        );
        id
    }

    async fn remove(&self, id: u64) {
        if let Some(client) = self.clients.write().await.remove(&id) {
            info!(
                addr = %client.addr,
                connected_for = ?client.connected_at.elapsed(),
                "Terminal disconnected"
            );
        }
    }
}

// =============================================================================
// Event Hub
// =============================================================================

/// WebSocket server relaying ledger events.
pub struct EventHub {
    config: HubConfig,
    state: Arc<HubState>,
}

/// Handle for a running hub.
#[derive(Clone)]
pub struct HubHandle {
    local_addr: SocketAddr,
    state: Arc<HubState>,
    shutdown_tx: mpsc::Sender<()>,
}

impl HubHandle {
    /// Address the hub is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of connected terminals.
    pub async fn client_count(&self) -> usize {
        self.state.clients.read().await.len()
    }

    /// Addresses of connected terminals.
    pub async fn clients(&self) -> Vec<ConnectedClient> {
        self.state.clients.read().await.values().cloned().collect()
    }

    /// Stops accepting connections and shuts the server down.
    pub async fn shutdown(&self) -> RealtimeResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| RealtimeError::HubStopped)
    }
}

impl EventHub {
    /// Creates a hub that relays events from `broadcaster`.
    pub fn new(config: HubConfig, broadcaster: Broadcaster) -> Self {
        let state = Arc::new(HubState {
            broadcaster,
            clients: RwLock::new(HashMap::new()),
            next_client_id: AtomicU64::new(1),
        });
        EventHub { config, state }
    }

    /// Binds the listener and serves in a background task.
    pub async fn start(self) -> RealtimeResult<HubHandle> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let app = Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone());

        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| RealtimeError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| RealtimeError::Bind {
            addr: bind_addr.clone(),
            source,
        })?;

        info!(addr = %local_addr, "Event hub started");

        tokio::spawn(async move {
            let served = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                shutdown_rx.recv().await;
                info!("Event hub shutting down");
            })
            .await;

            if let Err(e) = served {
                warn!(error = %e, "Event hub stopped with error");
            }
        });

        Ok(HubHandle {
            local_addr,
            state: self.state,
            shutdown_tx,
        })
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn health_handler() -> impl IntoResponse {
    "OK"
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<HubState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    debug!(addr = %addr, "WebSocket upgrade requested");
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state, addr))
}

async fn handle_socket(socket: WebSocket, state: Arc<HubState>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before registering so a counted client never misses an event
    let mut events = state.broadcaster.subscribe();
    let client_id = state.register(addr).await;
    info!(addr = %addr, client_id, "Terminal connected");

    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(64);

    let outgoing_handle = tokio::spawn(async move {
        while let Some(msg) = outgoing_rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let forward_tx = outgoing_tx.clone();
    let forward_handle = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match event.to_frame() {
                    Ok(frame) => {
                        if forward_tx.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(event = %event.event, error = %e, "Failed to encode event"),
                },
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(client_id, missed, "Terminal lagged behind event stream");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let ping_tx = outgoing_tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ticker = interval(PING_INTERVAL);
        // first tick is immediate
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if ping_tx
                .send(Message::Ping(axum::body::Bytes::new()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    loop {
        match receiver.next().await {
            Some(Ok(Message::Ping(data))) => {
                let _ = outgoing_tx.send(Message::Pong(data)).await;
            }
            Some(Ok(Message::Close(_))) => {
                debug!(client_id, "Terminal requested close");
                break;
            }
            Some(Ok(_)) => {
                // terminals are listeners; pongs and stray frames are ignored
            }
            Some(Err(e)) => {
                warn!(client_id, error = %e, "WebSocket error");
                break;
            }
            None => break,
        }
    }

    ping_handle.abort();
    forward_handle.abort();
    outgoing_handle.abort();
    state.remove(client_id).await;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LedgerEvent;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

    fn local_config() -> HubConfig {
        HubConfig {
            port: 0,
            bind_addr: "127.0.0.1".to_string(),
        }
    }

    async fn wait_for_clients(handle: &HubHandle, expected: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.client_count().await != expected {
            assert!(Instant::now() < deadline, "timed out waiting for {expected} clients");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[test]
    fn test_hub_config_default() {
        let config = HubConfig::default();
        assert_eq!(config.port, DEFAULT_HUB_PORT);
        assert_eq!(config.bind_address(), "0.0.0.0:8766");
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let hub = EventHub::new(local_config(), Broadcaster::new(8));
        let handle = hub.start().await.unwrap();

        let mut stream = tokio::net::TcpStream::connect(handle.local_addr()).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("OK"));
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_terminal_receives_published_events() {
        let broadcaster = Broadcaster::new(8);
        let handle = EventHub::new(local_config(), broadcaster.clone())
            .start()
            .await
            .unwrap();

        let url = format!("ws://{}/ws", handle.local_addr());
        let (mut socket, _) = connect_async(url).await.unwrap();
        wait_for_clients(&handle, 1).await;

        broadcaster.publish(LedgerEvent::sale_cancelled("s-42"));

        let frame = loop {
            match socket.next().await.unwrap().unwrap() {
                WsMessage::Text(text) => break text.as_str().to_string(),
                _ => continue,
            }
        };
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["event"], "sale.cancelled");
        assert_eq!(value["data"]["id"], "s-42");
        assert_eq!(value["data"]["cancelled"], true);

        socket.send(WsMessage::Close(None)).await.unwrap();
        wait_for_clients(&handle, 0).await;
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let first = EventHub::new(local_config(), Broadcaster::new(1))
            .start()
            .await
            .unwrap();

        let taken = HubConfig {
            port: first.local_addr().port(),
            bind_addr: "127.0.0.1".to_string(),
        };
        let err = EventHub::new(taken, Broadcaster::new(1))
            .start()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RealtimeError::Bind { .. }));
        first.shutdown().await.unwrap();
    }
}
