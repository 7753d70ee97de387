//! # Kitchen Host Server
//!
//! The WebSocket server a device runs while it holds the well-known kitchen
//! identity. Claiming the identity *is* binding the well-known port: if
//! another live device already serves it, the bind collides and
//! `become_host()` reports `IdentityTaken`.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Kitchen Host Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      HostServer (Axum)                          │   │
//! │  │                                                                 │   │
//! │  │  /sync endpoint ──▶ WebSocket upgrade                          │   │
//! │  │                        │                                        │   │
//! │  │                        ▼                                        │   │
//! │  │   1. register peer in the live-channel map                     │   │
//! │  │   2. join-time catch-up: MenuReplaced + OrdersSnapshot         │   │
//! │  │      to THIS peer only                                         │   │
//! │  │   3. notify sink (peer joined)                                 │   │
//! │  │   4. pump frames both ways until close                         │   │
//! │  │                                                                 │   │
//! │  │  broadcast(): fan out to every live channel, best-effort;      │   │
//! │  │  a channel found closed is dropped from the set, not retried.  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
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
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use bistro_store::Database;

use crate::config::{SyncConfig, SYNC_PATH};
use crate::error::{SyncError, SyncResult};
use crate::protocol::SyncEvent;
use crate::session::{apply_inbound, EventSink};

// =============================================================================
// Constants
// =============================================================================

/// Ping interval to keep peer connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum frame size (1MB) — a full menu or order snapshot is tiny, anything
/// bigger is garbage.
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Per-peer outgoing queue depth.
const OUTGOING_QUEUE: usize = 64;

// =============================================================================
// Host State
// =============================================================================

/// Map of live inbound channels, keyed by peer address.
type PeerMap = Arc<RwLock<HashMap<String, mpsc::Sender<Message>>>>;

/// Shared state for the host server.
struct HostState {
    /// The store this host treats as authoritative.
    store: Database,

    /// Event sink for UI notification.
    sink: Arc<dyn EventSink>,

    /// Live inbound channels.
    peers: PeerMap,

    /// Flipped to true when the host is being torn down.
    closing: watch::Receiver<bool>,
}

// =============================================================================
// Host Handle
// =============================================================================

/// Handle to a running host server, owned by the session.
pub(crate) struct HostHandle {
    peers: PeerMap,
    closing_tx: watch::Sender<bool>,
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl HostHandle {
    /// Fans an event out to every live inbound channel (best-effort). A
    /// channel found closed is dropped from the live set, not retried — one
    /// dead peer never blocks delivery to the others.
    pub(crate) async fn broadcast(&self, event: &SyncEvent) {
        let json = match event.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!(?e, "Failed to serialize broadcast event");
                return;
            }
        };

        let targets: Vec<(String, mpsc::Sender<Message>)> = {
            let peers = self.peers.read().await;
            peers.iter().map(|(id, tx)| (id.clone(), tx.clone())).collect()
        };

        let mut dead = Vec::new();
        for (peer, tx) in targets {
            if tx.send(Message::Text(json.clone().into())).await.is_err() {
                dead.push(peer);
            }
        }

        if !dead.is_empty() {
            let mut peers = self.peers.write().await;
            for peer in dead {
                peers.remove(&peer);
                debug!(peer = %peer, "Dropped closed peer channel");
            }
        }
    }

    /// Number of live inbound channels.
    pub(crate) async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Tears down every inbound channel and releases the identity. Waits for
    /// the server task so the port is free when this returns.
    pub(crate) async fn shutdown(self) {
        info!("Stopping kitchen host");

        let _ = self.closing_tx.send(true);
        let _ = self.shutdown_tx.send(()).await;
        self.peers.write().await.clear();
        let _ = self.join.await;

        info!("Kitchen host stopped");
    }
}

// =============================================================================
// Host Server
// =============================================================================

/// The WebSocket server claimed by `become_host()`.
pub(crate) struct HostServer;

impl HostServer {
    /// Binds the well-known port and starts serving inbound channels.
    ///
    /// A bind collision (the identity is live elsewhere) is surfaced as
    /// `IdentityTaken`; any other bind failure is a transport error.
    pub(crate) async fn start(
        config: &SyncConfig,
        store: Database,
        sink: Arc<dyn EventSink>,
    ) -> SyncResult<HostHandle> {
        let bind_addr = config.bind_address();

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                SyncError::IdentityTaken
            } else {
                SyncError::TransportError(format!("failed to bind {}: {}", bind_addr, e))
            }
        })?;

        let (closing_tx, closing_rx) = watch::channel(false);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let peers: PeerMap = Arc::new(RwLock::new(HashMap::new()));
        let state = Arc::new(HostState {
            store,
            sink,
            peers: peers.clone(),
            closing: closing_rx,
        });

        let app = Router::new()
            .route(SYNC_PATH, get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(state);

        info!(addr = %bind_addr, "Kitchen host started");

        let join = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                shutdown_rx.recv().await;
                info!("Kitchen host shutting down");
            })
            .await
            .ok();
        });

        Ok(HostHandle {
            peers,
            closing_tx,
            shutdown_tx,
            join,
        })
    }
}

// =============================================================================
// WebSocket Handler
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    "OK"
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<HostState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    info!(addr = %addr, "New peer connection");
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state, addr))
}

/// Handles one inbound peer channel for its whole life.
async fn handle_socket(socket: WebSocket, state: Arc<HostState>, addr: SocketAddr) {
    let peer = addr.to_string();
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Register the channel in the live set before anything can be broadcast.
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(OUTGOING_QUEUE);
    state.peers.write().await.insert(peer.clone(), outgoing_tx.clone());

    // Join-time catch-up: full menu + all non-terminal orders, to this peer
    // only, so a late joiner doesn't wait for the next organic change.
    if let Err(e) = send_catch_up(&state, &outgoing_tx).await {
        warn!(peer = %peer, ?e, "Failed to send catch-up snapshots");
    }

    state.sink.on_peer_joined(&peer);

    // Send pump: outgoing queue + keepalive pings + teardown close.
    let mut closing = state.closing.clone();
    let send_task = tokio::spawn(async move {
        let mut ping = interval(PING_INTERVAL);
        ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it.
        ping.tick().await;

        loop {
            tokio::select! {
                maybe = outgoing_rx.recv() => {
                    match maybe {
                        Some(msg) => {
                            if ws_tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping.tick() => {
                    if ws_tx.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                        break;
                    }
                }
                _ = closing.changed() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Receive loop.
    let mut closing = state.closing.clone();
    loop {
        tokio::select! {
            maybe = ws_rx.next() => {
                match maybe {
                    Some(Ok(Message::Text(text))) => {
                        match SyncEvent::from_json(&text) {
                            Ok(event) => {
                                apply_inbound(&state.store, state.sink.as_ref(), event).await;
                            }
                            Err(e) => {
                                warn!(peer = %peer, ?e, "Rejected unknown or malformed event");
                            }
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        match serde_json::from_slice::<SyncEvent>(&data) {
                            Ok(event) => {
                                apply_inbound(&state.store, state.sink.as_ref(), event).await;
                            }
                            Err(e) => {
                                warn!(peer = %peer, ?e, "Rejected unknown or malformed binary event");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = outgoing_tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        // Connection is alive.
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!(peer = %peer, "Peer requested close");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(peer = %peer, ?e, "Peer channel error");
                        break;
                    }
                    None => {
                        info!(peer = %peer, "Peer disconnected");
                        break;
                    }
                }
            }
            _ = closing.changed() => break,
        }
    }

    // Cleanup.
    send_task.abort();
    state.peers.write().await.remove(&peer);
    info!(peer = %peer, "Peer channel closed");
}

/// Sends the join-time catch-up snapshots to one peer.
async fn send_catch_up(
    state: &HostState,
    outgoing_tx: &mpsc::Sender<Message>,
) -> SyncResult<()> {
    let menu = state.store.menu().all().await?;
    let active = state.store.orders().active().await?;

    debug!(
        menu_items = menu.len(),
        active_orders = active.len(),
        "Sending catch-up snapshots"
    );

    for event in [SyncEvent::MenuReplaced(menu), SyncEvent::OrdersSnapshot(active)] {
        let json = event.to_json()?;
        outgoing_tx
            .send(Message::Text(json.into()))
            .await
            .map_err(|_| SyncError::ChannelError("peer outgoing queue closed".into()))?;
    }

    Ok(())
}
