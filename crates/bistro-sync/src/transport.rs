//! # Client Transport
//!
//! The customer/tracker side of a peer channel: a WebSocket connection to the
//! well-known kitchen endpoint.
//!
//! ## Connection Outcome
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 connect() races a fixed timeout                         │
//! │                                                                         │
//! │  dial ws://kitchen:port/sync                                           │
//! │       │                                                                 │
//! │       ├── open before deadline ──► duplex channel (spawn_channel)      │
//! │       ├── refused / error       ──► PeerUnreachable                    │
//! │       └── deadline fires        ──► ConnectTimeout                     │
//! │                                                                         │
//! │  The session downgrades the two failure arms to local-fallback mode;   │
//! │  neither is an error to the caller of connect_as_client().             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::protocol::SyncEvent;

/// Type alias for the client-side socket.
pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// Connect
// =============================================================================

/// Attempts to open the channel to the kitchen within `connect_timeout`.
pub(crate) async fn connect(url: &str, connect_timeout: Duration) -> SyncResult<WsStream> {
    debug!(url = %url, "Dialing kitchen");

    match timeout(connect_timeout, connect_async(url)).await {
        Ok(Ok((ws_stream, response))) => {
            debug!(status = ?response.status(), "WebSocket handshake complete");
            Ok(ws_stream)
        }
        Ok(Err(e)) => Err(SyncError::from(e)),
        Err(_) => Err(SyncError::ConnectTimeout(connect_timeout.as_secs())),
    }
}

// =============================================================================
// Channel Handle
// =============================================================================

/// Handle to an open outbound channel.
#[derive(Clone)]
pub(crate) struct ChannelHandle {
    /// Sender for outgoing events.
    outgoing_tx: mpsc::Sender<SyncEvent>,

    /// Shutdown signal.
    shutdown_tx: mpsc::Sender<()>,
}

impl ChannelHandle {
    /// Sends an event to the kitchen.
    pub(crate) async fn send(&self, event: SyncEvent) -> SyncResult<()> {
        self.outgoing_tx
            .send(event)
            .await
            .map_err(|_| SyncError::ChannelError("outbound channel closed".into()))
    }

    /// Closes the channel gracefully.
    pub(crate) async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

// =============================================================================
// Channel Pump
// =============================================================================

/// Spawns the duplex pump for an open socket.
///
/// Returns a handle for sending plus the receiver of inbound events. When the
/// connection ends — close frame, error, or shutdown — the receiver closes,
/// which is how the session notices the channel is gone.
pub(crate) fn spawn_channel(stream: WsStream) -> (ChannelHandle, mpsc::Receiver<SyncEvent>) {
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<SyncEvent>(64);
    let (incoming_tx, incoming_rx) = mpsc::channel::<SyncEvent>(64);
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                // Outgoing events from broadcast()
                maybe = outgoing_rx.recv() => {
                    let Some(event) = maybe else { break };
                    let json = match event.to_json() {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(?e, "Failed to serialize outgoing event");
                            continue;
                        }
                    };
                    debug!(event = %event.type_name(), "Sending event");
                    if write.send(WsMessage::Text(json.into())).await.is_err() {
                        break;
                    }
                }

                // Incoming frames from the kitchen
                maybe = read.next() => {
                    match maybe {
                        Some(Ok(WsMessage::Text(text))) => {
                            match SyncEvent::from_json(&text) {
                                Ok(event) => {
                                    debug!(event = %event.type_name(), "Received event");
                                    if incoming_tx.send(event).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => {
                                    warn!(?e, "Rejected unknown or malformed event");
                                }
                            }
                        }
                        Some(Ok(WsMessage::Ping(data))) => {
                            if write.send(WsMessage::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(WsMessage::Pong(_))) => {}
                        Some(Ok(WsMessage::Close(frame))) => {
                            info!(?frame, "Kitchen closed the channel");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Binary / raw frames are not part of this protocol.
                            warn!("Ignoring non-text frame");
                        }
                        Some(Err(e)) => {
                            warn!(?e, "Channel error");
                            break;
                        }
                        None => {
                            info!("Channel ended");
                            break;
                        }
                    }
                }

                // Deliberate local close
                _ = shutdown_rx.recv() => {
                    let _ = write.send(WsMessage::Close(None)).await;
                    break;
                }
            }
        }
        // incoming_tx drops here; the session's router sees the channel close.
    });

    (
        ChannelHandle {
            outgoing_tx,
            shutdown_tx,
        },
        incoming_rx,
    )
}
