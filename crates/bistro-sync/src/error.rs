//! # Sync Error Types
//!
//! Error types for the sync engine.
//!
//! ## Surfacing Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    What the caller ever sees                            │
//! │                                                                         │
//! │  become_host()        → IdentityTaken (another kitchen is live)        │
//! │  connect_as_client()  → nothing; unreachable hosts and timeouts are    │
//! │                         downgraded to local-fallback and logged        │
//! │  broadcast()          → store failures only; dead peers are pruned     │
//! │  import_snapshot()    → StoreError::ImportDecode via Store             │
//! │                                                                         │
//! │  ConnectTimeout / PeerUnreachable exist for internal routing and       │
//! │  logs; they are never returned across the public surface.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all engine failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Identity & Connection Errors
    // =========================================================================
    /// Another live device already holds the well-known kitchen identity.
    /// This is the exclusivity mechanism, not an internal fault.
    #[error("the kitchen is already open on another device")]
    IdentityTaken,

    /// Opening the channel to the kitchen did not finish in time.
    /// Internal: downgraded to local fallback, never surfaced.
    #[error("connection timeout after {0} seconds")]
    ConnectTimeout(u64),

    /// The kitchen endpoint refused or failed the connection.
    /// Internal: downgraded to local fallback, never surfaced.
    #[error("kitchen unreachable: {0}")]
    PeerUnreachable(String),

    /// Failed to bind or serve the host endpoint for a reason other than an
    /// identity collision.
    #[error("transport failed: {0}")]
    TransportError(String),

    /// WebSocket protocol error on an open channel.
    #[error("websocket error: {0}")]
    WebSocketError(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// A frame that is not a known sync event.
    #[error("invalid sync event: {0}")]
    InvalidMessage(String),

    /// Failed to serialize an outgoing event.
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid host URL derived from configuration.
    #[error("invalid host url: {0}")]
    InvalidUrl(String),

    /// Failed to load the config file.
    #[error("failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save the config file.
    #[error("failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Domain & Store Errors
    // =========================================================================
    /// A lifecycle or validation rule was violated.
    #[error(transparent)]
    Domain(#[from] bistro_core::CoreError),

    /// An operation referenced an order this device has never seen.
    #[error("unknown order: {0}")]
    UnknownOrder(String),

    /// The durable store failed.
    #[error(transparent)]
    Store(#[from] bistro_store::StoreError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// An internal channel was closed.
    #[error("channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<bistro_core::ValidationError> for SyncError {
    fn from(err: bistro_core::ValidationError) -> Self {
        SyncError::Domain(err.into())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                SyncError::PeerUnreachable("connection closed".into())
            }
            WsError::Io(io) => SyncError::PeerUnreachable(io.to_string()),
            other => SyncError::WebSocketError(other.to_string()),
        }
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if this failure is absorbed by local-fallback mode
    /// instead of being surfaced to the caller.
    pub fn is_fallback_downgrade(&self) -> bool {
        matches!(
            self,
            SyncError::ConnectTimeout(_) | SyncError::PeerUnreachable(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_downgrades() {
        assert!(SyncError::ConnectTimeout(3).is_fallback_downgrade());
        assert!(SyncError::PeerUnreachable("refused".into()).is_fallback_downgrade());

        assert!(!SyncError::IdentityTaken.is_fallback_downgrade());
        assert!(!SyncError::InvalidConfig("bad".into()).is_fallback_downgrade());
    }

    #[test]
    fn test_identity_taken_display() {
        let err = SyncError::IdentityTaken;
        assert!(err.to_string().contains("already open"));
    }

    #[test]
    fn test_validation_converts_through_domain() {
        let err: SyncError = bistro_core::ValidationError::EmptyCart.into();
        assert!(matches!(err, SyncError::Domain(_)));
    }
}
