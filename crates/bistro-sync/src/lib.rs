//! # bistro-sync: Peer Sync Engine for Family Bistro
//!
//! This crate lets one device act as the order-taking "kitchen" and any
//! number of other devices act as customer or tracker clients, keeping a
//! shared menu/order state in sync over an ad-hoc peer connection with no
//! always-on server.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Session Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   SyncSession (per device)                       │  │
//! │  │                                                                  │  │
//! │  │  Owns: Role, local-fallback flag, live channels, event sink      │  │
//! │  │  Operations: become_host / connect_as_client / stop_hosting /    │  │
//! │  │              disconnect / broadcast                              │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │  HostServer    │  │ Client         │  │  ReconnectTask         │    │
//! │  │                │  │ transport      │  │                        │    │
//! │  │ Axum WebSocket │  │ tungstenite +  │  │ Fixed-interval retry   │    │
//! │  │ on well-known  │  │ connect        │  │ with a cancellation    │    │
//! │  │ port, catch-up │  │ timeout        │  │ handle                 │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  DEGRADATION LADDER                                                    │
//! │  ──────────────────                                                    │
//! │  hosting ──► loopback for the host's own views                         │
//! │  connected ──► replication through the kitchen                         │
//! │  no kitchen reachable ──► local fallback: own store is authoritative   │
//! │  Nothing in this crate crashes the process; every failure narrows     │
//! │  the mode, it never halts it.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`session`] - The `SyncSession` object: roles, broadcast, domain ops
//! - [`protocol`] - The closed set of replicated events
//! - `host` - WebSocket server run while holding the kitchen identity
//! - `transport` - Client-side connect + channel pump
//! - [`retry`] - Fixed-interval reconnect task with cancellation handle
//! - [`alerts`] - Once-per-order "food is ready" projection
//! - [`config`] - TOML + env configuration
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bistro_sync::{SyncConfig, SyncSession, NoopSink};
//! use bistro_store::{Database, DbConfig};
//! use std::sync::Arc;
//!
//! let store = Database::new(DbConfig::new("bistro.db")).await?;
//! let session = SyncSession::new(SyncConfig::load_or_default(None), store, Arc::new(NoopSink))?;
//!
//! // Kitchen device:
//! session.become_host().await?;
//!
//! // Customer device (never fails; degrades to local fallback):
//! let outcome = session.connect_as_client().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod config;
pub mod error;
mod host;
pub mod protocol;
pub mod retry;
pub mod session;
mod transport;

// =============================================================================
// Re-exports
// =============================================================================

pub use alerts::ReadyAlerts;
pub use config::{ClientSettings, DeviceConfig, HostSettings, SyncConfig, DEFAULT_HOST_PORT};
pub use error::{SyncError, SyncResult};
pub use protocol::{StatusChange, SyncEvent};
pub use retry::{spawn_reconnect, ReconnectHandle};
pub use session::{ConnectOutcome, EventSink, NoopSink, Role, SyncSession};
