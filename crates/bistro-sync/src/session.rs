//! # Sync Session
//!
//! The explicitly constructed session object that owns a device's role, its
//! live channels, and the event sink. One `SyncSession` per device process;
//! clone the handle freely, state is shared.
//!
//! ## Roles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Role Transitions                               │
//! │                                                                         │
//! │                 become_host() ok                                        │
//! │   Unhosted ───────────────────────────► Hosting ──┐                     │
//! │      ▲                                            │ stop_hosting()      │
//! │      └────────────────────────────────────────────┘                     │
//! │                                                                         │
//! │                 connect_as_client(): channel open                       │
//! │   Unhosted ───────────────────────────► Connected ──┐                   │
//! │      ▲   │                                          │ channel lost      │
//! │      │   │ connect_as_client(): no host / timeout   ▼                   │
//! │      │   └────────────────────────────► Disconnected (local fallback)   │
//! │      │                                              │                    │
//! │      └──────────── disconnect() ◄───────────────────┘                   │
//! │                                                                         │
//! │  A hosting device answering connect_as_client() stays Hosting: that is │
//! │  loopback mode, no channel is opened.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Broadcast Rule
//! `broadcast(event)` is the single replication primitive. Unconditionally,
//! in order:
//! 1. Hosting   → fan out to every live inbound channel (best-effort)
//! 2. Connected → send on the outbound channel
//! 3. Hosting OR local-fallback → apply to the durable store and invoke the
//!    event sink synchronously ("I am my own backend")
//!
//! Step 3 fires *in addition to* 1/2 — a hosting device both fans out to real
//! peers and updates itself locally without waiting for a network echo.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

use bistro_core::validation::{validate_menu, validate_submission};
use bistro_core::{CartItem, CoreError, MenuItem, Order, OrderStatus};
use bistro_store::{Database, StoreError};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::host::{HostHandle, HostServer};
use crate::protocol::SyncEvent;
use crate::transport::{self, ChannelHandle};

// =============================================================================
// Role
// =============================================================================

/// Process-wide connectivity role of this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Neither hosting nor connected.
    Unhosted,
    /// Holding the well-known kitchen identity, accepting inbound channels.
    Hosting,
    /// Connected to the kitchen as a client.
    Connected,
    /// Tried and failed to reach a kitchen; operating in local fallback.
    Disconnected,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Unhosted => write!(f, "unhosted"),
            Role::Hosting => write!(f, "hosting"),
            Role::Connected => write!(f, "connected"),
            Role::Disconnected => write!(f, "disconnected"),
        }
    }
}

// =============================================================================
// Connect Outcome
// =============================================================================

/// How `connect_as_client()` resolved. It always resolves: the absence of a
/// kitchen is a steady state, not an exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Channel to the kitchen is open.
    Connected,
    /// This device is the kitchen; no channel needed.
    Loopback,
    /// No kitchen reachable; this device's store is now authoritative.
    LocalFallback,
}

// =============================================================================
// Event Sink
// =============================================================================

/// Callback surface the UI layers register on the session.
///
/// `on_event` is invoked for every replicated event this device observes —
/// inbound from a channel, or its own in loopback/fallback — and each UI
/// decides relevance itself (the tracker cares about order status, the menu
/// view about `MenuReplaced`, and so on).
pub trait EventSink: Send + Sync {
    /// A replicated event reached this device.
    fn on_event(&self, event: &SyncEvent);

    /// A peer channel was accepted (host only).
    fn on_peer_joined(&self, _peer: &str) {}
}

/// No-op sink for tests and headless use.
pub struct NoopSink;

impl EventSink for NoopSink {
    fn on_event(&self, _event: &SyncEvent) {}
}

// =============================================================================
// Session
// =============================================================================

/// Mutable session state behind one lock: the role and the fallback flag
/// always change together.
struct SessionState {
    role: Role,
    local_fallback: bool,
}

struct SessionInner {
    config: SyncConfig,
    store: Database,
    sink: Arc<dyn EventSink>,
    state: RwLock<SessionState>,
    host: Mutex<Option<HostHandle>>,
    client: Mutex<Option<ChannelHandle>>,
    /// Bumped per client connection so a router from a replaced channel
    /// cannot downgrade the state of a newer one.
    connection_gen: AtomicU64,
}

/// A device's sync session. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct SyncSession {
    inner: Arc<SessionInner>,
}

impl SyncSession {
    /// Creates a session for this device. Validates the configuration; no
    /// network activity happens until `become_host` or `connect_as_client`.
    pub fn new(
        config: SyncConfig,
        store: Database,
        sink: Arc<dyn EventSink>,
    ) -> SyncResult<Self> {
        config.validate()?;

        Ok(SyncSession {
            inner: Arc::new(SessionInner {
                config,
                store,
                sink,
                state: RwLock::new(SessionState {
                    role: Role::Unhosted,
                    local_fallback: false,
                }),
                host: Mutex::new(None),
                client: Mutex::new(None),
                connection_gen: AtomicU64::new(0),
            }),
        })
    }

    /// Current role.
    pub async fn role(&self) -> Role {
        self.inner.state.read().await.role
    }

    /// True when this device treats its own store as authoritative because no
    /// kitchen was reachable.
    pub async fn local_fallback(&self) -> bool {
        self.inner.state.read().await.local_fallback
    }

    /// The durable store backing this session.
    pub fn store(&self) -> &Database {
        &self.inner.store
    }

    /// The session configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Number of live inbound peer channels (zero unless Hosting).
    pub async fn peer_count(&self) -> usize {
        match self.inner.host.lock().await.as_ref() {
            Some(host) => host.peer_count().await,
            None => 0,
        }
    }

    // =========================================================================
    // Role Operations
    // =========================================================================

    /// Claims the well-known kitchen identity.
    ///
    /// Idempotent: if this process already holds it, resuming the session is
    /// a no-op success. If another live device holds it, fails with
    /// [`SyncError::IdentityTaken`] and the role is unchanged — the bind
    /// collision *is* the exclusivity mechanism.
    pub async fn become_host(&self) -> SyncResult<()> {
        if self.role().await == Role::Hosting {
            info!("Resuming existing kitchen session");
            return Ok(());
        }

        let handle = HostServer::start(
            &self.inner.config,
            self.inner.store.clone(),
            self.inner.sink.clone(),
        )
        .await?;

        *self.inner.host.lock().await = Some(handle);

        // A host is nobody's client: drop any outbound channel.
        if let Some(old) = self.inner.client.lock().await.take() {
            old.shutdown().await;
        }

        let mut state = self.inner.state.write().await;
        state.role = Role::Hosting;
        state.local_fallback = false;

        info!(device = %self.inner.config.device.name, "Now hosting the kitchen");
        Ok(())
    }

    /// Opens a channel to the kitchen, or degrades gracefully.
    ///
    /// Never fails on unreachable hosts: both the error and the timeout arm
    /// resolve to [`ConnectOutcome::LocalFallback`], with this device's store
    /// authoritative from then on. Callers that want automatic retries use
    /// [`crate::retry::spawn_reconnect`].
    pub async fn connect_as_client(&self) -> ConnectOutcome {
        // Loopback optimization: a hosting device viewing its own kitchen
        // needs no network round trip.
        if self.role().await == Role::Hosting {
            debug!("Loopback mode active (hosting and viewing on the same device)");
            return ConnectOutcome::Loopback;
        }

        // Always start from a fresh channel.
        if let Some(old) = self.inner.client.lock().await.take() {
            old.shutdown().await;
        }

        let url = self.inner.config.host_url();
        match transport::connect(&url, self.inner.config.connect_timeout()).await {
            Ok(stream) => {
                let (handle, incoming_rx) = transport::spawn_channel(stream);
                *self.inner.client.lock().await = Some(handle);

                {
                    let mut state = self.inner.state.write().await;
                    state.role = Role::Connected;
                    state.local_fallback = false;
                }

                let generation = self.inner.connection_gen.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::spawn(Self::client_router(
                    self.inner.clone(),
                    incoming_rx,
                    generation,
                ));

                info!(url = %url, "Connected to the kitchen");
                ConnectOutcome::Connected
            }
            Err(e) => {
                warn!(url = %url, %e, "Kitchen unreachable, enabling local fallback");

                let mut state = self.inner.state.write().await;
                state.role = Role::Disconnected;
                state.local_fallback = true;

                ConnectOutcome::LocalFallback
            }
        }
    }

    /// Tears down all inbound channels and releases the kitchen identity.
    pub async fn stop_hosting(&self) {
        if let Some(handle) = self.inner.host.lock().await.take() {
            handle.shutdown().await;

            let mut state = self.inner.state.write().await;
            if state.role == Role::Hosting {
                state.role = Role::Unhosted;
            }
        }
    }

    /// Closes the outbound channel and releases the client identity.
    pub async fn disconnect(&self) {
        if let Some(handle) = self.inner.client.lock().await.take() {
            handle.shutdown().await;
        }

        let mut state = self.inner.state.write().await;
        if state.role != Role::Hosting {
            state.role = Role::Unhosted;
        }
    }

    /// Stops hosting and disconnects; the session can be started again.
    pub async fn shutdown(&self) {
        self.stop_hosting().await;
        self.disconnect().await;
    }

    // =========================================================================
    // Replication
    // =========================================================================

    /// The single replication primitive. Delivery rule, unconditionally in
    /// this order:
    ///
    /// 1. Hosting: fan out to every live inbound channel (best-effort; dead
    ///    peers are pruned, not retried).
    /// 2. Connected: send on the outbound channel.
    /// 3. Hosting or local-fallback: apply to the durable store and invoke
    ///    the sink synchronously — in addition to 1/2, not instead of.
    pub async fn broadcast(&self, event: SyncEvent) -> SyncResult<()> {
        let (role, local_fallback) = {
            let state = self.inner.state.read().await;
            (state.role, state.local_fallback)
        };

        // 1. Fan out to connected peers (if we are the kitchen).
        if role == Role::Hosting {
            if let Some(host) = self.inner.host.lock().await.as_ref() {
                host.broadcast(&event).await;
            }
        }

        // 2. Send to the kitchen (if we are a remote client).
        if role == Role::Connected {
            if let Some(client) = self.inner.client.lock().await.as_ref() {
                if let Err(e) = client.send(event.clone()).await {
                    warn!(%e, "Failed to send event to the kitchen");
                }
            }
        }

        // 3. Loopback / fallback: we are our own backend.
        if role == Role::Hosting || local_fallback {
            apply_local(&self.inner.store, &event).await?;
            self.inner.sink.on_event(&event);
        }

        Ok(())
    }

    /// Routes inbound events from the client channel until it closes, then
    /// downgrades to local fallback (unless the disconnect was deliberate or
    /// a newer connection already replaced this one).
    async fn client_router(
        inner: Arc<SessionInner>,
        mut incoming_rx: mpsc::Receiver<SyncEvent>,
        generation: u64,
    ) {
        while let Some(event) = incoming_rx.recv().await {
            apply_inbound(&inner.store, inner.sink.as_ref(), event).await;
        }

        // Channel gone. If this is still the live connection and we believed
        // we were connected, this was not a deliberate disconnect: degrade,
        // don't halt.
        if inner.connection_gen.load(Ordering::SeqCst) != generation {
            return;
        }

        let mut state = inner.state.write().await;
        if state.role == Role::Connected {
            warn!("Connection to the kitchen lost, enabling local fallback");
            state.role = Role::Disconnected;
            state.local_fallback = true;
            drop(state);

            inner.client.lock().await.take();
        }
    }

    // =========================================================================
    // Domain Operations (the narrow surface the UI calls)
    // =========================================================================

    /// Submits a customer order: validates, builds a `Pending` order with its
    /// total computed once, and broadcasts `OrderCreated`. The first durable
    /// write happens wherever the broadcast rule says the backend is — on the
    /// kitchen for connected clients, locally in loopback/fallback.
    pub async fn submit_order(
        &self,
        customer_name: &str,
        items: Vec<CartItem>,
    ) -> SyncResult<Order> {
        validate_submission(customer_name, &items)?;

        let order = Order::new(customer_name, items);
        info!(id = %order.id, customer = %order.customer_name, total = %order.total(), "Submitting order");

        self.broadcast(SyncEvent::OrderCreated(order.clone())).await?;
        Ok(order)
    }

    /// Replaces the menu (kitchen operator action): validates, writes the
    /// store, broadcasts `MenuReplaced` so every client updates in lock-step.
    pub async fn replace_menu(&self, items: Vec<MenuItem>) -> SyncResult<()> {
        validate_menu(&items).map_err(CoreError::from)?;

        self.inner.store.menu().replace_all(&items).await?;
        self.broadcast(SyncEvent::MenuReplaced(items)).await
    }

    /// Advances an order exactly one lifecycle step (kitchen operator
    /// action). The transition is written to the store, then broadcast as
    /// `OrderStatusChanged`.
    pub async fn advance_order(&self, order_id: &str) -> SyncResult<OrderStatus> {
        let order = self
            .inner
            .store
            .orders()
            .get(order_id)
            .await?
            .ok_or_else(|| SyncError::UnknownOrder(order_id.to_string()))?;

        let next = order
            .status
            .next()
            .ok_or(CoreError::TerminalStatus(order.status))?;

        self.inner.store.orders().set_status(order_id, next).await?;
        info!(id = %order_id, from = %order.status, to = %next, "Advanced order");

        self.broadcast(SyncEvent::status_changed(order_id, next)).await?;
        Ok(next)
    }
}

// =============================================================================
// Event Application
// =============================================================================

/// Inbound rule, applied to every event delivered on any channel:
/// an `OrderCreated` is idempotently appended to the store (duplicate
/// delivery collapses on the order id), then the sink gets the raw event
/// regardless of type — UI layers decide relevance.
pub(crate) async fn apply_inbound(store: &Database, sink: &dyn EventSink, event: SyncEvent) {
    if let SyncEvent::OrderCreated(order) = &event {
        match store.orders().append(order).await {
            Ok(true) => debug!(id = %order.id, "Stored replicated order"),
            Ok(false) => debug!(id = %order.id, "Duplicate order delivery ignored"),
            Err(e) => warn!(id = %order.id, ?e, "Failed to store replicated order"),
        }
    }

    sink.on_event(&event);
}

/// The "I am my own backend" path: applies an event to the local store the
/// way the kitchen's store would absorb it.
async fn apply_local(store: &Database, event: &SyncEvent) -> SyncResult<()> {
    match event {
        SyncEvent::MenuReplaced(items) => {
            store.menu().replace_all(items).await?;
        }
        SyncEvent::OrderCreated(order) => {
            store.orders().append(order).await?;
        }
        SyncEvent::OrderStatusChanged(change) => {
            match store.orders().set_status(&change.order_id, change.status).await {
                // A status echo for an order this store never saw: degrade,
                // don't halt.
                Err(StoreError::NotFound { .. }) => {
                    warn!(id = %change.order_id, "Status change for unknown order ignored");
                }
                other => other?,
            }
        }
        SyncEvent::OrdersSnapshot(orders) => {
            store.orders().merge(orders).await?;
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bistro_core::Category;
    use bistro_store::DbConfig;

    async fn session() -> SyncSession {
        let store = Database::new(DbConfig::in_memory()).await.unwrap();
        SyncSession::new(SyncConfig::default(), store, Arc::new(NoopSink)).unwrap()
    }

    fn cart_line() -> CartItem {
        let item = MenuItem::new("1", "Burger", "Beef", 1299, Category::Main);
        CartItem::from_menu_item(&item)
    }

    #[tokio::test]
    async fn test_fresh_session_is_unhosted() {
        let s = session().await;
        assert_eq!(s.role().await, Role::Unhosted);
        assert!(!s.local_fallback().await);
    }

    #[tokio::test]
    async fn test_submit_order_validates() {
        let s = session().await;

        let err = s.submit_order("  ", vec![cart_line()]).await.unwrap_err();
        assert!(matches!(err, SyncError::Domain(_)));

        let err = s.submit_order("Maya", vec![]).await.unwrap_err();
        assert!(matches!(err, SyncError::Domain(_)));
    }

    #[tokio::test]
    async fn test_unhosted_broadcast_does_not_persist() {
        // Not hosting, no fallback: the broadcast has nowhere to go and the
        // local store is not the backend.
        let s = session().await;
        let order = s.submit_order("Maya", vec![cart_line()]).await.unwrap();

        assert!(s.store().orders().get(&order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_advance_unknown_order() {
        let s = session().await;
        let err = s.advance_order("ghost").await.unwrap_err();
        assert!(matches!(err, SyncError::UnknownOrder(_)));
    }

    #[tokio::test]
    async fn test_replace_menu_rejects_duplicates() {
        let s = session().await;
        let item = MenuItem::new("1", "Burger", "Beef", 1299, Category::Main);
        let err = s
            .replace_menu(vec![item.clone(), item])
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Domain(_)));
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Hosting.to_string(), "hosting");
        assert_eq!(Role::Disconnected.to_string(), "disconnected");
    }
}
