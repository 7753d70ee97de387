//! Multi-device sync scenarios over localhost.
//!
//! Each test stands up real sessions (kitchen host and/or clients) on a
//! fresh port with in-memory stores, and observes replication through the
//! registered event sinks — the same surface the UI layers use.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use bistro_core::{CartItem, Category, MenuItem, Order, OrderStatus};
use bistro_store::{Database, DbConfig};
use bistro_sync::{
    spawn_reconnect, ConnectOutcome, EventSink, ReadyAlerts, Role, SyncConfig, SyncError,
    SyncEvent, SyncSession,
};

// =============================================================================
// Harness
// =============================================================================

/// Event sink that forwards everything into channels the test can await.
struct ChannelSink {
    events_tx: mpsc::UnboundedSender<SyncEvent>,
    peers_tx: mpsc::UnboundedSender<String>,
}

impl EventSink for ChannelSink {
    fn on_event(&self, event: &SyncEvent) {
        let _ = self.events_tx.send(event.clone());
    }

    fn on_peer_joined(&self, peer: &str) {
        let _ = self.peers_tx.send(peer.to_string());
    }
}

struct Device {
    session: SyncSession,
    events: mpsc::UnboundedReceiver<SyncEvent>,
    peers: mpsc::UnboundedReceiver<String>,
}

/// Picks a port nothing is listening on.
fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn test_config(name: &str, port: u16) -> SyncConfig {
    let mut config = SyncConfig::default();
    config.device.name = name.to_string();
    config.host.port = port;
    config.host.bind_addr = "127.0.0.1".to_string();
    config.client.host_addr = "127.0.0.1".to_string();
    config.client.connect_timeout_secs = 2;
    config.client.retry_interval_secs = 1;
    config
}

async fn device(name: &str, port: u16) -> Device {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let (events_tx, events) = mpsc::unbounded_channel();
    let (peers_tx, peers) = mpsc::unbounded_channel();

    let store = Database::new(DbConfig::in_memory()).await.unwrap();
    let session = SyncSession::new(
        test_config(name, port),
        store,
        Arc::new(ChannelSink { events_tx, peers_tx }),
    )
    .unwrap();

    Device {
        session,
        events,
        peers,
    }
}

fn burger_line() -> CartItem {
    let item = MenuItem::new("1", "Dad's Famous Burger", "Beef, secret sauce", 1299, Category::Main);
    CartItem::from_menu_item(&item)
}

/// Awaits the first event matching `pred`, discarding everything before it.
async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<SyncEvent>,
    what: &str,
    pred: impl Fn(&SyncEvent) -> bool,
) -> SyncEvent {
    timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
}

/// Polls until `check` passes.
async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    timeout(Duration::from_secs(5), async {
        loop {
            if check().await {
                return;
            }
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting until {what}"))
}

// =============================================================================
// Identity Exclusivity
// =============================================================================

#[tokio::test]
async fn become_host_is_idempotent_and_exclusive() {
    let port = free_port();
    let kitchen = device("Kitchen", port).await;
    let rival = device("Rival Kitchen", port).await;

    kitchen.session.become_host().await.unwrap();
    assert_eq!(kitchen.session.role().await, Role::Hosting);

    // Resuming an existing session is a no-op success.
    kitchen.session.become_host().await.unwrap();
    assert_eq!(kitchen.session.role().await, Role::Hosting);

    // A second live device cannot claim the identity, and its role is
    // unchanged by the failure.
    let err = rival.session.become_host().await.unwrap_err();
    assert!(matches!(err, SyncError::IdentityTaken));
    assert_eq!(rival.session.role().await, Role::Unhosted);

    kitchen.session.stop_hosting().await;
    assert_eq!(kitchen.session.role().await, Role::Unhosted);
}

#[tokio::test]
async fn identity_is_released_by_stop_hosting() {
    let port = free_port();
    let first = device("First", port).await;
    let second = device("Second", port).await;

    first.session.become_host().await.unwrap();
    first.session.stop_hosting().await;

    // The port is free again, so the identity can move.
    second.session.become_host().await.unwrap();
    assert_eq!(second.session.role().await, Role::Hosting);
    second.session.stop_hosting().await;
}

// =============================================================================
// Local Fallback
// =============================================================================

#[tokio::test]
async fn connect_without_host_resolves_to_local_fallback() {
    // Nothing listens on this port.
    let mut customer = device("Customer", free_port()).await;

    let outcome = customer.session.connect_as_client().await;
    assert_eq!(outcome, ConnectOutcome::LocalFallback);
    assert_eq!(customer.session.role().await, Role::Disconnected);
    assert!(customer.session.local_fallback().await);

    // The device keeps working: a broadcast order lands in its own store and
    // its own sink fires without any network.
    let order = customer
        .session
        .submit_order("Maya", vec![burger_line()])
        .await
        .unwrap();

    let stored = customer.session.store().orders().get(&order.id).await.unwrap();
    assert_eq!(stored.unwrap().status, OrderStatus::Pending);

    let event = wait_for(&mut customer.events, "local OrderCreated", |e| {
        matches!(e, SyncEvent::OrderCreated(o) if o.id == order.id)
    })
    .await;
    assert_eq!(event.type_name(), "OrderCreated");
}

#[tokio::test]
async fn loopback_host_is_its_own_viewer() {
    let port = free_port();
    let mut kitchen = device("Kitchen", port).await;

    kitchen.session.become_host().await.unwrap();

    // Same device as viewer: resolves immediately, no channel, role intact.
    let outcome = kitchen.session.connect_as_client().await;
    assert_eq!(outcome, ConnectOutcome::Loopback);
    assert_eq!(kitchen.session.role().await, Role::Hosting);

    // A broadcast updates the host's own store and sink without an echo.
    let menu = vec![MenuItem::new("7", "Pancakes", "Stacked high", 700, Category::Main)];
    kitchen.session.replace_menu(menu.clone()).await.unwrap();

    assert_eq!(kitchen.session.store().menu().all().await.unwrap(), menu);
    wait_for(&mut kitchen.events, "loopback MenuReplaced", |e| {
        matches!(e, SyncEvent::MenuReplaced(m) if *m == menu)
    })
    .await;

    kitchen.session.stop_hosting().await;
}

// =============================================================================
// Replication
// =============================================================================

#[tokio::test]
async fn menu_replaced_reaches_connected_client() {
    let port = free_port();
    let mut kitchen = device("Kitchen", port).await;
    let mut customer = device("Customer", port).await;

    kitchen.session.become_host().await.unwrap();
    assert_eq!(
        customer.session.connect_as_client().await,
        ConnectOutcome::Connected
    );
    assert_eq!(customer.session.role().await, Role::Connected);

    // The host saw the channel arrive.
    timeout(Duration::from_secs(5), kitchen.peers.recv())
        .await
        .expect("timed out waiting for peer-joined")
        .expect("peer channel closed");
    assert_eq!(kitchen.session.peer_count().await, 1);

    let menu = vec![MenuItem::new("1", "Dad's Famous Burger", "Beef", 850, Category::Main)];
    kitchen.session.replace_menu(menu.clone()).await.unwrap();

    // The client's callback receives the identical list.
    let event = wait_for(&mut customer.events, "replicated MenuReplaced", |e| {
        matches!(e, SyncEvent::MenuReplaced(m) if !m.is_empty() && m[0].id == "1" && m[0].price_cents == 850)
    })
    .await;
    match event {
        SyncEvent::MenuReplaced(received) => assert_eq!(received, menu),
        other => panic!("expected MenuReplaced, got {}", other.type_name()),
    }

    customer.session.disconnect().await;
    kitchen.session.stop_hosting().await;
}

#[tokio::test]
async fn order_flow_with_duplicate_delivery_and_ready_alert() {
    let port = free_port();
    let mut kitchen = device("Kitchen", port).await;
    let mut customer = device("Customer", port).await;

    kitchen.session.become_host().await.unwrap();
    assert_eq!(
        customer.session.connect_as_client().await,
        ConnectOutcome::Connected
    );

    // Customer submits; the first durable write happens on the kitchen.
    let order = customer
        .session
        .submit_order("Maya", vec![burger_line()])
        .await
        .unwrap();

    wait_for(&mut kitchen.events, "OrderCreated on the kitchen", |e| {
        matches!(e, SyncEvent::OrderCreated(o) if o.id == order.id)
    })
    .await;

    let stored = kitchen.session.store().orders().get(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
    assert_eq!(stored.total_cents, 1299);

    // Duplicate delivery of the same event leaves exactly one entry.
    customer
        .session
        .broadcast(SyncEvent::OrderCreated(order.clone()))
        .await
        .unwrap();
    wait_for(&mut kitchen.events, "duplicate OrderCreated", |e| {
        matches!(e, SyncEvent::OrderCreated(o) if o.id == order.id)
    })
    .await;
    assert_eq!(kitchen.session.store().orders().count().await.unwrap(), 1);

    // The kitchen walks the order forward; the client observes every step
    // and the ready alert fires exactly once.
    let mut alerts = ReadyAlerts::new();
    let mut alerted = Vec::new();

    assert_eq!(
        kitchen.session.advance_order(&order.id).await.unwrap(),
        OrderStatus::Preparing
    );
    assert_eq!(
        kitchen.session.advance_order(&order.id).await.unwrap(),
        OrderStatus::Ready
    );

    let mut seen = Vec::new();
    while seen.len() < 2 {
        let event = wait_for(&mut customer.events, "status updates", |e| {
            matches!(e, SyncEvent::OrderStatusChanged(c) if c.order_id == order.id)
        })
        .await;
        if let Some(id) = alerts.observe(&event) {
            alerted.push(id);
        }
        if let SyncEvent::OrderStatusChanged(change) = event {
            seen.push(change.status);
        }
    }

    // Non-decreasing prefix of the lifecycle, no skips.
    assert_eq!(seen, vec![OrderStatus::Preparing, OrderStatus::Ready]);
    assert_eq!(alerted, vec![order.id.clone()]);

    // A re-delivered Ready transition does not alert again.
    assert_eq!(
        alerts.observe(&SyncEvent::status_changed(&order.id, OrderStatus::Ready)),
        None
    );

    customer.session.disconnect().await;
    kitchen.session.stop_hosting().await;
}

// =============================================================================
// Join-Time Catch-Up
// =============================================================================

#[tokio::test]
async fn late_joiner_receives_menu_and_active_orders() {
    let port = free_port();
    let kitchen = device("Kitchen", port).await;
    let mut tracker = device("Tracker", port).await;

    // Kitchen state exists before anyone connects: the seeded menu, one live
    // order, one completed order.
    kitchen.session.store().menu().all().await.unwrap();

    let live = Order::new("Live", vec![burger_line()]);
    kitchen.session.store().orders().append(&live).await.unwrap();

    let mut done = Order::new("Done", vec![burger_line()]);
    done.status = OrderStatus::Completed;
    kitchen.session.store().orders().append(&done).await.unwrap();

    kitchen.session.become_host().await.unwrap();
    assert_eq!(
        tracker.session.connect_as_client().await,
        ConnectOutcome::Connected
    );

    // Catch-up arrives without waiting for any organic change.
    let menu_event = wait_for(&mut tracker.events, "catch-up MenuReplaced", |e| {
        matches!(e, SyncEvent::MenuReplaced(_))
    })
    .await;
    match menu_event {
        SyncEvent::MenuReplaced(menu) => assert_eq!(menu.len(), 4),
        _ => unreachable!(),
    }

    let snapshot_event = wait_for(&mut tracker.events, "catch-up OrdersSnapshot", |e| {
        matches!(e, SyncEvent::OrdersSnapshot(_))
    })
    .await;
    match snapshot_event {
        SyncEvent::OrdersSnapshot(orders) => {
            // Terminal orders are not part of catch-up.
            assert_eq!(orders.len(), 1);
            assert_eq!(orders[0].id, live.id);
        }
        _ => unreachable!(),
    }

    tracker.session.disconnect().await;
    kitchen.session.stop_hosting().await;
}

// =============================================================================
// Reconnection
// =============================================================================

#[tokio::test]
async fn reconnect_task_connects_once_a_kitchen_appears() {
    let port = free_port();
    let customer = device("Customer", port).await;
    let kitchen = device("Kitchen", port).await;

    // No kitchen yet: first attempt degrades to fallback, the retry task
    // keeps trying on its fixed interval.
    assert_eq!(
        customer.session.connect_as_client().await,
        ConnectOutcome::LocalFallback
    );
    let handle = spawn_reconnect(customer.session.clone());

    // The kitchen opens a moment later.
    sleep(Duration::from_millis(300)).await;
    kitchen.session.become_host().await.unwrap();

    // The retry loop picks it up and stops itself.
    eventually("customer reconnects", || async {
        customer.session.role().await == Role::Connected
    })
    .await;
    assert!(!customer.session.local_fallback().await);

    eventually("retry task stops", || async { handle.is_finished() }).await;
    handle.cancel().await;

    customer.session.disconnect().await;
    kitchen.session.stop_hosting().await;
}
