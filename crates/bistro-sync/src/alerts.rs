//! # Ready Alerts
//!
//! The "your food is ready" notification is a pure projection of the status
//! stream: any device holding an order id that reaches `Ready` surfaces an
//! alert, exactly once per order. There is no separate protocol message.
//!
//! UI layers feed every received [`SyncEvent`] through a `ReadyAlerts` value
//! and ring the bell for whatever ids come back.

use std::collections::HashSet;

use bistro_core::OrderStatus;

use crate::protocol::SyncEvent;

/// Once-per-order projection of `Ready` transitions.
///
/// Orders already `Ready` inside a catch-up snapshot are treated as
/// announced: a late joiner sees them listed as ready, it does not get a
/// fresh pop-up for history.
#[derive(Debug, Default)]
pub struct ReadyAlerts {
    announced: HashSet<String>,
}

impl ReadyAlerts {
    /// Creates an empty projection.
    pub fn new() -> Self {
        ReadyAlerts::default()
    }

    /// Observes one event; returns the order id to alert for, if this event
    /// is the first time that order was seen reaching `Ready`.
    pub fn observe(&mut self, event: &SyncEvent) -> Option<String> {
        match event {
            SyncEvent::OrderStatusChanged(change) if change.status == OrderStatus::Ready => {
                if self.announced.insert(change.order_id.clone()) {
                    Some(change.order_id.clone())
                } else {
                    None
                }
            }

            // Snapshots record ready orders without alerting.
            SyncEvent::OrdersSnapshot(orders) => {
                for order in orders {
                    if order.status == OrderStatus::Ready {
                        self.announced.insert(order.id.clone());
                    }
                }
                None
            }

            SyncEvent::OrderStatusChanged(_)
            | SyncEvent::OrderCreated(_)
            | SyncEvent::MenuReplaced(_) => None,
        }
    }
}
