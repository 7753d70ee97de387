//! # Sync Protocol Events
//!
//! The closed set of events replicated between the kitchen host and its
//! clients.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Protocol Events                             │
//! │                                                                         │
//! │  JOIN-TIME CATCH-UP (host → new peer only)                             │
//! │  ─────────────────────────────────────────                             │
//! │  HOST   ───► MenuReplaced   { full menu snapshot }                     │
//! │  HOST   ───► OrdersSnapshot { all non-terminal orders }                │
//! │                                                                         │
//! │  STEADY STATE                                                          │
//! │  ────────────                                                          │
//! │  CLIENT ───► OrderCreated       { full order }                         │
//! │  HOST   ───► MenuReplaced       { full menu snapshot }                 │
//! │  HOST   ───► OrderStatusChanged { order_id, status }                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format (JSON)
//! Events are serialized as a tagged JSON union using serde's adjacently
//! tagged enum:
//! ```json
//! { "type": "OrderCreated", "payload": { "id": "...", ... } }
//! ```
//!
//! Compatibility requires only that both ends agree on this tag set. Unknown
//! tags fail deserialization and are rejected and logged at the consumption
//! points — never silently ignored.

use serde::{Deserialize, Serialize};

use bistro_core::{MenuItem, Order, OrderStatus};

// =============================================================================
// Main Event Enum (Tagged Union)
// =============================================================================

/// All replicated sync events.
///
/// Uses serde's adjacently tagged enum for clean JSON serialization:
/// `{ "type": "MenuReplaced", "payload": [ ... ] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum SyncEvent {
    /// The full menu, replacing whatever the receiver had. Menu mutations are
    /// whole-collection by design, so there is no per-item delta event.
    MenuReplaced(Vec<MenuItem>),

    /// A freshly submitted order (full value).
    OrderCreated(Order),

    /// A single forward lifecycle step for one order.
    OrderStatusChanged(StatusChange),

    /// All non-terminal orders, sent to bring a newly joined peer up to date.
    OrdersSnapshot(Vec<Order>),
}

/// Payload for [`SyncEvent::OrderStatusChanged`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    /// The order being advanced.
    pub order_id: String,

    /// The status it advanced to.
    pub status: OrderStatus,
}

// =============================================================================
// Helper Functions
// =============================================================================

impl SyncEvent {
    /// Returns the event tag as a string (for logging).
    pub fn type_name(&self) -> &'static str {
        match self {
            SyncEvent::MenuReplaced(_) => "MenuReplaced",
            SyncEvent::OrderCreated(_) => "OrderCreated",
            SyncEvent::OrderStatusChanged(_) => "OrderStatusChanged",
            SyncEvent::OrdersSnapshot(_) => "OrdersSnapshot",
        }
    }

    /// Creates an OrderStatusChanged event.
    pub fn status_changed(order_id: &str, status: OrderStatus) -> Self {
        SyncEvent::OrderStatusChanged(StatusChange {
            order_id: order_id.to_string(),
            status,
        })
    }

    /// Serializes to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bistro_core::{CartItem, Category};

    fn sample_order() -> Order {
        let item = MenuItem::new("1", "Dad's Famous Burger", "Beef", 1299, Category::Main);
        Order::new("Maya", vec![CartItem::from_menu_item(&item)])
    }

    #[test]
    fn test_event_tagging() {
        let event = SyncEvent::status_changed("order-1", OrderStatus::Ready);
        let json = event.to_json().unwrap();

        assert!(json.contains("\"type\":\"OrderStatusChanged\""));
        assert!(json.contains("\"orderId\":\"order-1\""));
        assert!(json.contains("\"ready\""));
    }

    #[test]
    fn test_order_created_roundtrip() {
        let order = sample_order();
        let event = SyncEvent::OrderCreated(order.clone());

        let json = event.to_json().unwrap();
        let back = SyncEvent::from_json(&json).unwrap();

        match back {
            SyncEvent::OrderCreated(parsed) => {
                assert_eq!(parsed.id, order.id);
                assert_eq!(parsed.total_cents, 1299);
                assert_eq!(parsed.status, OrderStatus::Pending);
            }
            other => panic!("expected OrderCreated, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_menu_replaced_roundtrip() {
        let menu = vec![MenuItem::new("1", "Burger", "Beef", 850, Category::Main)];
        let json = SyncEvent::MenuReplaced(menu.clone()).to_json().unwrap();

        match SyncEvent::from_json(&json).unwrap() {
            SyncEvent::MenuReplaced(parsed) => assert_eq!(parsed, menu),
            other => panic!("expected MenuReplaced, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let frame = r#"{"type":"FactoryReset","payload":null}"#;
        assert!(SyncEvent::from_json(frame).is_err());

        let garbage = "definitely not json";
        assert!(SyncEvent::from_json(garbage).is_err());
    }
}
