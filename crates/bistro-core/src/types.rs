//! # Domain Types
//!
//! Core domain types used throughout Family Bistro.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    MenuItem     │   │    CartItem     │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (stable)    │   │  line_id        │   │  id (UUID)      │       │
//! │  │  name           │   │  item (frozen   │   │  customer_name  │       │
//! │  │  price_cents    │   │   MenuItem)     │   │  items          │       │
//! │  │  category       │   │  note           │   │  status, total  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │    Category     │   │   OrderStatus   │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  Starter        │   │  Pending        │                             │
//! │  │  Main           │   │  Preparing      │                             │
//! │  │  Dessert        │   │  Ready          │                             │
//! │  │  Drink          │   │  Completed      │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! An order captures its cart lines *frozen at submission time*. Later menu
//! edits never alter what a customer already ordered, which is also what
//! makes the order list safe to replicate as opaque values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Category
// =============================================================================

/// Menu section a dish belongs to. Closed set; the UI renders one tab per
/// variant and the store persists the lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Starter,
    Main,
    Dessert,
    Drink,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Starter => write!(f, "starter"),
            Category::Main => write!(f, "main"),
            Category::Dessert => write!(f, "dessert"),
            Category::Drink => write!(f, "drink"),
        }
    }
}

// =============================================================================
// Menu Item
// =============================================================================

/// A dish on the kitchen's menu.
///
/// Identity is immutable; the item itself is mutated only by whole-value
/// replacement (upsert) or deletion, never by partial field updates. That
/// keeps replication trivial: a menu change is always a full snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MenuItem {
    /// Stable identifier, unique within the menu at all times.
    pub id: String,

    /// Display name shown to customers and on the kitchen dashboard.
    pub name: String,

    /// Short description for the menu card.
    pub description: String,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Menu section.
    pub category: Category,

    /// Optional image reference for the menu card.
    pub image_url: Option<String>,

    /// Marks machine-generated content (description/image filled in by the
    /// generative helper rather than the operator).
    pub is_generated: bool,
}

impl MenuItem {
    /// Creates a plain operator-authored menu item.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        price_cents: i64,
        category: Category,
    ) -> Self {
        MenuItem {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            price_cents,
            category,
            image_url: None,
            is_generated: false,
        }
    }

    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// One line in a customer's cart: a frozen MenuItem snapshot plus a
/// locally-unique line identity.
///
/// A standalone cart is session state on one customer device — it is never
/// persisted or replicated. Once an order is submitted, its lines live on
/// inside the order as immutable snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItem {
    /// Cart-line identity, unique within one customer session. Two of the
    /// same dish are two lines.
    pub line_id: String,

    /// The menu item as it looked when added to the cart (frozen).
    pub item: MenuItem,

    /// Optional customer note for this line ("no onions").
    pub note: Option<String>,
}

impl CartItem {
    /// Freezes a menu item into a new cart line.
    pub fn from_menu_item(item: &MenuItem) -> Self {
        CartItem {
            line_id: Uuid::new_v4().to_string(),
            item: item.clone(),
            note: None,
        }
    }

    /// Attaches a customer note to the line.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Returns the frozen line price.
    #[inline]
    pub fn price(&self) -> Money {
        self.item.price()
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The lifecycle of an order on the kitchen dashboard.
///
/// ## Lifecycle
/// ```text
/// Pending ──► Preparing ──► Ready ──► Completed
/// ```
/// Exactly one forward step at a time, driven only by the kitchen operator.
/// There is no transition out of `Completed` and no backward transition;
/// terminal orders are retained for display until the history is purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Just submitted, not yet picked up by the kitchen.
    Pending,
    /// The kitchen is working on it.
    Preparing,
    /// Done — the customer should come and get it.
    Ready,
    /// Picked up. Terminal.
    Completed,
}

impl OrderStatus {
    /// Returns the single allowed forward step, or `None` from `Completed`.
    pub const fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::Completed),
            OrderStatus::Completed => None,
        }
    }

    /// Returns true if no further transitions exist.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed)
    }

    /// Returns true if `target` is the single allowed forward step from here.
    pub fn allows(&self, target: OrderStatus) -> bool {
        self.next() == Some(target)
    }

    /// Validates an explicit transition request, as issued by the kitchen
    /// dashboard's per-status buttons.
    pub fn advance_to(self, target: OrderStatus) -> Result<OrderStatus, crate::CoreError> {
        if self.allows(target) {
            Ok(target)
        } else if self.is_terminal() {
            Err(crate::CoreError::TerminalStatus(self))
        } else {
            Err(crate::CoreError::InvalidTransition {
                from: self,
                to: target,
            })
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Preparing => write!(f, "preparing"),
            OrderStatus::Ready => write!(f, "ready"),
            OrderStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "completed" => Ok(OrderStatus::Completed),
            other => Err(format!("unknown order status: '{}'", other)),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A submitted customer order.
///
/// ## Invariants
/// - `id` is never reused; identity is a UUID v4 so two customers submitting
///   in the same instant on different devices cannot collide
/// - `items` is immutable after creation (frozen snapshots)
/// - `total_cents` is computed once at creation and never recomputed
/// - `status` only moves forward; see [`OrderStatus`]
/// - `chef_note` is written at most once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Customer-supplied label for the order.
    pub customer_name: String,

    /// Cart lines captured at submission time (frozen).
    pub items: Vec<CartItem>,

    /// Current lifecycle state.
    pub status: OrderStatus,

    /// When the order was submitted; drives newest-first display ordering.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// Sum of line prices in cents, computed once at creation.
    pub total_cents: i64,

    /// Optional one-time chef annotation (free text).
    pub chef_note: Option<String>,
}

impl Order {
    /// Builds a new `Pending` order from a customer's cart, computing the
    /// total from the frozen line prices.
    pub fn new(customer_name: impl Into<String>, items: Vec<CartItem>) -> Self {
        let total: Money = items.iter().map(CartItem::price).sum();

        Order {
            id: Uuid::new_v4().to_string(),
            customer_name: customer_name.into(),
            items,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            total_cents: total.cents(),
            chef_note: None,
        }
    }

    /// Returns the order total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Returns true while the order should appear on the live dashboard and
    /// in join-time catch-up snapshots.
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn burger() -> MenuItem {
        MenuItem::new("1", "Dad's Famous Burger", "Beef patty, secret sauce", 1299, Category::Main)
    }

    #[test]
    fn test_status_forward_chain() {
        let mut status = OrderStatus::Pending;
        let mut seen = vec![status];
        while let Some(next) = status.next() {
            status = next;
            seen.push(status);
        }

        assert_eq!(
            seen,
            vec![
                OrderStatus::Pending,
                OrderStatus::Preparing,
                OrderStatus::Ready,
                OrderStatus::Completed,
            ]
        );
        assert!(status.is_terminal());
    }

    #[test]
    fn test_status_allows_single_step_only() {
        assert!(OrderStatus::Pending.allows(OrderStatus::Preparing));
        assert!(!OrderStatus::Pending.allows(OrderStatus::Ready));
        assert!(!OrderStatus::Ready.allows(OrderStatus::Preparing));
        assert!(!OrderStatus::Completed.allows(OrderStatus::Pending));
    }

    #[test]
    fn test_advance_to_rejects_skips_and_reversals() {
        use crate::CoreError;

        assert_eq!(
            OrderStatus::Pending.advance_to(OrderStatus::Preparing),
            Ok(OrderStatus::Preparing)
        );
        assert_eq!(
            OrderStatus::Pending.advance_to(OrderStatus::Ready),
            Err(CoreError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Ready,
            })
        );
        assert_eq!(
            OrderStatus::Ready.advance_to(OrderStatus::Pending),
            Err(CoreError::InvalidTransition {
                from: OrderStatus::Ready,
                to: OrderStatus::Pending,
            })
        );
        assert_eq!(
            OrderStatus::Completed.advance_to(OrderStatus::Pending),
            Err(CoreError::TerminalStatus(OrderStatus::Completed))
        );
    }

    #[test]
    fn test_status_serde_roundtrip() {
        let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
        assert_eq!(json, "\"preparing\"");
        let back: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OrderStatus::Preparing);
    }

    #[test]
    fn test_order_total_computed_once() {
        let item = burger();
        let lines = vec![
            CartItem::from_menu_item(&item),
            CartItem::from_menu_item(&item).with_note("no onions"),
        ];
        let order = Order::new("Maya", lines);

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_cents, 2598);
        assert_eq!(order.items.len(), 2);
        assert!(order.is_active());
    }

    #[test]
    fn test_order_ids_unique() {
        let a = Order::new("A", vec![CartItem::from_menu_item(&burger())]);
        let b = Order::new("B", vec![CartItem::from_menu_item(&burger())]);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_cart_lines_are_distinct() {
        let item = burger();
        let a = CartItem::from_menu_item(&item);
        let b = CartItem::from_menu_item(&item);
        assert_ne!(a.line_id, b.line_id);
        assert_eq!(a.item, b.item);
    }

    #[test]
    fn test_frozen_line_survives_menu_edit() {
        let mut item = burger();
        let line = CartItem::from_menu_item(&item);

        // Price hike after the customer carted the old price.
        item.price_cents = 1599;

        assert_eq!(line.price().cents(), 1299);
    }
}
