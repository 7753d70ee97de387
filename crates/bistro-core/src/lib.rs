//! # bistro-core: Pure Domain Logic for Family Bistro
//!
//! This crate is the **heart** of the Family Bistro order system. It contains
//! the domain types and rules shared by every other layer, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Family Bistro Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            UI surfaces (kitchen / customer / tracker)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ event sink + store contract            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bistro-sync (peer engine)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 ★ bistro-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌──────────────┐               │   │
//! │  │   │   types   │  │   money   │  │  validation  │               │   │
//! │  │   │ MenuItem  │  │   Money   │  │    rules     │               │   │
//! │  │   │  Order    │  │  (cents)  │  │              │               │   │
//! │  │   └───────────┘  └───────────┘  └──────────────┘               │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (MenuItem, CartItem, Order, OrderStatus, Role)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use bistro_core::{CartItem, MenuItem, Order, OrderStatus};
//!
//! let burger = MenuItem::new("1", "Dad's Famous Burger", "Beef, secret sauce", 1299, bistro_core::Category::Main);
//! let order = Order::new("Maya", vec![CartItem::from_menu_item(&burger)]);
//!
//! assert_eq!(order.status, OrderStatus::Pending);
//! assert_eq!(order.total_cents, 1299);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use bistro_core::Money` instead of
// `use bistro_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;
