//! # bistro-store: Durable Store for Family Bistro
//!
//! Single-device persistence for the two collections everything else is built
//! on: the menu and the orders. The sync engine treats this crate as its
//! "backend" — on the kitchen host and on offline clients it is the
//! authoritative copy of state.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Family Bistro Data Flow                             │
//! │                                                                         │
//! │  bistro-sync (apply replicated event / serve catch-up snapshot)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   bistro-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│  menu / order │    │  (embedded)  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────────────────────────────────────────────────┐ │   │
//! │  │   │  snapshot: export/import portable sync codes (base64)    │ │   │
//! │  │   └──────────────────────────────────────────────────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL mode)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Store error types
//! - [`repository`] - Repository implementations (menu, order)
//! - [`snapshot`] - Export/import of portable sync codes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bistro_store::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("bistro.db")).await?;
//!
//! // First access seeds the default catalog
//! let menu = db.menu().all().await?;
//!
//! // Orders read newest first
//! let orders = db.orders().all().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod snapshot;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use pool::{Database, DbConfig};
pub use snapshot::StateSnapshot;

// Repository re-exports for convenience
pub use repository::menu::MenuRepository;
pub use repository::order::OrderRepository;
