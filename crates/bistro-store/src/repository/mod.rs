//! # Repository Layer
//!
//! One repository per collection, each a thin struct over the shared pool:
//!
//! - [`menu`] - the kitchen's catalog (seeded on first access)
//! - [`order`] - submitted orders (idempotent append, status updates)
//!
//! Repositories are cheap to construct; `Database::menu()` / `::orders()`
//! hand out fresh ones per call.

pub mod menu;
pub mod order;
