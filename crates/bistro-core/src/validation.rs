//! # Validation Rules
//!
//! Pure checks applied at the creation seams: menu edits on the kitchen side
//! and order submission on the customer side. I/O-free so the same rules can
//! run anywhere (store, engine, or a future wasm UI).

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{CartItem, MenuItem};

/// Validates a single menu item before it is upserted or replicated.
pub fn validate_menu_item(item: &MenuItem) -> Result<(), ValidationError> {
    if item.id.trim().is_empty() {
        return Err(ValidationError::EmptyItemId);
    }
    if item.name.trim().is_empty() {
        return Err(ValidationError::EmptyItemName);
    }
    if item.price_cents < 0 {
        return Err(ValidationError::NegativePrice(item.price_cents));
    }
    Ok(())
}

/// Validates a full menu collection: every item valid, ids unique.
pub fn validate_menu(items: &[MenuItem]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for item in items {
        validate_menu_item(item)?;
        if !seen.insert(item.id.as_str()) {
            return Err(ValidationError::DuplicateItemId(item.id.clone()));
        }
    }
    Ok(())
}

/// Validates an order submission before an Order is built.
pub fn validate_submission(customer_name: &str, items: &[CartItem]) -> Result<(), ValidationError> {
    if customer_name.trim().is_empty() {
        return Err(ValidationError::EmptyCustomerName);
    }
    if items.is_empty() {
        return Err(ValidationError::EmptyCart);
    }
    Ok(())
}
