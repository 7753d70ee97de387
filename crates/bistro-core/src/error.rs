//! # Domain Error Types
//!
//! Typed errors for the pure domain layer. Everything here is a rule
//! violation, never an I/O failure — those live in the store and sync crates.

use thiserror::Error;

use crate::types::OrderStatus;

/// Result type alias for domain operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Domain rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A lifecycle transition that is not the single forward step.
    #[error("invalid order transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Attempted to advance an order that is already terminal.
    #[error("order is already {0}, no further transitions")]
    TerminalStatus(OrderStatus),

    /// A validation rule failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Validation failures for operator- and customer-supplied data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Menu item name is empty or whitespace.
    #[error("menu item name must not be empty")]
    EmptyItemName,

    /// Menu item id is empty.
    #[error("menu item id must not be empty")]
    EmptyItemId,

    /// Menu item price is negative.
    #[error("menu item price must not be negative (got {0} cents)")]
    NegativePrice(i64),

    /// Customer name is empty or whitespace.
    #[error("customer name must not be empty")]
    EmptyCustomerName,

    /// Order submitted with no cart lines.
    #[error("an order must contain at least one item")]
    EmptyCart,

    /// Two menu items in one collection share an id.
    #[error("duplicate menu item id: {0}")]
    DuplicateItemId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Ready,
        };
        assert!(err.to_string().contains("pending"));
        assert!(err.to_string().contains("ready"));

        let err = CoreError::TerminalStatus(OrderStatus::Completed);
        assert!(err.to_string().contains("completed"));
    }

    #[test]
    fn test_validation_into_core_error() {
        let err: CoreError = ValidationError::EmptyCart.into();
        assert!(matches!(err, CoreError::Validation(ValidationError::EmptyCart)));
    }
}
