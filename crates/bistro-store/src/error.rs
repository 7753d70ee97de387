//! # Store Error Types
//!
//! Error types for the durable store. The import path is the one place the
//! contract requires failing *closed*: a malformed snapshot code must leave
//! the store untouched, so decode errors get their own variant rather than
//! being folded into query errors.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error type covering persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open or connect to the database.
    #[error("database connection failed: {0}")]
    ConnectionFailed(String),

    /// Database migration failed.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Underlying query failed.
    #[error("database error: {0}")]
    Query(#[from] sqlx::Error),

    /// A row that must exist does not.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A stored or transported payload failed to (de)serialize.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A snapshot code could not be decoded. Import fails closed on this:
    /// nothing is written.
    #[error("snapshot code could not be decoded: {0}")]
    ImportDecode(String),
}

impl StoreError {
    /// Shorthand for a typed not-found error.
    pub fn not_found(entity: &'static str, id: &str) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StoreError::not_found("order", "abc-123");
        assert_eq!(err.to_string(), "order not found: abc-123");
    }

    #[test]
    fn test_import_decode_display() {
        let err = StoreError::ImportDecode("invalid base64".into());
        assert!(err.to_string().contains("invalid base64"));
    }
}
