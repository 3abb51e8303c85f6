//! Storage error types.

use std::time::Duration;

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// User not found.
    #[error("user not found: {user_id}")]
    UserNotFound { user_id: String },

    /// Flashcard set not found.
    #[error("flashcard set not found: {set_id}")]
    SetNotFound { set_id: String },

    /// Flashcard not found.
    #[error("flashcard not found: {card_id}")]
    CardNotFound { card_id: String },

    /// A unique user field (username or email) is already taken.
    #[error("duplicate user {field}: {value}")]
    DuplicateUser { field: &'static str, value: String },

    /// A document with the same id already exists.
    #[error("document already exists in {collection}: {id}")]
    DuplicateId {
        collection: &'static str,
        id: String,
    },

    /// Database connection error.
    #[error("database connection error: {message}")]
    ConnectionError { message: String },

    /// Database query error.
    #[error("database query error: {message}")]
    QueryError { message: String },

    /// Query exceeded its timeout.
    #[error("query timeout after {timeout:?}: {operation}")]
    QueryTimeout { operation: String, timeout: Duration },

    /// Health check failed.
    #[error("health check failed: {message}")]
    HealthCheckFailed { message: String },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

impl StorageError {
    /// Returns true for the "document does not exist" variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::UserNotFound { .. }
                | StorageError::SetNotFound { .. }
                | StorageError::CardNotFound { .. }
        )
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of a storage health check.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency: Duration,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_variants_are_classified() {
        assert!(StorageError::SetNotFound {
            set_id: "s1".to_string()
        }
        .is_not_found());
        assert!(StorageError::CardNotFound {
            card_id: "c1".to_string()
        }
        .is_not_found());
        assert!(!StorageError::QueryError {
            message: "boom".to_string()
        }
        .is_not_found());
    }

    #[test]
    fn test_duplicate_user_message_names_field() {
        let err = StorageError::DuplicateUser {
            field: "email",
            value: "a@example.com".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate user email: a@example.com");
    }
}
