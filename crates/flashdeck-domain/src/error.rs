//! Domain error types for access-controlled CRUD operations.

use thiserror::Error;

/// Domain-specific errors.
///
/// Validation, conflict and authentication errors are caller mistakes and
/// their messages are safe to return verbatim. Storage and credential
/// failures are server faults.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A required field is missing or malformed.
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    /// The operation requires a logged-in user.
    #[error("authentication required")]
    Unauthenticated,

    /// Unknown login or wrong password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The gate denied the operation.
    #[error("{message}")]
    Forbidden { message: String },

    /// The requested document does not exist.
    #[error("{resource} not found")]
    NotFound { resource: &'static str, id: String },

    /// A unique field is already taken.
    #[error("{message}")]
    Conflict { field: &'static str, message: String },

    /// Password hashing failed.
    #[error("credential error: {reason}")]
    CredentialError { reason: String },

    /// The storage layer failed.
    #[error("storage operation failed: {reason}")]
    StorageOperationFailed { reason: String },
}

impl DomainError {
    /// Shorthand for a field validation error.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Shorthand for a not-found error.
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        DomainError::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Returns true for errors caused by the server rather than the caller.
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self,
            DomainError::CredentialError { .. } | DomainError::StorageOperationFailed { .. }
        )
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
