//! Access-controlled CRUD handlers.
//!
//! Each operation resolves who is calling, asks the ownership gate, and only
//! then touches storage. The HTTP layer maps the returned `DomainError`s to
//! status codes.

pub mod accounts;
pub mod cards;
pub mod principal;
pub mod sets;
pub mod types;

pub use accounts::AccountHandler;
pub use cards::CardHandler;
pub use principal::PrincipalResolver;
pub use sets::SetHandler;

use chrono::{DateTime, Utc};
use flashdeck_domain::DomainError;
use flashdeck_storage::StorageError;

/// Maps a storage failure onto the domain error taxonomy.
pub(crate) fn storage_error(err: StorageError) -> DomainError {
    match err {
        StorageError::UserNotFound { user_id } => DomainError::not_found("user", user_id),
        StorageError::SetNotFound { set_id } => DomainError::not_found("flashcard set", set_id),
        StorageError::CardNotFound { card_id } => DomainError::not_found("flashcard", card_id),
        StorageError::DuplicateUser { field, .. } => DomainError::Conflict {
            field,
            message: format!("{} already exists", capitalize(field)),
        },
        other => DomainError::StorageOperationFailed {
            reason: other.to_string(),
        },
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Generates a new document id.
pub(crate) fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

/// Current time, never earlier than `floor`.
///
/// Keeps `updated_at` monotonic even if the wall clock steps backwards.
pub(crate) fn now_not_before(floor: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(floor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_user_maps_to_conflict() {
        let err = storage_error(StorageError::DuplicateUser {
            field: "email",
            value: "a@example.com".to_string(),
        });
        match err {
            DomainError::Conflict { field, message } => {
                assert_eq!(field, "email");
                assert_eq!(message, "Email already exists");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err = storage_error(StorageError::SetNotFound {
            set_id: "s1".to_string(),
        });
        assert_eq!(err.to_string(), "flashcard set not found");
    }

    #[test]
    fn test_other_errors_are_server_faults() {
        let err = storage_error(StorageError::QueryTimeout {
            operation: "get_set".to_string(),
            timeout: std::time::Duration::from_secs(1),
        });
        assert!(err.is_server_fault());
    }

    #[test]
    fn test_now_not_before_future_floor() {
        let floor = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(now_not_before(floor), floor);
    }
}
