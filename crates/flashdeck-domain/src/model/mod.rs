//! Principals and access levels.

mod principal;

pub use principal::{Principal, UserRef};

use crate::error::{DomainError, DomainResult};

/// Access granted to a principal on a flashcard set.
///
/// Levels are ordered: `Deny < ReadOnly < ReadWrite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Access {
    Deny,
    ReadOnly,
    ReadWrite,
}

impl Access {
    pub fn can_read(self) -> bool {
        self >= Access::ReadOnly
    }

    pub fn can_write(self) -> bool {
        self == Access::ReadWrite
    }

    /// Fails with `Forbidden` unless at least read access was granted.
    pub fn require_read(self) -> DomainResult<()> {
        if self.can_read() {
            Ok(())
        } else {
            Err(DomainError::Forbidden {
                message: "Access denied".to_string(),
            })
        }
    }

    /// Fails with `Forbidden` and the given message unless write access was granted.
    pub fn require_write(self, message: &str) -> DomainResult<()> {
        if self.can_write() {
            Ok(())
        } else {
            Err(DomainError::Forbidden {
                message: message.to_string(),
            })
        }
    }
}
