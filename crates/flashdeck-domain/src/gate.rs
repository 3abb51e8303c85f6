//! Ownership-and-visibility gate.
//!
//! Every flashcard set has exactly one owner and a public flag. Cards carry no
//! visibility of their own and are always judged through their parent set.
//!
//! | principal     | public | owner | result    |
//! |---------------|--------|-------|-----------|
//! | anonymous     | yes    | -     | ReadOnly  |
//! | anonymous     | no     | -     | Deny      |
//! | authenticated | any    | yes   | ReadWrite |
//! | authenticated | yes    | no    | ReadOnly  |
//! | authenticated | no     | no    | Deny      |

use crate::model::{Access, Principal};

/// The fields of a set that the gate looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceOwnership<'a> {
    pub owner_id: &'a str,
    pub is_public: bool,
}

impl<'a> ResourceOwnership<'a> {
    pub fn new(owner_id: &'a str, is_public: bool) -> Self {
        Self {
            owner_id,
            is_public,
        }
    }
}

/// Decides what `principal` may do with `resource`.
pub fn authorize(principal: &Principal, resource: ResourceOwnership<'_>) -> Access {
    match principal.user_id() {
        Some(user_id) if user_id == resource.owner_id => Access::ReadWrite,
        _ if resource.is_public => Access::ReadOnly,
        _ => Access::Deny,
    }
}
