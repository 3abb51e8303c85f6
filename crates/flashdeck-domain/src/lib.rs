//! flashdeck-domain: Core access-control domain logic
//!
//! This crate contains the pure parts of Flashdeck:
//! - Principals (anonymous or an authenticated user)
//! - The ownership-and-visibility gate deciding access to a flashcard set
//! - Field validation for usernames, passwords, emails and card text
//! - Password hashing and verification
//!
//! Nothing here performs I/O.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              flashdeck-domain                │
//! ├─────────────────────────────────────────────┤
//! │  model/       - Principal, Access           │
//! │  gate.rs      - Ownership/visibility gate   │
//! │  validation/  - Field validators            │
//! │  credentials  - Argon2id password hashing   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod credentials;
pub mod error;
pub mod gate;
mod gate_proptest;
pub mod model;
pub mod validation;

// Re-export commonly used types at the crate root
pub use error::{DomainError, DomainResult};
pub use gate::{authorize, ResourceOwnership};
pub use model::{Access, Principal, UserRef};
