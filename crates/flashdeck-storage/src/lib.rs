//! flashdeck-storage: Storage abstraction layer
//!
//! This crate provides the storage abstraction for Flashdeck, including:
//! - DataStore trait for users, flashcard sets and flashcards
//! - In-memory implementation for tests and single-process deployments
//! - PostgreSQL implementation for production
//! - SessionStore trait and an in-memory session store
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             flashdeck-storage                │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - DataStore trait + documents  │
//! │  memory.rs   - In-memory implementation     │
//! │  postgres.rs - PostgreSQL implementation    │
//! │  session.rs  - Server-side session records  │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod postgres;
pub mod session;
pub mod traits;

// Re-export commonly used types
pub use error::{HealthStatus, StorageError, StorageResult};
pub use memory::MemoryDataStore;
pub use postgres::{PostgresConfig, PostgresDataStore};
pub use session::{MemorySessionStore, SessionStore};
pub use traits::{DataStore, SetFilter, StoredCard, StoredSet, StoredUser};
