//! flashdeck-server: Request handlers and business logic
//!
//! This crate contains the business logic layer including:
//! - Principal resolution from session keys
//! - Account handler (register, login, logout, profile)
//! - Set handler (CRUD, listing modes, public search)
//! - Card handler (CRUD through the parent set)
//! - Configuration management
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              flashdeck-server                │
//! ├─────────────────────────────────────────────┤
//! │  config.rs   - Configuration management     │
//! │  handlers/   - Request handlers             │
//! │    principal.rs - Session -> Principal      │
//! │    accounts.rs  - Registration and login    │
//! │    sets.rs      - Flashcard sets            │
//! │    cards.rs     - Flashcards                │
//! │    types.rs     - Requests and views        │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod handlers;

// Re-exports for convenience
pub use config::{ConfigLoadError, ServerConfig};
pub use handlers::{AccountHandler, CardHandler, PrincipalResolver, SetHandler};
