//! Application state for HTTP handlers.

use std::sync::Arc;
use std::time::Duration;

use flashdeck_server::config::{ListingSettings, ServerConfig, SessionSettings};
use flashdeck_server::{AccountHandler, CardHandler, PrincipalResolver, SetHandler};
use flashdeck_storage::{DataStore, MemorySessionStore, SessionStore};

/// Application state shared across all HTTP handlers.
///
/// Holds the storage backend, the session store and one handler per
/// resource. The handlers share the same `Arc<S>`.
pub struct AppState<S: DataStore> {
    /// The storage backend.
    pub storage: Arc<S>,
    /// Resolves session keys to principals.
    pub resolver: PrincipalResolver<S>,
    pub accounts: AccountHandler<S>,
    pub sets: SetHandler<S>,
    pub cards: CardHandler<S>,
    /// Cookie name, lifetime and flags.
    pub session: SessionSettings,
}

impl<S: DataStore> AppState<S> {
    /// Creates state with an in-memory session store and default settings.
    pub fn new(storage: Arc<S>) -> Self {
        let session = SessionSettings::default();
        let sessions = MemorySessionStore::new_shared(Duration::from_secs(session.ttl_secs));
        Self::with_settings(storage, sessions, session, ListingSettings::default())
    }

    /// Creates state from a loaded configuration.
    pub fn from_config(storage: Arc<S>, sessions: Arc<dyn SessionStore>, config: &ServerConfig) -> Self {
        Self::with_settings(storage, sessions, config.session.clone(), config.listing)
    }

    pub fn with_settings(
        storage: Arc<S>,
        sessions: Arc<dyn SessionStore>,
        session: SessionSettings,
        listing: ListingSettings,
    ) -> Self {
        Self {
            resolver: PrincipalResolver::new(Arc::clone(&storage), Arc::clone(&sessions)),
            accounts: AccountHandler::new(Arc::clone(&storage), sessions),
            sets: SetHandler::new(Arc::clone(&storage), listing),
            cards: CardHandler::new(Arc::clone(&storage)),
            storage,
            session,
        }
    }
}
