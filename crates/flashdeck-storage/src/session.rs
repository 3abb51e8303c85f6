//! Server-side session records.
//!
//! A session maps an opaque, randomly generated key to a user id. The key is
//! the only thing handed to the client.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::StorageResult;

/// Storage for login sessions.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Creates a session for `user_id` and returns its key.
    async fn create(&self, user_id: &str) -> StorageResult<String>;

    /// Returns the user id bound to `key`, or `None` if the key is unknown or
    /// expired.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Removes a session. Removing an unknown key is not an error.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

#[derive(Debug, Clone)]
struct SessionRecord {
    user_id: String,
    created: Instant,
}

/// In-memory session store with a fixed time-to-live.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionRecord>,
    ttl: Duration,
}

impl MemorySessionStore {
    /// Creates a store whose sessions expire `ttl` after creation.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Creates a new session store wrapped in Arc.
    pub fn new_shared(ttl: Duration) -> Arc<Self> {
        Arc::new(Self::new(ttl))
    }

    /// Drops every expired session and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions.retain(|_, record| record.created.elapsed() < ttl);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            debug!(removed, "purged expired sessions");
        }
        removed
    }

    /// Sessions held, including expired ones not yet purged.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user_id: &str) -> StorageResult<String> {
        let key = Uuid::new_v4().to_string();
        self.sessions.insert(
            key.clone(),
            SessionRecord {
                user_id: user_id.to_string(),
                created: Instant::now(),
            },
        );
        Ok(key)
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let expired = match self.sessions.get(key) {
            None => return Ok(None),
            Some(record) if record.created.elapsed() < self.ttl => {
                return Ok(Some(record.user_id.clone()));
            }
            Some(_) => true,
        };
        if expired {
            self.sessions.remove(key);
        }
        Ok(None)
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.sessions.remove(key);
        Ok(())
    }
}
