//! In-memory storage implementation.
//!
//! Used for tests and single-process deployments. Every collection is a
//! `DashMap` keyed by document id; username and email uniqueness is kept in
//! two secondary index maps updated through the entry API.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::instrument;

use crate::error::{HealthStatus, StorageError, StorageResult};
use crate::traits::{
    sort_cards_oldest_first, sort_sets_newest_first, validate_card, validate_id, validate_set,
    DataStore, SetFilter, StoredCard, StoredSet, StoredUser,
};

/// In-memory implementation of DataStore.
///
/// # Performance Characteristics
///
/// - **Get by id**: O(1) average (DashMap lookup)
/// - **User lookup by username/email**: O(1) average (secondary index)
/// - **Set listing / search**: O(N) over all sets (linear scan + sort)
/// - **Cards of a set**: O(N) over all cards
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    users: DashMap<String, StoredUser>,
    /// username -> user id
    usernames: DashMap<String, String>,
    /// lower-cased email -> user id
    emails: DashMap<String, String>,
    sets: DashMap<String, StoredSet>,
    cards: DashMap<String, StoredCard>,
}

impl MemoryDataStore {
    /// Creates a new in-memory data store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory data store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert_user(&self, mut user: StoredUser) -> StorageResult<StoredUser> {
        validate_id("users", &user.id)?;
        user.email = user.email.to_lowercase();

        if self.users.contains_key(&user.id) {
            return Err(StorageError::DuplicateId {
                collection: "users",
                id: user.id,
            });
        }

        // Claim the username first, then the email; release the username if
        // the email turns out to be taken.
        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => {
                return Err(StorageError::DuplicateUser {
                    field: "username",
                    value: user.username,
                });
            }
            Entry::Vacant(entry) => {
                entry.insert(user.id.clone());
            }
        }

        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                self.usernames.remove(&user.username);
                return Err(StorageError::DuplicateUser {
                    field: "email",
                    value: user.email,
                });
            }
            Entry::Vacant(entry) => {
                entry.insert(user.id.clone());
            }
        }

        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> StorageResult<StoredUser> {
        self.users
            .get(id)
            .map(|u| u.value().clone())
            .ok_or_else(|| StorageError::UserNotFound {
                user_id: id.to_string(),
            })
    }

    async fn find_user_by_username(&self, username: &str) -> StorageResult<Option<StoredUser>> {
        let Some(id) = self.usernames.get(username).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        let key = email.to_lowercase();
        let Some(id) = self.emails.get(&key).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    #[instrument(skip(self, set), fields(set_id = %set.id))]
    async fn insert_set(&self, set: StoredSet) -> StorageResult<StoredSet> {
        validate_set(&set)?;
        match self.sets.entry(set.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::DuplicateId {
                collection: "flashcard_sets",
                id: set.id,
            }),
            Entry::Vacant(entry) => {
                entry.insert(set.clone());
                Ok(set)
            }
        }
    }

    async fn get_set(&self, id: &str) -> StorageResult<StoredSet> {
        self.sets
            .get(id)
            .map(|s| s.value().clone())
            .ok_or_else(|| StorageError::SetNotFound {
                set_id: id.to_string(),
            })
    }

    async fn find_sets(
        &self,
        filter: &SetFilter,
        limit: Option<usize>,
    ) -> StorageResult<Vec<StoredSet>> {
        let mut sets: Vec<StoredSet> = self
            .sets
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        sort_sets_newest_first(&mut sets);
        if let Some(limit) = limit {
            sets.truncate(limit);
        }
        Ok(sets)
    }

    async fn update_set(&self, set: StoredSet) -> StorageResult<StoredSet> {
        validate_set(&set)?;
        match self.sets.get_mut(&set.id) {
            Some(mut existing) => {
                *existing = set.clone();
                Ok(set)
            }
            None => Err(StorageError::SetNotFound { set_id: set.id }),
        }
    }

    async fn touch_set(&self, id: &str, at: DateTime<Utc>) -> StorageResult<StoredSet> {
        let mut entry = self
            .sets
            .get_mut(id)
            .ok_or_else(|| StorageError::SetNotFound {
                set_id: id.to_string(),
            })?;
        if at > entry.updated_at {
            entry.updated_at = at;
        }
        Ok(entry.value().clone())
    }

    async fn delete_set(&self, id: &str) -> StorageResult<()> {
        if self.sets.remove(id).is_none() {
            return Err(StorageError::SetNotFound {
                set_id: id.to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self, card), fields(card_id = %card.id, set_id = %card.set_id))]
    async fn insert_card(&self, card: StoredCard) -> StorageResult<StoredCard> {
        validate_card(&card)?;
        match self.cards.entry(card.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::DuplicateId {
                collection: "flashcards",
                id: card.id,
            }),
            Entry::Vacant(entry) => {
                entry.insert(card.clone());
                Ok(card)
            }
        }
    }

    async fn get_card(&self, id: &str) -> StorageResult<StoredCard> {
        self.cards
            .get(id)
            .map(|c| c.value().clone())
            .ok_or_else(|| StorageError::CardNotFound {
                card_id: id.to_string(),
            })
    }

    async fn find_cards_by_set(&self, set_id: &str) -> StorageResult<Vec<StoredCard>> {
        let mut cards: Vec<StoredCard> = self
            .cards
            .iter()
            .filter(|entry| entry.value().set_id == set_id)
            .map(|entry| entry.value().clone())
            .collect();
        sort_cards_oldest_first(&mut cards);
        Ok(cards)
    }

    async fn count_cards_by_set(&self, set_id: &str) -> StorageResult<u64> {
        Ok(self
            .cards
            .iter()
            .filter(|entry| entry.value().set_id == set_id)
            .count() as u64)
    }

    async fn update_card(&self, card: StoredCard) -> StorageResult<StoredCard> {
        validate_card(&card)?;
        match self.cards.get_mut(&card.id) {
            Some(mut existing) => {
                *existing = card.clone();
                Ok(card)
            }
            None => Err(StorageError::CardNotFound { card_id: card.id }),
        }
    }

    async fn delete_card(&self, id: &str) -> StorageResult<()> {
        if self.cards.remove(id).is_none() {
            return Err(StorageError::CardNotFound {
                card_id: id.to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self), fields(set_id = %set_id))]
    async fn delete_cards_by_set(&self, set_id: &str) -> StorageResult<u64> {
        let before = self.cards.len();
        self.cards.retain(|_, card| card.set_id != set_id);
        Ok(before.saturating_sub(self.cards.len()) as u64)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let start = Instant::now();
        Ok(HealthStatus {
            healthy: true,
            latency: start.elapsed(),
            message: Some("in-memory storage".to_string()),
        })
    }
}
