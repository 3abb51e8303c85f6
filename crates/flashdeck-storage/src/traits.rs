//! DataStore trait definition and document types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{HealthStatus, StorageError, StorageResult};

/// Maximum length for document ids.
const MAX_ID_LENGTH: usize = 64;

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub id: String,
    pub username: String,
    /// Lower-case-folded email address.
    pub email: String,
    /// PHC-format password hash. Never a plaintext password.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A stored flashcard set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSet {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored flashcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCard {
    pub id: String,
    pub set_id: String,
    pub front: String,
    pub back: String,
    pub difficulty: Option<String>,
    pub times_reviewed: u32,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Filter for querying flashcard sets.
///
/// All present fields must match (logical AND).
#[derive(Debug, Clone, Default)]
pub struct SetFilter {
    /// Only sets owned by this user.
    pub owner_id: Option<String>,
    /// Only sets with this visibility.
    pub is_public: Option<bool>,
    /// Case-insensitive substring match on the title.
    pub title_contains: Option<String>,
}

impl SetFilter {
    /// Filter for every set owned by `owner_id`.
    pub fn owned_by(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            ..Default::default()
        }
    }

    /// Filter for public sets only.
    pub fn public() -> Self {
        Self {
            is_public: Some(true),
            ..Default::default()
        }
    }

    /// Adds a case-insensitive title substring to the filter.
    pub fn with_title_containing(mut self, query: impl Into<String>) -> Self {
        self.title_contains = Some(query.into());
        self
    }

    /// Returns true if the set satisfies every predicate of this filter.
    pub fn matches(&self, set: &StoredSet) -> bool {
        self.owner_id.as_ref().map_or(true, |o| &set.owner_id == o)
            && self.is_public.map_or(true, |p| set.is_public == p)
            && self.title_contains.as_ref().map_or(true, |q| {
                set.title.to_lowercase().contains(&q.to_lowercase())
            })
    }
}

/// Abstract document storage for users, flashcard sets and flashcards.
///
/// Ids are generated by the caller and are immutable. `insert_*` fails on an
/// existing id and `update_*` fails on a missing one; there is no upsert.
///
/// Implementations must be thread-safe (Send + Sync) and support
/// async operations.
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    // User operations

    /// Inserts a new user. Fails with `DuplicateUser` if the username or
    /// email is already taken.
    async fn insert_user(&self, user: StoredUser) -> StorageResult<StoredUser>;

    /// Gets a user by id.
    async fn get_user(&self, id: &str) -> StorageResult<StoredUser>;

    /// Finds a user by exact username.
    async fn find_user_by_username(&self, username: &str) -> StorageResult<Option<StoredUser>>;

    /// Finds a user by email. The lookup is case-insensitive.
    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>>;

    // Set operations

    /// Inserts a new flashcard set.
    async fn insert_set(&self, set: StoredSet) -> StorageResult<StoredSet>;

    /// Gets a flashcard set by id.
    async fn get_set(&self, id: &str) -> StorageResult<StoredSet>;

    /// Lists sets matching the filter, newest first (`created_at DESC, id DESC`).
    ///
    /// `limit` bounds the number of results; `None` returns every match.
    async fn find_sets(
        &self,
        filter: &SetFilter,
        limit: Option<usize>,
    ) -> StorageResult<Vec<StoredSet>>;

    /// Replaces an existing set document.
    async fn update_set(&self, set: StoredSet) -> StorageResult<StoredSet>;

    /// Advances `updated_at` of a set to `at`. Never moves it backwards.
    async fn touch_set(&self, id: &str, at: DateTime<Utc>) -> StorageResult<StoredSet>;

    /// Deletes a set document. Does not touch its cards.
    async fn delete_set(&self, id: &str) -> StorageResult<()>;

    // Card operations

    /// Inserts a new flashcard.
    async fn insert_card(&self, card: StoredCard) -> StorageResult<StoredCard>;

    /// Gets a flashcard by id.
    async fn get_card(&self, id: &str) -> StorageResult<StoredCard>;

    /// Lists the cards of a set, oldest first (`created_at ASC, id ASC`).
    async fn find_cards_by_set(&self, set_id: &str) -> StorageResult<Vec<StoredCard>>;

    /// Counts the cards of a set.
    async fn count_cards_by_set(&self, set_id: &str) -> StorageResult<u64> {
        Ok(self.find_cards_by_set(set_id).await?.len() as u64)
    }

    /// Replaces an existing card document.
    async fn update_card(&self, card: StoredCard) -> StorageResult<StoredCard>;

    /// Deletes a card document.
    async fn delete_card(&self, id: &str) -> StorageResult<()>;

    /// Deletes every card belonging to `set_id` and returns how many were removed.
    async fn delete_cards_by_set(&self, set_id: &str) -> StorageResult<u64>;

    // Health

    /// Performs a health check on the storage backend.
    async fn health_check(&self) -> StorageResult<HealthStatus>;
}

/// Validates a document id.
///
/// Ids must be non-empty, at most 64 characters, and contain only ASCII
/// alphanumerics, `-` or `_`.
pub fn validate_id(collection: &str, id: &str) -> StorageResult<()> {
    if id.is_empty() {
        return Err(StorageError::InvalidInput {
            message: format!("{collection} id cannot be empty"),
        });
    }
    if id.len() > MAX_ID_LENGTH {
        return Err(StorageError::InvalidInput {
            message: format!("{collection} id exceeds maximum length of {MAX_ID_LENGTH}"),
        });
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StorageError::InvalidInput {
            message: format!("{collection} id contains invalid characters"),
        });
    }
    Ok(())
}

/// Validates a set document before it is written.
pub fn validate_set(set: &StoredSet) -> StorageResult<()> {
    validate_id("flashcard_sets", &set.id)?;
    validate_id("users", &set.owner_id)?;
    if set.updated_at < set.created_at {
        return Err(StorageError::InvalidInput {
            message: "updated_at cannot precede created_at".to_string(),
        });
    }
    Ok(())
}

/// Validates a card document before it is written.
pub fn validate_card(card: &StoredCard) -> StorageResult<()> {
    validate_id("flashcards", &card.id)?;
    validate_id("flashcard_sets", &card.set_id)
}

/// Sorts sets newest-first (created_at DESC, id DESC).
pub(crate) fn sort_sets_newest_first(sets: &mut [StoredSet]) {
    sets.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Sorts cards oldest-first (created_at ASC, id ASC).
pub(crate) fn sort_cards_oldest_first(cards: &mut [StoredCard]) {
    cards.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
