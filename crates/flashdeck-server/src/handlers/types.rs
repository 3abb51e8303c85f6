//! Request inputs and serializable views for the CRUD handlers.
//!
//! Request fields are `Option`s so that a missing field becomes a domain
//! validation error with a readable message instead of a deserializer error.

use chrono::{DateTime, Utc};
use flashdeck_storage::{StoredCard, StoredSet, StoredUser};
use serde::{Deserialize, Deserializer, Serialize};

// Requests

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login request. `username` may also hold an email address.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSetRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSetRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

impl UpdateSetRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.is_public.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCardRequest {
    pub front: Option<String>,
    pub back: Option<String>,
    pub difficulty: Option<String>,
}

/// Card update. `difficulty` distinguishes "absent" (`None`) from an explicit
/// `null` (`Some(None)`), which clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCardRequest {
    pub front: Option<String>,
    pub back: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub difficulty: Option<Option<String>>,
}

impl UpdateCardRequest {
    pub fn is_empty(&self) -> bool {
        self.front.is_none() && self.back.is_none() && self.difficulty.is_none()
    }
}

fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Query parameters of `GET /sets`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListSetsQuery {
    pub user_id: Option<String>,
    /// Any casing of `true` turns it on; every other value is off.
    pub public_only: Option<String>,
    pub limit: Option<usize>,
}

impl ListSetsQuery {
    pub fn wants_public_only(&self) -> bool {
        self.public_only
            .as_deref()
            .is_some_and(|flag| flag.trim().eq_ignore_ascii_case("true"))
    }

    /// The `user_id` filter, ignoring a blank value.
    pub fn target_user(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// Query parameters of `GET /sets/search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

// Views

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<&StoredUser> for UserView {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&StoredUser> for ProfileView {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// Result of `GET /auth/check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserView>,
}

/// A user together with the session key issued for them.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub user: UserView,
    pub session_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub user_id: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StoredSet> for SetView {
    fn from(set: &StoredSet) -> Self {
        Self {
            id: set.id.clone(),
            title: set.title.clone(),
            description: set.description.clone(),
            user_id: set.owner_id.clone(),
            is_public: set.is_public,
            created_at: set.created_at,
            updated_at: set.updated_at,
        }
    }
}

/// One of the caller's own sets, with its card count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedSetView {
    #[serde(flatten)]
    pub set: SetView,
    pub card_count: u64,
}

/// A search hit with the owner's username (absent if the owner is gone).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub set: SetView,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub sets: Vec<SearchHit>,
    pub count: usize,
}

/// A set as seen by a particular caller, with its cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetDetail {
    pub set: SetWithOwnership,
    pub flashcards: Vec<CardView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetWithOwnership {
    #[serde(flatten)]
    pub set: SetView,
    pub is_owner: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub id: String,
    pub set_id: String,
    pub front: String,
    pub back: String,
    pub difficulty: Option<String>,
    pub times_reviewed: u32,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&StoredCard> for CardView {
    fn from(card: &StoredCard) -> Self {
        Self {
            id: card.id.clone(),
            set_id: card.set_id.clone(),
            front: card.front.clone(),
            back: card.back.clone(),
            difficulty: card.difficulty.clone(),
            times_reviewed: card.times_reviewed,
            last_reviewed: card.last_reviewed,
            created_at: card.created_at,
        }
    }
}
