//! Flashcard set operations.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use flashdeck_domain::validation::require_text;
use flashdeck_domain::{authorize, DomainError, DomainResult, Principal, ResourceOwnership};
use flashdeck_storage::{DataStore, SetFilter, StoredSet};
use tracing::{debug, info, instrument};

use super::types::{
    CardView, CreateSetRequest, ListSetsQuery, OwnedSetView, SearchHit, SearchQuery,
    SearchResults, SetDetail, SetView, SetWithOwnership, UpdateSetRequest,
};
use super::{new_id, now_not_before, storage_error};
use crate::config::ListingSettings;

/// Handler for set CRUD, listing and search.
pub struct SetHandler<S: DataStore> {
    storage: Arc<S>,
    listing: ListingSettings,
}

impl<S: DataStore> Clone for SetHandler<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            listing: self.listing,
        }
    }
}

impl<S: DataStore> SetHandler<S> {
    pub fn new(storage: Arc<S>, listing: ListingSettings) -> Self {
        Self { storage, listing }
    }

    /// Creates a set owned by the caller.
    #[instrument(skip(self, request), fields(user_id = principal.user_id()))]
    pub async fn create(
        &self,
        principal: &Principal,
        request: CreateSetRequest,
    ) -> DomainResult<SetView> {
        let owner = principal.require_user()?;
        let title = require_text("title", request.title.as_deref(), "Title is required")?;

        let now = Utc::now();
        let set = self
            .storage
            .insert_set(StoredSet {
                id: new_id(),
                owner_id: owner.id.clone(),
                title,
                description: request.description.unwrap_or_default(),
                is_public: request.is_public.unwrap_or(false),
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(storage_error)?;

        info!(set_id = %set.id, owner_id = %set.owner_id, is_public = set.is_public, "flashcard set created");
        Ok(SetView::from(&set))
    }

    /// Lists sets.
    ///
    /// 1. With a non-blank `user_id`: that user's sets, public ones only unless the
    ///    caller is that user.
    /// 2. With `public_only` or an anonymous caller: a bounded page of
    ///    public sets.
    /// 3. Otherwise: every set the caller owns.
    #[instrument(skip(self, query), fields(user_id = principal.user_id()))]
    pub async fn list(
        &self,
        principal: &Principal,
        query: ListSetsQuery,
    ) -> DomainResult<Vec<SetView>> {
        let (filter, limit) = match (query.target_user(), principal.user_id()) {
            (Some(target), caller) => {
                let own = caller == Some(target);
                let mut filter = SetFilter::owned_by(target);
                if !own {
                    filter.is_public = Some(true);
                }
                (filter, None)
            }
            (None, None) => (SetFilter::public(), Some(self.page_size(query.limit)?)),
            (None, Some(_)) if query.wants_public_only() => {
                (SetFilter::public(), Some(self.page_size(query.limit)?))
            }
            (None, Some(caller)) => (SetFilter::owned_by(caller), None),
        };

        let sets = self
            .storage
            .find_sets(&filter, limit)
            .await
            .map_err(storage_error)?;
        debug!(count = sets.len(), "listed flashcard sets");
        Ok(sets.iter().map(SetView::from).collect())
    }

    /// The caller's own sets, each with its card count.
    #[instrument(skip(self), fields(user_id = principal.user_id()))]
    pub async fn my_sets(&self, principal: &Principal) -> DomainResult<Vec<OwnedSetView>> {
        let owner = principal.require_user()?;
        let sets = self
            .storage
            .find_sets(&SetFilter::owned_by(owner.id.clone()), None)
            .await
            .map_err(storage_error)?;

        let mut views = Vec::with_capacity(sets.len());
        for set in &sets {
            let card_count = self
                .storage
                .count_cards_by_set(&set.id)
                .await
                .map_err(storage_error)?;
            views.push(OwnedSetView {
                set: SetView::from(set),
                card_count,
            });
        }
        Ok(views)
    }

    /// Case-insensitive title search over public sets.
    ///
    /// The caller's identity does not widen the result: private sets are
    /// never returned, not even to their owner.
    #[instrument(skip(self, query))]
    pub async fn search(&self, query: SearchQuery) -> DomainResult<SearchResults> {
        let q = query.q.as_deref().map(str::trim).unwrap_or_default();
        if q.is_empty() {
            return Err(DomainError::validation("q", "Search query is required"));
        }
        let limit = match query.limit {
            Some(0) => return Err(DomainError::validation("limit", "Limit must be positive")),
            Some(n) => n.min(self.listing.max_page_size),
            None => self.listing.search_limit,
        };

        let filter = SetFilter::public().with_title_containing(q);
        let sets = self
            .storage
            .find_sets(&filter, Some(limit))
            .await
            .map_err(storage_error)?;

        let mut usernames: HashMap<String, Option<String>> = HashMap::new();
        let mut hits = Vec::with_capacity(sets.len());
        for set in &sets {
            let username = match usernames.get(&set.owner_id) {
                Some(cached) => cached.clone(),
                None => {
                    let found = match self.storage.get_user(&set.owner_id).await {
                        Ok(user) => Some(user.username),
                        Err(e) if e.is_not_found() => None,
                        Err(e) => return Err(storage_error(e)),
                    };
                    usernames.insert(set.owner_id.clone(), found.clone());
                    found
                }
            };
            hits.push(SearchHit {
                set: SetView::from(set),
                username,
            });
        }

        Ok(SearchResults {
            query: q.to_string(),
            count: hits.len(),
            sets: hits,
        })
    }

    /// Fetches a set with its cards, if the caller may read it.
    #[instrument(skip(self), fields(user_id = principal.user_id()))]
    pub async fn get(&self, principal: &Principal, set_id: &str) -> DomainResult<SetDetail> {
        let set = self.storage.get_set(set_id).await.map_err(storage_error)?;
        authorize(principal, ResourceOwnership::new(&set.owner_id, set.is_public))
            .require_read()?;

        let cards = self
            .storage
            .find_cards_by_set(&set.id)
            .await
            .map_err(storage_error)?;
        let is_owner = principal.user_id() == Some(set.owner_id.as_str());

        Ok(SetDetail {
            set: SetWithOwnership {
                set: SetView::from(&set),
                is_owner,
            },
            flashcards: cards.iter().map(CardView::from).collect(),
        })
    }

    /// Updates title, description or visibility of one of the caller's sets.
    #[instrument(skip(self, request), fields(user_id = principal.user_id()))]
    pub async fn update(
        &self,
        principal: &Principal,
        set_id: &str,
        request: UpdateSetRequest,
    ) -> DomainResult<SetView> {
        principal.require_user()?;
        if request.is_empty() {
            return Err(DomainError::validation("request", "No fields provided"));
        }
        let title = match request.title.as_deref() {
            Some(raw) => Some(require_text("title", Some(raw), "Title cannot be empty")?),
            None => None,
        };

        let mut set = self.storage.get_set(set_id).await.map_err(storage_error)?;
        authorize(principal, ResourceOwnership::new(&set.owner_id, set.is_public))
            .require_write("You can only update your own flashcard sets")?;

        if let Some(title) = title {
            set.title = title;
        }
        if let Some(description) = request.description {
            set.description = description;
        }
        if let Some(is_public) = request.is_public {
            set.is_public = is_public;
        }
        set.updated_at = now_not_before(set.updated_at);

        let set = self.storage.update_set(set).await.map_err(storage_error)?;
        info!(set_id = %set.id, is_public = set.is_public, "flashcard set updated");
        Ok(SetView::from(&set))
    }

    /// Deletes one of the caller's sets together with its cards.
    ///
    /// Cards go first, then the set. The two steps are not atomic; a failure
    /// in between leaves an empty set behind.
    #[instrument(skip(self), fields(user_id = principal.user_id()))]
    pub async fn delete(&self, principal: &Principal, set_id: &str) -> DomainResult<()> {
        principal.require_user()?;
        let set = self.storage.get_set(set_id).await.map_err(storage_error)?;
        authorize(principal, ResourceOwnership::new(&set.owner_id, set.is_public))
            .require_write("You can only delete your own flashcard sets")?;

        let removed_cards = self
            .storage
            .delete_cards_by_set(&set.id)
            .await
            .map_err(storage_error)?;
        self.storage.delete_set(&set.id).await.map_err(storage_error)?;

        info!(set_id = %set.id, removed_cards, "flashcard set deleted");
        Ok(())
    }

    fn page_size(&self, requested: Option<usize>) -> DomainResult<usize> {
        match requested {
            Some(0) => Err(DomainError::validation("limit", "Limit must be positive")),
            Some(n) => Ok(n.min(self.listing.max_page_size)),
            None => Ok(self.listing.default_page_size),
        }
    }
}
