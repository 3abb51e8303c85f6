//! Flashcard operations. Every check goes through the parent set.

use std::sync::Arc;

use chrono::Utc;
use flashdeck_domain::validation::require_text;
use flashdeck_domain::{
    authorize, Access, DomainError, DomainResult, Principal, ResourceOwnership,
};
use flashdeck_storage::{DataStore, StoredCard, StoredSet};
use tracing::{info, instrument, warn};

use super::types::{CardView, CreateCardRequest, UpdateCardRequest};
use super::{new_id, storage_error};

/// Handler for card CRUD.
pub struct CardHandler<S: DataStore> {
    storage: Arc<S>,
}

impl<S: DataStore> Clone for CardHandler<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: DataStore> CardHandler<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Adds a card to one of the caller's sets.
    #[instrument(skip(self, request), fields(user_id = principal.user_id()))]
    pub async fn create(
        &self,
        principal: &Principal,
        set_id: &str,
        request: CreateCardRequest,
    ) -> DomainResult<CardView> {
        principal.require_user()?;
        let required = "Both front and back are required";
        let front = require_text("front", request.front.as_deref(), required)?;
        let back = require_text("back", request.back.as_deref(), required)?;

        let (set, access) = self.parent(principal, set_id).await?;
        access.require_write("You can only add flashcards to your own sets")?;

        let card = self
            .storage
            .insert_card(StoredCard {
                id: new_id(),
                set_id: set.id.clone(),
                front,
                back,
                difficulty: request.difficulty,
                times_reviewed: 0,
                last_reviewed: None,
                created_at: Utc::now(),
            })
            .await
            .map_err(storage_error)?;
        self.touch(&set.id).await?;

        info!(card_id = %card.id, set_id = %set.id, "flashcard created");
        Ok(CardView::from(&card))
    }

    /// Lists the cards of a set the caller may read, oldest first.
    #[instrument(skip(self), fields(user_id = principal.user_id()))]
    pub async fn list(&self, principal: &Principal, set_id: &str) -> DomainResult<Vec<CardView>> {
        let (set, access) = self.parent(principal, set_id).await?;
        access.require_read()?;

        let cards = self
            .storage
            .find_cards_by_set(&set.id)
            .await
            .map_err(storage_error)?;
        Ok(cards.iter().map(CardView::from).collect())
    }

    #[instrument(skip(self), fields(user_id = principal.user_id()))]
    pub async fn get(&self, principal: &Principal, card_id: &str) -> DomainResult<CardView> {
        let card = self.storage.get_card(card_id).await.map_err(storage_error)?;
        let (_, access) = self.parent_of(principal, &card).await?;
        access.require_read()?;
        Ok(CardView::from(&card))
    }

    /// Updates a card in one of the caller's sets.
    ///
    /// An explicit `null` difficulty clears it; an absent one leaves it as is.
    #[instrument(skip(self, request), fields(user_id = principal.user_id()))]
    pub async fn update(
        &self,
        principal: &Principal,
        card_id: &str,
        request: UpdateCardRequest,
    ) -> DomainResult<CardView> {
        principal.require_user()?;
        if request.is_empty() {
            return Err(DomainError::validation("request", "No fields provided"));
        }
        let front = match request.front.as_deref() {
            Some(raw) => Some(require_text("front", Some(raw), "Front cannot be empty")?),
            None => None,
        };
        let back = match request.back.as_deref() {
            Some(raw) => Some(require_text("back", Some(raw), "Back cannot be empty")?),
            None => None,
        };

        let mut card = self.storage.get_card(card_id).await.map_err(storage_error)?;
        let (set, access) = self.parent_of(principal, &card).await?;
        access.require_write("You can only update flashcards in your own sets")?;

        if let Some(front) = front {
            card.front = front;
        }
        if let Some(back) = back {
            card.back = back;
        }
        if let Some(difficulty) = request.difficulty {
            card.difficulty = difficulty;
        }

        let card = self.storage.update_card(card).await.map_err(storage_error)?;
        self.touch(&set.id).await?;

        info!(card_id = %card.id, set_id = %set.id, "flashcard updated");
        Ok(CardView::from(&card))
    }

    #[instrument(skip(self), fields(user_id = principal.user_id()))]
    pub async fn delete(&self, principal: &Principal, card_id: &str) -> DomainResult<()> {
        principal.require_user()?;
        let card = self.storage.get_card(card_id).await.map_err(storage_error)?;
        let (set, access) = self.parent_of(principal, &card).await?;
        access.require_write("You can only delete flashcards from your own sets")?;

        self.storage
            .delete_card(&card.id)
            .await
            .map_err(storage_error)?;
        self.touch(&set.id).await?;

        info!(card_id = %card.id, set_id = %set.id, "flashcard deleted");
        Ok(())
    }

    async fn parent(&self, principal: &Principal, set_id: &str) -> DomainResult<(StoredSet, Access)> {
        let set = self.storage.get_set(set_id).await.map_err(storage_error)?;
        let access = authorize(principal, ResourceOwnership::new(&set.owner_id, set.is_public));
        Ok((set, access))
    }

    /// Resolves the set a card belongs to. A card whose set has vanished is
    /// reported as not found.
    async fn parent_of(
        &self,
        principal: &Principal,
        card: &StoredCard,
    ) -> DomainResult<(StoredSet, Access)> {
        match self.parent(principal, &card.set_id).await {
            Err(DomainError::NotFound { .. }) => {
                warn!(card_id = %card.id, set_id = %card.set_id, "flashcard has no parent set");
                Err(DomainError::not_found("flashcard", card.id.clone()))
            }
            other => other,
        }
    }

    async fn touch(&self, set_id: &str) -> DomainResult<()> {
        self.storage
            .touch_set(set_id, Utc::now())
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashdeck_domain::UserRef;
    use flashdeck_storage::{MemoryDataStore, StoredUser};

    struct Fixture {
        storage: Arc<MemoryDataStore>,
        handler: CardHandler<MemoryDataStore>,
        alice: Principal,
        bob: Principal,
    }

    async fn fixture() -> Fixture {
        let storage = MemoryDataStore::new_shared();
        let mut principals = Vec::new();
        for name in ["alice", "bob"] {
            let user = storage
                .insert_user(StoredUser {
                    id: new_id(),
                    username: name.to_string(),
                    email: format!("{name}@example.com"),
                    password_hash: "hash".to_string(),
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
            principals.push(Principal::Authenticated(UserRef::new(user.id, name)));
        }
        let bob = principals.pop().unwrap();
        let alice = principals.pop().unwrap();
        Fixture {
            handler: CardHandler::new(Arc::clone(&storage)),
            storage,
            alice,
            bob,
        }
    }

    async fn insert_set(f: &Fixture, is_public: bool) -> StoredSet {
        let created = Utc::now() - chrono::Duration::minutes(5);
        f.storage
            .insert_set(StoredSet {
                id: new_id(),
                owner_id: f.alice.user_id().unwrap().to_string(),
                title: "Vocabulary".to_string(),
                description: String::new(),
                is_public,
                created_at: created,
                updated_at: created,
            })
            .await
            .unwrap()
    }

    fn card_request(front: &str, back: &str) -> CreateCardRequest {
        CreateCardRequest {
            front: Some(front.to_string()),
            back: Some(back.to_string()),
            difficulty: Some("easy".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_advances_parent_updated_at() {
        let f = fixture().await;
        let set = insert_set(&f, false).await;

        let card = f
            .handler
            .create(&f.alice, &set.id, card_request("hola", "hello"))
            .await
            .unwrap();
        assert_eq!(card.times_reviewed, 0);
        assert_eq!(card.difficulty.as_deref(), Some("easy"));

        let after = f.storage.get_set(&set.id).await.unwrap();
        assert!(after.updated_at > set.updated_at);
    }

    #[tokio::test]
    async fn test_create_validates_before_lookup() {
        let f = fixture().await;
        let err = f
            .handler
            .create(&f.alice, "missing", card_request("hola", " "))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Both front and back are required");
    }

    #[tokio::test]
    async fn test_create_in_foreign_set_is_forbidden() {
        let f = fixture().await;
        let set = insert_set(&f, true).await;

        let err = f
            .handler
            .create(&f.bob, &set.id, card_request("hola", "hello"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "You can only add flashcards to your own sets");

        let err = f
            .handler
            .create(&Principal::Anonymous, &set.id, card_request("hola", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_cards_follow_parent_visibility() {
        let f = fixture().await;
        let private = insert_set(&f, false).await;
        let public = insert_set(&f, true).await;
        let hidden = f
            .handler
            .create(&f.alice, &private.id, card_request("a", "b"))
            .await
            .unwrap();
        let shown = f
            .handler
            .create(&f.alice, &public.id, card_request("c", "d"))
            .await
            .unwrap();

        assert!(matches!(
            f.handler.get(&f.bob, &hidden.id).await,
            Err(DomainError::Forbidden { .. })
        ));
        assert!(matches!(
            f.handler.list(&Principal::Anonymous, &private.id).await,
            Err(DomainError::Forbidden { .. })
        ));
        assert_eq!(f.handler.get(&f.bob, &shown.id).await.unwrap(), shown);
        assert_eq!(
            f.handler
                .list(&Principal::Anonymous, &public.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_sets_and_clears_difficulty() {
        let f = fixture().await;
        let set = insert_set(&f, false).await;
        let card = f
            .handler
            .create(&f.alice, &set.id, card_request("hola", "hello"))
            .await
            .unwrap();

        let updated = f
            .handler
            .update(
                &f.alice,
                &card.id,
                UpdateCardRequest {
                    back: Some("hi".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.back, "hi");
        assert_eq!(updated.difficulty.as_deref(), Some("easy"));

        let cleared = f
            .handler
            .update(
                &f.alice,
                &card.id,
                UpdateCardRequest {
                    difficulty: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.difficulty, None);
        assert_eq!(cleared.front, "hola");
    }

    #[tokio::test]
    async fn test_update_and_delete_by_non_owner_are_forbidden() {
        let f = fixture().await;
        let set = insert_set(&f, true).await;
        let card = f
            .handler
            .create(&f.alice, &set.id, card_request("hola", "hello"))
            .await
            .unwrap();

        let err = f
            .handler
            .update(
                &f.bob,
                &card.id,
                UpdateCardRequest {
                    front: Some("mine".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "You can only update flashcards in your own sets"
        );

        let err = f.handler.delete(&f.bob, &card.id).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "You can only delete flashcards from your own sets"
        );
    }

    #[tokio::test]
    async fn test_delete_removes_card_and_touches_set() {
        let f = fixture().await;
        let set = insert_set(&f, false).await;
        let card = f
            .handler
            .create(&f.alice, &set.id, card_request("hola", "hello"))
            .await
            .unwrap();
        let before = f.storage.get_set(&set.id).await.unwrap().updated_at;

        f.handler.delete(&f.alice, &card.id).await.unwrap();

        assert!(matches!(
            f.handler.get(&f.alice, &card.id).await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(f.storage.get_set(&set.id).await.unwrap().updated_at >= before);
    }

    #[tokio::test]
    async fn test_orphaned_card_is_not_found() {
        let f = fixture().await;
        let set = insert_set(&f, true).await;
        let card = f
            .handler
            .create(&f.alice, &set.id, card_request("hola", "hello"))
            .await
            .unwrap();
        f.storage.delete_set(&set.id).await.unwrap();

        let err = f.handler.get(&f.alice, &card.id).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::NotFound {
                resource: "flashcard",
                ..
            }
        ));
    }
}
