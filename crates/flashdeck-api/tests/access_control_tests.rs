//! Ownership and visibility checks across every set and card route.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

struct Fixture {
    app: TestApp,
    owner: String,
    stranger: String,
    public_set: String,
    private_set: String,
    public_card: String,
    private_card: String,
}

async fn fixture() -> Fixture {
    let app = TestApp::new();
    let owner = app.register("owner").await;
    let stranger = app.register("stranger").await;
    let public_set = app.create_set(&owner, "Shared deck", true).await;
    let private_set = app.create_set(&owner, "Hidden deck", false).await;
    let public_card = app.create_card(&owner, &public_set, "pub-q", "pub-a").await;
    let private_card = app.create_card(&owner, &private_set, "priv-q", "priv-a").await;

    Fixture {
        app,
        owner,
        stranger,
        public_set,
        private_set,
        public_card,
        private_card,
    }
}

#[tokio::test]
async fn test_public_content_is_readable_by_anyone() {
    let f = fixture().await;

    for cookie in [None, Some(f.stranger.as_str()), Some(f.owner.as_str())] {
        let (status, _) = f.app.get(&format!("/sets/{}", f.public_set), cookie).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = f
            .app
            .get(&format!("/cards/set/{}", f.public_set), cookie)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["flashcards"].as_array().unwrap().len(), 1);

        let (status, body) = f.app.get(&format!("/cards/{}", f.public_card), cookie).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["flashcard"]["front"], "pub-q");
    }
}

#[tokio::test]
async fn test_private_content_is_hidden_from_everyone_but_the_owner() {
    let f = fixture().await;

    for cookie in [None, Some(f.stranger.as_str())] {
        let (status, body) = f.app.get(&format!("/sets/{}", f.private_set), cookie).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Access denied");

        let (status, _) = f
            .app
            .get(&format!("/cards/set/{}", f.private_set), cookie)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = f.app.get(&format!("/cards/{}", f.private_card), cookie).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, _) = f
        .app
        .get(&format!("/cards/{}", f.private_card), Some(&f.owner))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_strangers_cannot_modify_even_public_sets() {
    let f = fixture().await;
    let stranger = Some(f.stranger.as_str());

    let (status, body) = f
        .app
        .delete(&format!("/sets/{}", f.public_set), stranger)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You can only delete your own flashcard sets");

    let (status, body) = f
        .app
        .post(
            &format!("/cards/set/{}", f.public_set),
            stranger,
            json!({ "front": "x", "back": "y" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You can only add flashcards to your own sets");

    let (status, body) = f
        .app
        .put(
            &format!("/cards/{}", f.public_card),
            stranger,
            json!({ "front": "hijacked" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You can only update flashcards in your own sets");

    let (status, body) = f
        .app
        .delete(&format!("/cards/{}", f.public_card), stranger)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You can only delete flashcards from your own sets");

    // Nothing changed
    let (_, body) = f.app.get(&format!("/sets/{}", f.public_set), None).await;
    let cards = body["flashcards"].as_array().unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0]["front"], "pub-q");
}

#[tokio::test]
async fn test_anonymous_writes_require_authentication() {
    let f = fixture().await;

    let (status, _) = f
        .app
        .put(&format!("/sets/{}", f.public_set), None, json!({ "title": "x" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = f.app.delete(&format!("/sets/{}", f.public_set), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = f
        .app
        .post(
            &format!("/cards/set/{}", f.public_set),
            None,
            json!({ "front": "x", "back": "y" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = f.app.delete(&format!("/cards/{}", f.public_card), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_owner_can_change_visibility() {
    let f = fixture().await;

    let (status, body) = f
        .app
        .put(
            &format!("/sets/{}", f.private_set),
            Some(&f.owner),
            json!({ "is_public": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["set"]["is_public"], true);
    assert_eq!(body["set"]["title"], "Hidden deck");

    let (status, _) = f
        .app
        .get(&format!("/sets/{}", f.private_set), Some(&f.stranger))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_resources_are_not_found_before_access_checks() {
    let f = fixture().await;
    let missing = "01J00000000000000000000000";

    let (status, body) = f
        .app
        .delete(&format!("/sets/{missing}"), Some(&f.stranger))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Flashcard set not found");

    let (status, body) = f.app.get(&format!("/cards/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Flashcard not found");
}

#[tokio::test]
async fn test_stale_session_after_logout_is_anonymous() {
    let f = fixture().await;

    let (status, _) = f.app.post("/auth/logout", Some(&f.owner), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = f
        .app
        .get(&format!("/sets/{}", f.private_set), Some(&f.owner))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
