//! End-to-end flows through the HTTP router over in-memory storage.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use flashdeck_storage::DataStore;

use common::{TestApp, TEST_PASSWORD};

#[tokio::test]
async fn test_owner_sees_private_set_and_anonymous_is_denied() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let set_id = app.create_set(&alice, "Private verbs", false).await;

    let (status, body) = app.get(&format!("/sets/{set_id}"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");

    let (status, body) = app.get(&format!("/sets/{set_id}"), Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["set"]["id"], set_id);
    assert_eq!(body["set"]["is_owner"], true);
    assert_eq!(body["flashcards"], json!([]));
}

#[tokio::test]
async fn test_public_set_readable_but_not_writable_by_others() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let set_id = app.create_set(&alice, "Capitals", true).await;
    app.create_card(&alice, &set_id, "France", "Paris").await;
    app.create_card(&alice, &set_id, "Japan", "Tokyo").await;

    let (status, body) = app.get(&format!("/sets/{set_id}"), Some(&bob)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["set"]["is_owner"], false);
    let cards = body["flashcards"].as_array().unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0]["front"], "France");
    assert_eq!(cards[1]["front"], "Japan");

    let (status, body) = app
        .put(&format!("/sets/{set_id}"), Some(&bob), json!({ "title": "Mine now" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You can only update your own flashcard sets");

    let (_, body) = app.get(&format!("/sets/{set_id}"), None).await;
    assert_eq!(body["set"]["title"], "Capitals");
}

#[tokio::test]
async fn test_delete_set_cascades_to_its_cards_only() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    let doomed = app.create_set(&alice, "Doomed", false).await;
    let kept = app.create_set(&alice, "Kept", false).await;
    let doomed_card = app.create_card(&alice, &doomed, "a", "1").await;
    app.create_card(&alice, &doomed, "b", "2").await;
    app.create_card(&alice, &doomed, "c", "3").await;
    app.create_card(&alice, &kept, "d", "4").await;

    let (status, body) = app.delete(&format!("/sets/{doomed}"), Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Flashcard set deleted successfully");

    let (status, _) = app.get(&format!("/sets/{doomed}"), Some(&alice)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/cards/set/{doomed}"), Some(&alice)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/cards/{doomed_card}"), Some(&alice)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(app.storage.find_cards_by_set(&doomed).await.unwrap().is_empty());
    assert_eq!(app.storage.count_cards_by_set(&kept).await.unwrap(), 1);
}

#[tokio::test]
async fn test_card_mutations_advance_parent_updated_at() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let set_id = app.create_set(&alice, "Chemistry", false).await;

    let before = app.storage.get_set(&set_id).await.unwrap().updated_at;
    let card_id = app.create_card(&alice, &set_id, "H", "Hydrogen").await;
    let after_create = app.storage.get_set(&set_id).await.unwrap().updated_at;
    assert!(after_create >= before);

    let (status, body) = app
        .put(
            &format!("/cards/{card_id}"),
            Some(&alice),
            json!({ "back": "Hydrogen (1)", "difficulty": "easy" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flashcard"]["back"], "Hydrogen (1)");
    assert_eq!(body["flashcard"]["difficulty"], "easy");
    let after_update = app.storage.get_set(&set_id).await.unwrap().updated_at;
    assert!(after_update >= after_create);

    let (status, body) = app
        .put(&format!("/cards/{card_id}"), Some(&alice), json!({ "difficulty": null }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["flashcard"]["difficulty"].is_null());

    let (status, _) = app.delete(&format!("/cards/{card_id}"), Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let after_delete = app.storage.get_set(&set_id).await.unwrap().updated_at;
    assert!(after_delete >= after_update);
}

#[tokio::test]
async fn test_registration_conflicts_on_username_and_folded_email() {
    let app = TestApp::new();
    app.register("alice").await;

    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({ "username": "alice", "email": "other@example.com", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "already_exists");

    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({ "username": "alice2", "email": "ALICE@example.com", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "already_exists");
}

#[tokio::test]
async fn test_login_by_username_or_email_then_logout() {
    let app = TestApp::new();
    app.register("alice").await;

    let (status, body, cookie) = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "ALICE@Example.com", "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    let cookie = cookie.unwrap();

    let (status, body) = app.get("/auth/profile", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["user"]["created_at"].is_string());

    let (status, _) = app
        .post(
            "/auth/login",
            None,
            json!({ "username": "alice", "password": "wrong-pass1" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.post("/auth/logout", Some(&cookie), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/auth/check", Some(&cookie)).await;
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn test_list_modes_and_my_sets() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let public_id = app.create_set(&alice, "Alice public", true).await;
    let private_id = app.create_set(&alice, "Alice private", false).await;
    app.create_set(&bob, "Bob public", true).await;
    app.create_card(&alice, &private_id, "q", "a").await;

    // Anonymous: public sets only
    let (status, body) = app.get("/sets", None).await;
    assert_eq!(status, StatusCode::OK);
    let sets = body["sets"].as_array().unwrap();
    assert_eq!(sets.len(), 2);
    assert!(sets.iter().all(|s| s["is_public"] == true));

    // Authenticated default: own sets regardless of visibility
    let (_, body) = app.get("/sets", Some(&alice)).await;
    let sets = body["sets"].as_array().unwrap();
    assert_eq!(sets.len(), 2);
    assert!(sets.iter().all(|s| s["user_id"] == sets[0]["user_id"]));

    // Filter by another user: that user's public sets only
    let alice_id = app.storage.get_set(&public_id).await.unwrap().owner_id;
    let (_, body) = app.get(&format!("/sets?user_id={alice_id}"), Some(&bob)).await;
    let sets = body["sets"].as_array().unwrap();
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0]["id"], public_id);

    // Filter by self: everything
    let (_, body) = app.get(&format!("/sets?user_id={alice_id}"), Some(&alice)).await;
    assert_eq!(body["sets"].as_array().unwrap().len(), 2);

    // public_only with a limit
    let (_, body) = app.get("/sets?public_only=true&limit=1", Some(&alice)).await;
    assert_eq!(body["sets"].as_array().unwrap().len(), 1);

    let (status, _) = app.get("/sets?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/sets/my-sets", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let sets = body["sets"].as_array().unwrap();
    let private = sets.iter().find(|s| s["id"] == private_id).unwrap();
    assert_eq!(private["card_count"], 1);

    let (status, _) = app.get("/sets/my-sets", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_flag_casing_and_blank_user_filter() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let private_id = app.create_set(&alice, "Alice private", false).await;
    let bob_public = app.create_set(&bob, "Bob public", true).await;

    // Flag casing does not matter
    for flag in ["true", "True", "TRUE"] {
        let (status, body) = app
            .get(&format!("/sets?public_only={flag}"), Some(&alice))
            .await;
        assert_eq!(status, StatusCode::OK, "public_only={flag}");
        let sets = body["sets"].as_array().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0]["id"], bob_public);
    }

    // Anything else means off: the caller's own sets
    let (status, body) = app.get("/sets?public_only=yes", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let sets = body["sets"].as_array().unwrap();
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0]["id"], private_id);

    // A blank user filter is ignored
    let (status, body) = app.get("/sets?user_id=", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let sets = body["sets"].as_array().unwrap();
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0]["id"], private_id);
}

#[tokio::test]
async fn test_malformed_query_parameters_return_json_errors() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    for uri in ["/sets?limit=abc", "/sets?limit=-1", "/sets/search?q=x&limit=many"] {
        let (status, body) = app.get(uri, Some(&alice)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["code"], "validation_error", "{uri}");
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}

#[tokio::test]
async fn test_search_returns_public_matches_for_every_caller() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    app.create_set(&alice, "Spanish Verbs", true).await;
    app.create_set(&alice, "spanish nouns", true).await;
    app.create_set(&alice, "Spanish secrets", false).await;
    app.create_set(&alice, "French Verbs", true).await;

    for cookie in [None, Some(alice.as_str())] {
        let (status, body) = app.get("/sets/search?q=SPANISH", cookie).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "SPANISH");
        assert_eq!(body["count"], 2);
        let sets = body["sets"].as_array().unwrap();
        assert!(sets.iter().all(|s| s["is_public"] == true));
        assert!(sets.iter().all(|s| s["username"] == "alice"));
    }

    let (first, _) = app.get("/sets/search?q=verbs", None).await;
    let (_, again) = app.get("/sets/search?q=verbs", None).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(again["count"], 2);

    let (status, body) = app.get("/sets/search?q=%20%20", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Search query is required");
}

#[tokio::test]
async fn test_validation_errors_surface_field_reasons() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({ "username": "_abc", "email": "x@example.com", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, _) = app
        .post(
            "/auth/register",
            None,
            json!({ "username": "valid_name", "email": "x@example.com", "password": "abcdef" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let alice = app.register("alice").await;
    let (status, body) = app.post("/sets", Some(&alice), json!({ "title": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Title is required");

    let set_id = app.create_set(&alice, "Biology", false).await;
    let (status, _) = app.put(&format!("/sets/{set_id}"), Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(&format!("/cards/set/{set_id}"), Some(&alice), json!({ "front": "cell" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Both front and back are required");
}
