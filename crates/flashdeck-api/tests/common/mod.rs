//! Shared test utilities for Flashdeck API tests.

// Each test file compiles this module separately and uses a different subset.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use flashdeck_api::http::{create_router, AppState};
use flashdeck_storage::MemoryDataStore;

/// Password that satisfies the strength rules.
pub const TEST_PASSWORD: &str = "hunter22";

/// A router over in-memory storage plus direct access to that storage.
///
/// The router is cloned per request; sessions live in its state, so every
/// request in a test must go through the same `TestApp`.
pub struct TestApp {
    pub router: Router,
    pub storage: Arc<MemoryDataStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let storage = MemoryDataStore::new_shared();
        let router = create_router(AppState::new(Arc::clone(&storage)));
        Self { router, storage }
    }

    /// Sends a request and returns the status, the JSON body (`Null` when
    /// empty) and the `name=value` part of any `Set-Cookie` header.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value, Option<String>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json, set_cookie)
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
        let (status, body, _) = self.send("GET", uri, cookie, None).await;
        (status, body)
    }

    pub async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> (StatusCode, Value) {
        let (status, body, _) = self.send("POST", uri, cookie, Some(body)).await;
        (status, body)
    }

    pub async fn put(&self, uri: &str, cookie: Option<&str>, body: Value) -> (StatusCode, Value) {
        let (status, body, _) = self.send("PUT", uri, cookie, Some(body)).await;
        (status, body)
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
        let (status, body, _) = self.send("DELETE", uri, cookie, None).await;
        (status, body)
    }

    /// Registers `username` and returns its session cookie.
    pub async fn register(&self, username: &str) -> String {
        let (status, body, cookie) = self
            .send(
                "POST",
                "/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": TEST_PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        cookie.expect("register should set a session cookie")
    }

    /// Creates a set and returns its id.
    pub async fn create_set(&self, cookie: &str, title: &str, is_public: bool) -> String {
        let (status, body) = self
            .post(
                "/sets",
                Some(cookie),
                json!({ "title": title, "is_public": is_public }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create set failed: {body}");
        body["set"]["id"].as_str().unwrap().to_string()
    }

    /// Adds a card to a set and returns its id.
    pub async fn create_card(&self, cookie: &str, set_id: &str, front: &str, back: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/cards/set/{set_id}"),
                Some(cookie),
                json!({ "front": front, "back": back }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create card failed: {body}");
        body["flashcard"]["id"].as_str().unwrap().to_string()
    }
}
