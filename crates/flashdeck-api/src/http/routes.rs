//! HTTP route definitions and handlers.
//!
//! Handlers are thin: extract the caller and the input, call the matching
//! orchestrator operation, wrap the result in the response envelope.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::error;

use flashdeck_server::handlers::types::{
    CreateCardRequest, CreateSetRequest, ListSetsQuery, LoginRequest, RegisterRequest,
    SearchQuery, UpdateCardRequest, UpdateSetRequest,
};
use flashdeck_storage::{DataStore, HealthStatus, StorageResult};

use super::error::{ApiError, ApiResult, JsonBadRequest, QueryBadRequest};
use super::session::{clear_session_cookie, session_cookie, Caller, SessionKey};
use super::state::AppState;
use crate::middleware::{cors_layer, ObserveLayer, RequestMetrics};
use crate::observability::{metrics_handler, MetricsState};

/// Default request body size limit (1MB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

type SharedState<S> = State<Arc<AppState<S>>>;

fn api_routes<S: DataStore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        // Accounts
        .route("/auth/register", post(register::<S>))
        .route("/auth/login", post(login::<S>))
        .route("/auth/logout", post(logout::<S>))
        .route("/auth/check", get(check_auth::<S>))
        .route("/auth/profile", get(profile::<S>))
        // Flashcard sets
        .route("/sets", post(create_set::<S>).get(list_sets::<S>))
        .route("/sets/my-sets", get(my_sets::<S>))
        .route("/sets/search", get(search_sets::<S>))
        .route(
            "/sets/:set_id",
            get(get_set::<S>)
                .put(update_set::<S>)
                .delete(delete_set::<S>),
        )
        // Flashcards
        .route(
            "/cards/set/:set_id",
            post(create_card::<S>).get(list_cards::<S>),
        )
        .route(
            "/cards/:card_id",
            get(get_card::<S>)
                .put(update_card::<S>)
                .delete(delete_card::<S>),
        )
}

/// Creates the HTTP router with the default body size limit and no
/// middleware.
pub fn create_router<S: DataStore>(state: AppState<S>) -> Router {
    create_router_with_body_limit(state, DEFAULT_BODY_LIMIT)
}

/// Creates the HTTP router with a custom body size limit.
pub fn create_router_with_body_limit<S: DataStore>(
    state: AppState<S>,
    body_limit: usize,
) -> Router {
    api_routes::<S>()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check::<S>))
        .with_state(Arc::new(state))
        .layer(RequestBodyLimitLayer::new(body_limit))
}

/// Creates the production router: API routes, health endpoints, the
/// `/metrics` endpoint when `metrics_state` is given, and the full
/// middleware stack.
pub fn create_router_with_observability<S: DataStore>(
    state: AppState<S>,
    metrics_state: Option<MetricsState>,
    body_limit: usize,
) -> Router {
    let mut router = create_router_with_body_limit(state, body_limit);

    if let Some(metrics_state) = metrics_state {
        let observability_router = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(metrics_state);
        router = router.merge(observability_router);
    }

    // Last layer is outermost
    router
        .layer(ObserveLayer::new(Arc::new(RequestMetrics::new())))
        .layer(cors_layer())
}

// ============================================================
// Health and Readiness Checks
// ============================================================

/// Liveness probe. Does not check dependencies.
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Readiness probe: 200 if storage answers its health check, otherwise
/// 503 `service_unavailable`.
async fn readiness_check<S: DataStore>(
    State(state): SharedState<S>,
) -> ApiResult<impl IntoResponse> {
    readiness(state.storage.health_check().await)
}

/// Error details are logged, not returned.
pub(crate) fn readiness(
    health: StorageResult<HealthStatus>,
) -> ApiResult<Json<serde_json::Value>> {
    match health {
        Ok(status) if status.healthy => Ok(Json(json!({
            "status": "ready",
            "checks": { "storage": "ok" }
        }))),
        Ok(status) => {
            error!(message = ?status.message, "readiness check failed: storage unhealthy");
            Err(ApiError::service_unavailable("Storage unavailable"))
        }
        Err(e) => {
            error!(error = %e, "readiness check failed: storage unavailable");
            Err(ApiError::service_unavailable("Storage unavailable"))
        }
    }
}

// ============================================================
// Accounts
// ============================================================

async fn register<S: DataStore>(
    State(state): SharedState<S>,
    SessionKey(presented): SessionKey,
    JsonBadRequest(body): JsonBadRequest<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let grant = state.accounts.register(body, presented.as_deref()).await?;
    let cookie = session_cookie(&state.session, &grant.session_key);

    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(json!({
            "message": "User registered successfully",
            "user": grant.user,
        })),
    ))
}

async fn login<S: DataStore>(
    State(state): SharedState<S>,
    SessionKey(presented): SessionKey,
    JsonBadRequest(body): JsonBadRequest<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let grant = state.accounts.login(body, presented.as_deref()).await?;
    let cookie = session_cookie(&state.session, &grant.session_key);

    Ok((
        [(SET_COOKIE, cookie)],
        Json(json!({
            "message": "Login successful",
            "user": grant.user,
        })),
    ))
}

async fn logout<S: DataStore>(
    State(state): SharedState<S>,
    SessionKey(presented): SessionKey,
) -> impl IntoResponse {
    state.accounts.logout(presented.as_deref()).await;
    (
        [(SET_COOKIE, clear_session_cookie(&state.session))],
        Json(json!({ "message": "Logout successful" })),
    )
}

async fn check_auth<S: DataStore>(
    State(state): SharedState<S>,
    caller: Caller,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.accounts.check(&caller.principal).await?))
}

async fn profile<S: DataStore>(
    State(state): SharedState<S>,
    caller: Caller,
) -> ApiResult<impl IntoResponse> {
    let user = state.accounts.profile(&caller.principal).await?;
    Ok(Json(json!({ "user": user })))
}

// ============================================================
// Flashcard Sets
// ============================================================

async fn create_set<S: DataStore>(
    State(state): SharedState<S>,
    caller: Caller,
    JsonBadRequest(body): JsonBadRequest<CreateSetRequest>,
) -> ApiResult<impl IntoResponse> {
    let set = state.sets.create(&caller.principal, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Flashcard set created successfully",
            "set": set,
        })),
    ))
}

async fn list_sets<S: DataStore>(
    State(state): SharedState<S>,
    caller: Caller,
    QueryBadRequest(query): QueryBadRequest<ListSetsQuery>,
) -> ApiResult<impl IntoResponse> {
    let sets = state.sets.list(&caller.principal, query).await?;
    Ok(Json(json!({ "sets": sets })))
}

async fn my_sets<S: DataStore>(
    State(state): SharedState<S>,
    caller: Caller,
) -> ApiResult<impl IntoResponse> {
    let sets = state.sets.my_sets(&caller.principal).await?;
    Ok(Json(json!({ "sets": sets })))
}

async fn search_sets<S: DataStore>(
    State(state): SharedState<S>,
    QueryBadRequest(query): QueryBadRequest<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.sets.search(query).await?))
}

async fn get_set<S: DataStore>(
    State(state): SharedState<S>,
    Path(set_id): Path<String>,
    caller: Caller,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.sets.get(&caller.principal, &set_id).await?))
}

async fn update_set<S: DataStore>(
    State(state): SharedState<S>,
    Path(set_id): Path<String>,
    caller: Caller,
    JsonBadRequest(body): JsonBadRequest<UpdateSetRequest>,
) -> ApiResult<impl IntoResponse> {
    let set = state.sets.update(&caller.principal, &set_id, body).await?;
    Ok(Json(json!({
        "message": "Flashcard set updated successfully",
        "set": set,
    })))
}

async fn delete_set<S: DataStore>(
    State(state): SharedState<S>,
    Path(set_id): Path<String>,
    caller: Caller,
) -> ApiResult<impl IntoResponse> {
    state.sets.delete(&caller.principal, &set_id).await?;
    Ok(Json(json!({ "message": "Flashcard set deleted successfully" })))
}

// ============================================================
// Flashcards
// ============================================================

async fn create_card<S: DataStore>(
    State(state): SharedState<S>,
    Path(set_id): Path<String>,
    caller: Caller,
    JsonBadRequest(body): JsonBadRequest<CreateCardRequest>,
) -> ApiResult<impl IntoResponse> {
    let card = state.cards.create(&caller.principal, &set_id, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Flashcard added successfully",
            "flashcard": card,
        })),
    ))
}

async fn list_cards<S: DataStore>(
    State(state): SharedState<S>,
    Path(set_id): Path<String>,
    caller: Caller,
) -> ApiResult<impl IntoResponse> {
    let cards = state.cards.list(&caller.principal, &set_id).await?;
    Ok(Json(json!({ "flashcards": cards })))
}

async fn get_card<S: DataStore>(
    State(state): SharedState<S>,
    Path(card_id): Path<String>,
    caller: Caller,
) -> ApiResult<impl IntoResponse> {
    let card = state.cards.get(&caller.principal, &card_id).await?;
    Ok(Json(json!({ "flashcard": card })))
}

async fn update_card<S: DataStore>(
    State(state): SharedState<S>,
    Path(card_id): Path<String>,
    caller: Caller,
    JsonBadRequest(body): JsonBadRequest<UpdateCardRequest>,
) -> ApiResult<impl IntoResponse> {
    let card = state
        .cards
        .update(&caller.principal, &card_id, body)
        .await?;
    Ok(Json(json!({
        "message": "Flashcard updated successfully",
        "flashcard": card,
    })))
}

async fn delete_card<S: DataStore>(
    State(state): SharedState<S>,
    Path(card_id): Path<String>,
    caller: Caller,
) -> ApiResult<impl IntoResponse> {
    state.cards.delete(&caller.principal, &card_id).await?;
    Ok(Json(json!({ "message": "Flashcard deleted successfully" })))
}
