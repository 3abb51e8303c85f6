//! API error responses and the body and query extractors.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::error;

use flashdeck_domain::DomainError;

/// Stable error codes carried in every error body.
///
/// Each code maps to one HTTP status in [`ApiError::into_response`].
///
/// | Code | Status |
/// |------|--------|
/// | `validation_error`, `already_exists` | 400 |
/// | `unauthenticated`, `invalid_credentials` | 401 |
/// | `forbidden` | 403 |
/// | `not_found` | 404 |
/// | `payload_too_large` | 413 |
/// | `internal_error` | 500 |
/// | `service_unavailable` | 503 |
pub mod error_codes {
    /// Missing, empty or malformed input.
    pub const VALIDATION_ERROR: &str = "validation_error";
    /// Username or email already registered.
    pub const ALREADY_EXISTS: &str = "already_exists";
    /// The operation requires a logged-in user.
    pub const UNAUTHENTICATED: &str = "unauthenticated";
    /// Login failed.
    pub const INVALID_CREDENTIALS: &str = "invalid_credentials";
    /// The caller may not access the resource.
    pub const FORBIDDEN: &str = "forbidden";
    /// The id does not resolve.
    pub const NOT_FOUND: &str = "not_found";
    /// Request body exceeds the configured limit.
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    /// Unexpected server failure.
    pub const INTERNAL_ERROR: &str = "internal_error";
    /// Storage backend unreachable.
    pub const SERVICE_UNAVAILABLE: &str = "service_unavailable";
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error (400).
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::VALIDATION_ERROR, message)
    }

    /// Creates an already-exists error (400).
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(error_codes::ALREADY_EXISTS, message)
    }

    /// Creates an unauthenticated error (401).
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(error_codes::UNAUTHENTICATED, message)
    }

    /// Creates an invalid credentials error (401).
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_CREDENTIALS, message)
    }

    /// Creates a forbidden error (403).
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(error_codes::FORBIDDEN, message)
    }

    /// Creates a not found error (404).
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(error_codes::NOT_FOUND, message)
    }

    /// Creates an internal error (500).
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    /// Creates a service unavailable error (503).
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(error_codes::SERVICE_UNAVAILABLE, message)
    }

    /// HTTP status for this error's code.
    pub fn status(&self) -> StatusCode {
        use error_codes::*;

        match self.code.as_str() {
            VALIDATION_ERROR | ALREADY_EXISTS => StatusCode::BAD_REQUEST,
            UNAUTHENTICATED | INVALID_CREDENTIALS => StatusCode::UNAUTHORIZED,
            FORBIDDEN => StatusCode::FORBIDDEN,
            NOT_FOUND => StatusCode::NOT_FOUND,
            PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            SERVICE_UNAVAILABLE => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { message, .. } => ApiError::validation_error(message),
            DomainError::Conflict { message, .. } => ApiError::already_exists(message),
            DomainError::Unauthenticated => ApiError::unauthenticated("Authentication required"),
            DomainError::InvalidCredentials => {
                ApiError::invalid_credentials("Invalid username or password")
            }
            DomainError::Forbidden { message } => ApiError::forbidden(message),
            DomainError::NotFound { resource, .. } => {
                ApiError::not_found(format!("{} not found", capitalize(resource)))
            }
            // Log full detail, return a generic message
            DomainError::CredentialError { reason } => {
                error!(error = %reason, "credential processing failed");
                ApiError::internal_error("internal server error")
            }
            DomainError::StorageOperationFailed { reason } => {
                error!(error = %reason, "storage operation failed");
                ApiError::internal_error("internal server error")
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// JSON extractor that returns 400 `validation_error` instead of 422 for
/// malformed bodies.
///
/// Preserves 413 Payload Too Large for body limit errors.
pub struct JsonBadRequest<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBadRequest<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBadRequest(value)),
            Err(rejection) => {
                let too_large = matches!(rejection, JsonRejection::BytesRejection(_))
                    && rejection.status() == StatusCode::PAYLOAD_TOO_LARGE;
                let message = rejection.body_text();
                if too_large {
                    Err(ApiError::new(error_codes::PAYLOAD_TOO_LARGE, message))
                } else {
                    Err(ApiError::validation_error(message))
                }
            }
        }
    }
}

/// Query-string extractor whose rejections are JSON `validation_error`
/// bodies rather than axum's plain-text 400.
pub struct QueryBadRequest<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryBadRequest<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| QueryBadRequest(value))
            .map_err(|rejection| ApiError::validation_error(rejection.body_text()))
    }
}
