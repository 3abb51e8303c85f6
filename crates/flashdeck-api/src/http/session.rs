//! Session cookie handling.
//!
//! The cookie carries only the opaque session key; everything else lives in
//! the server-side session store.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, HeaderMap},
};

use flashdeck_domain::Principal;
use flashdeck_server::config::SessionSettings;
use flashdeck_storage::DataStore;

use super::state::AppState;

/// The resolved caller of a request.
///
/// Extracting it never fails: without a valid session the principal is
/// `Anonymous`.
#[derive(Debug, Clone)]
pub struct Caller {
    pub principal: Principal,
    /// Session key presented by the client, valid or not.
    pub session_key: Option<String>,
}

#[async_trait]
impl<S: DataStore> FromRequestParts<Arc<AppState<S>>> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let session_key = session_key_from_headers(&parts.headers, &state.session.cookie_name);
        let principal = state.resolver.resolve(session_key.as_deref()).await;
        Ok(Caller {
            principal,
            session_key,
        })
    }
}

/// The session key presented with a request, without resolving it.
#[derive(Debug, Clone)]
pub struct SessionKey(pub Option<String>);

#[async_trait]
impl<S: DataStore> FromRequestParts<Arc<AppState<S>>> for SessionKey {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        Ok(SessionKey(session_key_from_headers(
            &parts.headers,
            &state.session.cookie_name,
        )))
    }
}

/// Finds the named cookie across all `Cookie` headers.
pub fn session_key_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value that stores a session key.
pub fn session_cookie(settings: &SessionSettings, session_key: &str) -> String {
    cookie(settings, session_key, settings.ttl_secs)
}

/// `Set-Cookie` value that makes the client drop its session cookie.
pub fn clear_session_cookie(settings: &SessionSettings) -> String {
    cookie(settings, "", 0)
}

fn cookie(settings: &SessionSettings, value: &str, max_age: u64) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        settings.cookie_name, value, max_age
    );
    if settings.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}
