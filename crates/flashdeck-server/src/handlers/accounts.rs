//! Registration, login, logout and profile lookups.

use std::sync::Arc;

use chrono::Utc;
use flashdeck_domain::credentials::{hash_password, verify_password};
use flashdeck_domain::validation::{normalize_email, validate_password, validate_username};
use flashdeck_domain::{DomainError, DomainResult, Principal};
use flashdeck_storage::{DataStore, SessionStore, StoredUser};
use tracing::{error, info, instrument};

use super::types::{AuthStatus, LoginRequest, ProfileView, RegisterRequest, SessionGrant, UserView};
use super::{new_id, storage_error};

/// Handler for account and session operations.
pub struct AccountHandler<S: DataStore> {
    storage: Arc<S>,
    sessions: Arc<dyn SessionStore>,
}

impl<S: DataStore> Clone for AccountHandler<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

impl<S: DataStore> AccountHandler<S> {
    pub fn new(storage: Arc<S>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { storage, sessions }
    }

    /// Registers a new user and starts a session for them.
    ///
    /// Checks run in a fixed order: presence, username, password, email,
    /// username conflict, email conflict. Nothing is stored until all pass.
    /// Any session key presented with the request is discarded.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        request: RegisterRequest,
        presented_session: Option<&str>,
    ) -> DomainResult<SessionGrant> {
        let (Some(username), Some(email), Some(password)) = (
            non_empty(request.username),
            non_empty(request.email),
            non_empty(request.password),
        ) else {
            return Err(DomainError::validation(
                "request",
                "Username, email, and password are required",
            ));
        };

        let username = validate_username(&username)?;
        validate_password(&password)?;
        let email = normalize_email(&email)?;

        if self
            .storage
            .find_user_by_username(&username)
            .await
            .map_err(storage_error)?
            .is_some()
        {
            return Err(DomainError::Conflict {
                field: "username",
                message: "Username already exists".to_string(),
            });
        }
        if self
            .storage
            .find_user_by_email(&email)
            .await
            .map_err(storage_error)?
            .is_some()
        {
            return Err(DomainError::Conflict {
                field: "email",
                message: "Email already exists".to_string(),
            });
        }

        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| DomainError::CredentialError {
                reason: e.to_string(),
            })??;

        let user = self
            .storage
            .insert_user(StoredUser {
                id: new_id(),
                username,
                email,
                password_hash,
                created_at: Utc::now(),
            })
            .await
            .map_err(storage_error)?;

        info!(user_id = %user.id, username = %user.username, "user registered");
        self.start_session(&user, presented_session).await
    }

    /// Logs in by username or email.
    #[instrument(skip_all)]
    pub async fn login(
        &self,
        request: LoginRequest,
        presented_session: Option<&str>,
    ) -> DomainResult<SessionGrant> {
        let (Some(login), Some(password)) =
            (non_empty(request.username), non_empty(request.password))
        else {
            return Err(DomainError::validation(
                "request",
                "Username and password are required",
            ));
        };

        let login = login.trim().to_string();
        let user = match self
            .storage
            .find_user_by_username(&login)
            .await
            .map_err(storage_error)?
        {
            Some(user) => Some(user),
            None => self
                .storage
                .find_user_by_email(&login.to_lowercase())
                .await
                .map_err(storage_error)?,
        };

        let Some(user) = user else {
            info!("login failed: unknown user");
            return Err(DomainError::InvalidCredentials);
        };

        let stored_hash = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| DomainError::CredentialError {
                reason: e.to_string(),
            })?;
        if !verified {
            info!(user_id = %user.id, "login failed: wrong password");
            return Err(DomainError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");
        self.start_session(&user, presented_session).await
    }

    /// Ends a session. Unknown or missing keys are not an error.
    #[instrument(skip_all)]
    pub async fn logout(&self, session_key: Option<&str>) {
        if let Some(key) = session_key {
            if let Err(e) = self.sessions.remove(key).await {
                error!(error = %e, "failed to remove session on logout");
            }
            info!("user logged out");
        }
    }

    /// Reports whether the caller is logged in.
    pub async fn check(&self, principal: &Principal) -> DomainResult<AuthStatus> {
        let Some(user_id) = principal.user_id() else {
            return Ok(AuthStatus {
                authenticated: false,
                user: None,
            });
        };
        match self.storage.get_user(user_id).await {
            Ok(user) => Ok(AuthStatus {
                authenticated: true,
                user: Some(UserView::from(&user)),
            }),
            Err(e) if e.is_not_found() => Ok(AuthStatus {
                authenticated: false,
                user: None,
            }),
            Err(e) => Err(storage_error(e)),
        }
    }

    /// Returns the caller's profile.
    pub async fn profile(&self, principal: &Principal) -> DomainResult<ProfileView> {
        let caller = principal.require_user()?;
        let user = self
            .storage
            .get_user(&caller.id)
            .await
            .map_err(storage_error)?;
        Ok(ProfileView::from(&user))
    }

    async fn start_session(
        &self,
        user: &StoredUser,
        presented_session: Option<&str>,
    ) -> DomainResult<SessionGrant> {
        if let Some(old) = presented_session {
            self.sessions.remove(old).await.map_err(storage_error)?;
        }
        let session_key = self.sessions.create(&user.id).await.map_err(storage_error)?;
        Ok(SessionGrant {
            user: UserView::from(user),
            session_key,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
