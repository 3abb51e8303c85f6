//! Session principal resolution.

use std::sync::Arc;

use flashdeck_domain::{Principal, UserRef};
use flashdeck_storage::{DataStore, SessionStore};
use tracing::{error, warn};

/// Turns an opaque session key into a [`Principal`].
///
/// Resolution never fails: a missing, unknown or expired key, a session
/// pointing at a deleted user, and storage errors all yield `Anonymous`.
pub struct PrincipalResolver<S: DataStore> {
    storage: Arc<S>,
    sessions: Arc<dyn SessionStore>,
}

impl<S: DataStore> Clone for PrincipalResolver<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

impl<S: DataStore> PrincipalResolver<S> {
    pub fn new(storage: Arc<S>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { storage, sessions }
    }

    pub async fn resolve(&self, session_key: Option<&str>) -> Principal {
        let Some(key) = session_key.filter(|k| !k.is_empty()) else {
            return Principal::Anonymous;
        };

        let user_id = match self.sessions.get(key).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => return Principal::Anonymous,
            Err(e) => {
                error!(error = %e, "session lookup failed");
                return Principal::Anonymous;
            }
        };

        match self.storage.get_user(&user_id).await {
            Ok(user) => Principal::Authenticated(UserRef::new(user.id, user.username)),
            Err(e) if e.is_not_found() => {
                warn!(user_id = %user_id, "session refers to a missing user, clearing it");
                if let Err(e) = self.sessions.remove(key).await {
                    error!(error = %e, "failed to clear stale session");
                }
                Principal::Anonymous
            }
            Err(e) => {
                error!(error = %e, user_id = %user_id, "user lookup failed during session resolution");
                Principal::Anonymous
            }
        }
    }
}
