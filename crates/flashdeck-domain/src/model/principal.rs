use crate::error::{DomainError, DomainResult};

/// A resolved user identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserRef {
    pub id: String,
    pub username: String,
}

impl UserRef {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Principal {
    #[default]
    Anonymous,
    Authenticated(UserRef),
}

impl Principal {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Principal::Authenticated(_))
    }

    /// The authenticated user's id, if any.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Principal::Anonymous => None,
            Principal::Authenticated(user) => Some(&user.id),
        }
    }

    /// Returns the user, or `Unauthenticated` for an anonymous principal.
    pub fn require_user(&self) -> DomainResult<&UserRef> {
        match self {
            Principal::Anonymous => Err(DomainError::Unauthenticated),
            Principal::Authenticated(user) => Ok(user),
        }
    }
}
