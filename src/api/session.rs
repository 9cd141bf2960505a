//! The logged-in user and their credentials.

use std::sync::Arc;

use crate::error::SyncError;
use crate::model::{ResourceId, UserInfo, UserRole};

/// Supplies the bearer token attached to every request.
pub trait CredentialProvider: Send + Sync {
    fn access_token(&self) -> Result<String, SyncError>;
}

/// A fixed token obtained at login.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        StaticToken(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn access_token(&self) -> Result<String, SyncError> {
        if self.0.is_empty() {
            return Err(SyncError::Authentication);
        }
        Ok(self.0.clone())
    }
}

/// Session context, built at login and dropped at logout.
///
/// Passed explicitly to every component that needs to know who the current
/// user is.
#[derive(Clone)]
pub struct Session {
    user: UserInfo,
    role: UserRole,
    credentials: Arc<dyn CredentialProvider>,
}

impl Session {
    pub fn new(user: UserInfo, role: UserRole, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            user,
            role,
            credentials,
        }
    }

    pub fn user_id(&self) -> ResourceId {
        self.user.id
    }

    pub fn user(&self) -> &UserInfo {
        &self.user
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn is_priest(&self) -> bool {
        self.role == UserRole::Priest
    }

    pub fn access_token(&self) -> Result<String, SyncError> {
        self.credentials.access_token()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}
