//! Admin authentication
//!
//! There is exactly one privileged actor, configured under `admin`. Logging
//! in persists a session row whose id is handed to the browser in the
//! `session` cookie. Every admin-only operation takes an [`AdminCapability`],
//! which only [`AuthService::authorize`] can mint.

use crate::config::AdminConfig;
use crate::db::repositories::SessionRepository;
use crate::models::Session;
use crate::services::password::verify_password;
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Error types for authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Username or password did not match; deliberately does not say which
    #[error("Wrong username or password")]
    InvalidCredentials,

    /// The request is not backed by an admin session
    #[error("Only admin can access this page")]
    NotAdmin,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Proof that the current request belongs to the admin.
///
/// Has no public constructor.
#[derive(Debug)]
pub struct AdminCapability {
    username: String,
}

impl AdminCapability {
    /// The admin username the capability was issued for
    pub fn username(&self) -> &str {
        &self.username
    }

    #[cfg(test)]
    pub(crate) fn for_tests(username: &str) -> Self {
        Self {
            username: username.to_string(),
        }
    }
}

/// Session gate for the admin area
pub struct AuthService {
    session_repo: Arc<dyn SessionRepository>,
    admin: AdminConfig,
}

impl AuthService {
    pub fn new(session_repo: Arc<dyn SessionRepository>, admin: AdminConfig) -> Self {
        Self { session_repo, admin }
    }

    /// True iff the session is unexpired and belongs to the configured admin
    pub fn is_admin(&self, session: Option<&Session>) -> bool {
        match session {
            Some(session) => !session.is_expired() && session.username == self.admin.username,
            None => false,
        }
    }

    /// Mint an [`AdminCapability`] for an admin session
    pub fn authorize(&self, session: Option<&Session>) -> Result<AdminCapability, AuthError> {
        if !self.is_admin(session) {
            return Err(AuthError::NotAdmin);
        }

        Ok(AdminCapability {
            username: self.admin.username.clone(),
        })
    }

    /// Check credentials and open a new session.
    ///
    /// On failure no session row is written.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let username_ok = bool::from(username.as_bytes().ct_eq(self.admin.username.as_bytes()));
        let password_ok = self.check_password(password)?;

        if !(username_ok && password_ok) {
            tracing::warn!(username = %username, "Rejected admin login");
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let expires_at = Duration::try_hours(self.admin.session_ttl_hours)
            .filter(|ttl| *ttl > Duration::zero())
            .and_then(|ttl| now.checked_add_signed(ttl))
            .with_context(|| {
                format!(
                    "Invalid session lifetime: {} hours",
                    self.admin.session_ttl_hours
                )
            })?;
        let session = Session {
            id: Uuid::new_v4().to_string(),
            username: self.admin.username.clone(),
            expires_at,
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!(username = %created.username, "Admin logged in");
        Ok(created)
    }

    /// Close the session named by `token`. No token or an unknown token is fine.
    pub async fn logout(&self, token: Option<&str>) -> Result<(), AuthError> {
        let Some(token) = token else {
            return Ok(());
        };

        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;

        tracing::info!("Admin logged out");
        Ok(())
    }

    /// Load the session for a cookie token, discarding it when expired
    pub async fn resolve(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Delete every expired session row; returns how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, AuthError> {
        let removed = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(removed)
    }

    fn check_password(&self, password: &str) -> Result<bool, AuthError> {
        if let Some(hash) = self.admin.password_hash.as_deref() {
            return Ok(verify_password(password, hash)?);
        }

        // An unset plaintext password disables login
        if self.admin.password.is_empty() {
            return Ok(false);
        }

        Ok(bool::from(
            password.as_bytes().ct_eq(self.admin.password.as_bytes()),
        ))
    }
}
