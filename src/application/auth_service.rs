use crate::domain::error::DomainError;
use crate::domain::repository::{SessionStore, UserRepository};
use crate::domain::session::Session;
use crate::domain::user::{CreateUser, LoginRequest, NewUser, User, UserId};
use crate::infrastructure::security::{
    generate_session_token, hash_password, verify_against_decoy, verify_password,
};
use anyhow::Result;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};

pub const MAX_USERNAME_CHARS: usize = 64;
pub const MAX_PASSWORD_BYTES: usize = 1024;

pub struct AuthService {
    user_repository: Arc<dyn UserRepository>,
    session_store: Arc<dyn SessionStore>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        session_store: Arc<dyn SessionStore>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            user_repository,
            session_store,
            session_ttl,
        }
    }

    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn register(&self, req: CreateUser) -> Result<User> {
        trace!("Starting user registration");
        let username = normalize_username(&req.username)?;
        validate_password(&req.password)?;

        // Cheap early exit; the insert below is what actually enforces uniqueness.
        if self
            .user_repository
            .find_user_by_username(&username)
            .await?
            .is_some()
        {
            warn!(username = %username, "User already exists");
            return Err(DomainError::DuplicateUsername.into());
        }

        let password = req.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| DomainError::Internal(format!("Hashing task failed: {}", e)))?
            .map_err(|e| {
                error!(error = %e, "Failed to hash password");
                DomainError::Internal(format!("Failed to hash password: {}", e))
            })?;

        let user = self
            .user_repository
            .insert_user(NewUser {
                username,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "User registered successfully");
        Ok(user)
    }

    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn login(&self, req: LoginRequest) -> Result<Session> {
        trace!("Starting login");
        let username = req.username.trim().to_string();
        let password = req.password;

        let user = self.user_repository.find_user_by_username(&username).await?;

        let Some(user) = user else {
            warn!(username = %username, "User not found during login");
            tokio::task::spawn_blocking(move || verify_against_decoy(&password))
                .await
                .map_err(|e| DomainError::Internal(format!("Verification task failed: {}", e)))?;
            return Err(DomainError::InvalidCredentials.into());
        };

        let hash = user.password_hash.clone();
        let is_valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| DomainError::Internal(format!("Verification task failed: {}", e)))?
            .map_err(|e| {
                error!(error = %e, "Failed to verify password");
                DomainError::Internal(format!("Failed to verify password: {}", e))
            })?;

        if !is_valid {
            warn!(user_id = user.id, "Invalid password during login");
            return Err(DomainError::InvalidCredentials.into());
        }

        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.session_ttl).ok_or_else(|| {
            error!(user_id = user.id, "Session lifetime overflows the clock");
            DomainError::Internal("Session lifetime out of range".to_string())
        })?;
        let session = Session {
            token: generate_session_token(),
            user_id: user.id,
            created_at: now,
            expires_at,
        };
        self.session_store.insert_session(session.clone()).await?;

        info!(user_id = user.id, "Login successful");
        Ok(session)
    }

    #[instrument(skip_all)]
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.session_store.remove_session(token).await?;
        debug!("Session destroyed");
        Ok(())
    }

    /// Maps a session token to the user it was issued for.
    pub async fn resolve_session(&self, token: &str) -> Result<UserId> {
        match self.session_store.find_session(token).await? {
            Some(session) => Ok(session.user_id),
            None => {
                debug!("Session token did not resolve");
                Err(DomainError::Unauthenticated.into())
            }
        }
    }

    pub async fn user(&self, id: UserId) -> Result<User> {
        self.user_repository
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("User not found: {}", id)).into())
    }

    pub async fn purge_expired_sessions(&self) -> Result<usize> {
        let removed = self.session_store.purge_expired().await?;
        if removed > 0 {
            debug!(removed = removed, "Purged expired sessions");
        }
        Ok(removed)
    }
}

fn normalize_username(raw: &str) -> Result<String> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(DomainError::Validation("Username must not be empty".to_string()).into());
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(DomainError::Validation(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_CHARS
        ))
        .into());
    }
    if username.chars().any(char::is_control) {
        return Err(
            DomainError::Validation("Username contains invalid characters".to_string()).into(),
        );
    }
    Ok(username.to_string())
}

fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(DomainError::Validation("Password must not be empty".to_string()).into());
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(DomainError::Validation("Password is too long".to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_username_trims() {
        assert_eq!(normalize_username("  alice ").unwrap(), "alice");
    }

    #[test]
    fn test_normalize_username_rejects_blank_and_long_names() {
        assert!(normalize_username("   ").is_err());
        assert!(normalize_username(&"x".repeat(MAX_USERNAME_CHARS + 1)).is_err());
        assert!(normalize_username(&"x".repeat(MAX_USERNAME_CHARS)).is_ok());
    }

    #[test]
    fn test_normalize_username_rejects_control_characters() {
        let err = normalize_username("bad\nname").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_password_bounds() {
        assert!(validate_password("").is_err());
        assert!(validate_password(&"p".repeat(MAX_PASSWORD_BYTES + 1)).is_err());
        assert!(validate_password("hunter2").is_ok());
    }
}
