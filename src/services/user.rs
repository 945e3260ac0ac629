//! User service
//!
//! Implements business logic for accounts and authentication:
//! - Bootstrap registration (only while no user exists; becomes super-admin)
//! - Login/logout and session validation
//! - Super-admin user management and article/language assignment
//! - Password changes and resets

use crate::db::repositories::{ArticleRepository, SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, User, UserRole};
use crate::services::password::{
    hash_password, is_acceptable_password, verify_password, MIN_PASSWORD_LENGTH,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default session lifetime in days
const DEFAULT_SESSION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists")]
    UserExists,

    #[error("User not found")]
    NotFound,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Login credentials
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Account creation input, for both bootstrap registration and super-admins
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    /// Ignored for bootstrap registration
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

/// Article ids as a JSON list or a comma-separated string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ArticleAssignment {
    Ids(Vec<i64>),
    List(String),
}

impl ArticleAssignment {
    /// Parsed ids, deduplicated in first-seen order
    pub fn ids(&self) -> Result<Vec<i64>, UserServiceError> {
        let parsed: Vec<i64> = match self {
            ArticleAssignment::Ids(ids) => ids.clone(),
            ArticleAssignment::List(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<i64>().map_err(|_| {
                        UserServiceError::ValidationError(format!("Invalid article id '{}'", s))
                    })
                })
                .collect::<Result<_, _>>()?,
        };

        let mut ids = Vec::with_capacity(parsed.len());
        for id in parsed {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    article_repo: Arc<dyn ArticleRepository>,
    session_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        article_repo: Arc<dyn ArticleRepository>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            article_repo,
            session_days: DEFAULT_SESSION_DAYS,
        }
    }

    /// Override the session lifetime
    pub fn with_session_days(mut self, days: i64) -> Self {
        self.session_days = days.max(1);
        self
    }

    /// Register the first account.
    ///
    /// Only allowed while the system has no users; the account becomes
    /// super-admin. Everyone after that is created by a super-admin.
    ///
    /// # Errors
    ///
    /// - `Forbidden` once any user exists
    /// - `ValidationError` for missing fields or a short password
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        if !self.is_first_user().await? {
            return Err(UserServiceError::Forbidden(
                "Registration is closed".to_string(),
            ));
        }

        let user = self.create_account(&input, UserRole::SuperAdmin).await?;
        tracing::info!("Bootstrap super-admin {} registered", user.email);
        Ok(user)
    }

    /// Login with credentials
    ///
    /// Returns the new session together with the user it belongs to.
    ///
    /// # Errors
    ///
    /// - `AuthenticationError` if the email is unknown or the password wrong
    pub async fn login(&self, input: LoginInput) -> Result<(Session, User), UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid email or password".to_string());

        let user = self
            .user_repo
            .get_by_email(input.email.trim())
            .await
            .context("Failed to get user by email")?
            .ok_or_else(invalid)?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            tracing::warn!("Failed login for {}", user.email);
            return Err(invalid());
        }

        let session = self
            .session_repo
            .create(&Session::start(user.id, self.session_days))
            .await
            .context("Failed to create session")?;

        tracing::info!("User {} logged in", user.email);
        Ok((session, user))
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Validate session token and return the associated user
    ///
    /// `None` when the session doesn't exist or has expired; expired
    /// sessions are deleted on sight.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    /// `true` if no users exist yet
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;
        Ok(count == 0)
    }

    pub async fn create_user(&self, actor: &User, input: RegisterInput) -> Result<User, UserServiceError> {
        require_super_admin(actor)?;
        let role = input.role.unwrap_or_default();
        let user = self.create_account(&input, role).await?;
        tracing::info!("{} created user {} ({})", actor.email, user.email, user.role);
        Ok(user)
    }

    pub async fn list_users(&self, actor: &User) -> Result<Vec<User>, UserServiceError> {
        require_super_admin(actor)?;
        Ok(self.user_repo.list().await.context("Failed to list users")?)
    }

    pub async fn get_user(&self, actor: &User, id: i64) -> Result<User, UserServiceError> {
        require_super_admin(actor)?;
        self.load(id).await
    }

    /// Replace a user's article set. Ids that don't exist are dropped.
    pub async fn assign_articles(
        &self,
        actor: &User,
        id: i64,
        assignment: &ArticleAssignment,
    ) -> Result<User, UserServiceError> {
        require_super_admin(actor)?;
        self.load(id).await?;

        let requested = assignment.ids()?;
        let existing: Vec<i64> = self
            .article_repo
            .list_by_ids(&requested)
            .await
            .context("Failed to load articles")?
            .into_iter()
            .map(|a| a.id)
            .collect();
        let ids: Vec<i64> = requested.into_iter().filter(|id| existing.contains(id)).collect();

        self.user_repo
            .set_assigned_articles(id, &ids)
            .await
            .context("Failed to assign articles")?;
        self.load(id).await
    }

    /// Replace a user's language set
    pub async fn assign_languages(
        &self,
        actor: &User,
        id: i64,
        languages: &[String],
    ) -> Result<User, UserServiceError> {
        require_super_admin(actor)?;
        self.load(id).await?;

        let mut codes: Vec<String> = Vec::with_capacity(languages.len());
        for code in languages.iter().map(|l| l.trim().to_lowercase()) {
            if !code.is_empty() && !codes.contains(&code) {
                codes.push(code);
            }
        }

        self.user_repo
            .set_assigned_languages(id, &codes)
            .await
            .context("Failed to assign languages")?;
        self.load(id).await
    }

    /// Set a new password for any user and end their sessions
    pub async fn reset_password(
        &self,
        actor: &User,
        id: i64,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        require_super_admin(actor)?;
        let user = self.load(id).await?;
        self.store_password(user.id, new_password).await?;
        self.session_repo
            .delete_by_user(user.id)
            .await
            .context("Failed to delete sessions")?;
        tracing::info!("{} reset the password of {}", actor.email, user.email);
        Ok(())
    }

    /// Change the caller's own password after checking the current one
    pub async fn change_password(
        &self,
        user: &User,
        input: ChangePasswordInput,
    ) -> Result<(), UserServiceError> {
        let current_valid = verify_password(&input.current_password, &user.password_hash)
            .context("Failed to verify password")?;
        if !current_valid {
            return Err(UserServiceError::AuthenticationError(
                "Current password is incorrect".to_string(),
            ));
        }
        self.store_password(user.id, &input.new_password).await
    }

    /// Delete all expired sessions, returning how many went
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    async fn create_account(&self, input: &RegisterInput, role: UserRole) -> Result<User, UserServiceError> {
        let email = input.email.trim().to_lowercase();
        if email.is_empty() || input.password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Missing required parameter".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(UserServiceError::ValidationError(
                "Invalid email format".to_string(),
            ));
        }
        check_password(&input.password)?;

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists);
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = self
            .user_repo
            .create(&CreateUserInput {
                email,
                password_hash,
                role,
            })
            .await
            .context("Failed to create user")?;
        Ok(user)
    }

    async fn store_password(&self, id: i64, password: &str) -> Result<(), UserServiceError> {
        check_password(password)?;
        let hash = hash_password(password).context("Failed to hash password")?;
        self.user_repo
            .update_password(id, &hash)
            .await
            .context("Failed to update password")?;
        Ok(())
    }

    async fn load(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?
            .ok_or(UserServiceError::NotFound)
    }
}

fn require_super_admin(actor: &User) -> Result<(), UserServiceError> {
    if actor.is_super_admin() {
        Ok(())
    } else {
        Err(UserServiceError::Forbidden(
            "Super-admin access required".to_string(),
        ))
    }
}

fn check_password(password: &str) -> Result<(), UserServiceError> {
    if is_acceptable_password(password) {
        Ok(())
    } else {
        Err(UserServiceError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )))
    }
}
