//! User model
//!
//! Users are either plain editors scoped to a set of assigned articles and
//! languages, or super-admins with unrestricted access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique, used for login)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// User role
    pub role: UserRole,
    /// Articles this user may read, edit, translate, export and delete
    #[serde(default)]
    pub assigned_articles: Vec<i64>,
    /// Languages this user may translate into
    #[serde(default)]
    pub assigned_languages: Vec<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with an already hashed password.
    ///
    /// Use `services::password::hash_password()` to hash the password.
    pub fn new(email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            email,
            password_hash,
            role,
            assigned_articles: Vec::new(),
            assigned_languages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }

    /// Check if the article is within this user's scope
    pub fn can_access_article(&self, article_id: i64) -> bool {
        self.is_super_admin() || self.assigned_articles.contains(&article_id)
    }

    /// Check if the user may edit content in the given language
    pub fn can_edit_language(&self, language: &str) -> bool {
        self.is_super_admin()
            || self
                .assigned_languages
                .iter()
                .any(|l| l.eq_ignore_ascii_case(language))
    }
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Editor limited to assigned articles and languages
    #[default]
    User,
    /// Unrestricted access, manages users, languages and pages
    SuperAdmin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "super_admin" | "superadmin" => Ok(UserRole::SuperAdmin),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub email: String,
    /// Password hash (already hashed)
    pub password_hash: String,
    pub role: UserRole,
}
