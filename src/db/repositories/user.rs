//! User repository
//!
//! Database operations for users and their article/language assignments.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreateUserInput, User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

const USER_COLUMNS: &str = "id, email, password_hash, role, created_at, updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, input: &CreateUserInput) -> Result<User>;

    /// Get user by ID, with assignments
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email, with assignments
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// List all users, with assignments, ordered by id
    async fn list(&self) -> Result<Vec<User>>;

    /// Count total users
    async fn count(&self) -> Result<i64>;

    /// Replace the stored password hash
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Replace the user's assigned article set
    async fn set_assigned_articles(&self, user_id: i64, article_ids: &[i64]) -> Result<()>;

    /// Add articles to the user's assigned set, keeping existing ones
    async fn add_assigned_articles(&self, user_id: i64, article_ids: &[i64]) -> Result<()>;

    /// Replace the user's assigned language set
    async fn set_assigned_languages(&self, user_id: i64, languages: &[String]) -> Result<()>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, input: &CreateUserInput) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.as_sqlite().unwrap(), input).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.as_mysql().unwrap(), input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_sqlite(self.pool.as_sqlite().unwrap(), &sql, UserKey::Id(id)).await
            }
            DatabaseDriver::Mysql => {
                get_user_mysql(self.pool.as_mysql().unwrap(), &sql, UserKey::Id(id)).await
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER(?)", USER_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_sqlite(self.pool.as_sqlite().unwrap(), &sql, UserKey::Email(email)).await
            }
            DatabaseDriver::Mysql => {
                get_user_mysql(self.pool.as_mysql().unwrap(), &sql, UserKey::Email(email)).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_users_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_users_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to count users")?,
            DatabaseDriver::Mysql => sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to count users")?,
        };
        Ok(count)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        let sql = "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?";
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(password_hash)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to update password")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(password_hash)
                    .bind(now)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to update password")?;
            }
        }
        Ok(())
    }

    async fn set_assigned_articles(&self, user_id: i64, article_ids: &[i64]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                assign_articles_sqlite(self.pool.as_sqlite().unwrap(), user_id, article_ids, true)
                    .await
            }
            DatabaseDriver::Mysql => {
                assign_articles_mysql(self.pool.as_mysql().unwrap(), user_id, article_ids, true)
                    .await
            }
        }
    }

    async fn add_assigned_articles(&self, user_id: i64, article_ids: &[i64]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                assign_articles_sqlite(self.pool.as_sqlite().unwrap(), user_id, article_ids, false)
                    .await
            }
            DatabaseDriver::Mysql => {
                assign_articles_mysql(self.pool.as_mysql().unwrap(), user_id, article_ids, false)
                    .await
            }
        }
    }

    async fn set_assigned_languages(&self, user_id: i64, languages: &[String]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                assign_languages_sqlite(self.pool.as_sqlite().unwrap(), user_id, languages).await
            }
            DatabaseDriver::Mysql => {
                assign_languages_mysql(self.pool.as_mysql().unwrap(), user_id, languages).await
            }
        }
    }
}

/// Lookup key for single-user queries
enum UserKey<'a> {
    Id(i64),
    Email(&'a str),
}

/// Per-user article ids and language codes
#[derive(Default)]
struct Assignments {
    articles: HashMap<i64, Vec<i64>>,
    languages: HashMap<i64, Vec<String>>,
}

impl Assignments {
    fn apply(&mut self, user: &mut User) {
        user.assigned_articles = self.articles.remove(&user.id).unwrap_or_default();
        user.assigned_languages = self.languages.remove(&user.id).unwrap_or_default();
    }
}

fn parse_role(raw: &str) -> UserRole {
    // Rows written by older tooling may carry unknown roles; they get no privileges
    UserRole::from_str(raw).unwrap_or_default()
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, input: &CreateUserInput) -> Result<User> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO users (email, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.email)
    .bind(&input.password_hash)
    .bind(input.role.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let mut user = User::new(input.email.clone(), input.password_hash.clone(), input.role);
    user.id = result.last_insert_rowid();
    user.created_at = now;
    user.updated_at = now;
    Ok(user)
}

async fn get_user_sqlite(pool: &SqlitePool, sql: &str, key: UserKey<'_>) -> Result<Option<User>> {
    let query = sqlx::query(sql);
    let query = match key {
        UserKey::Id(id) => query.bind(id),
        UserKey::Email(email) => query.bind(email),
    };
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut user = row_to_user_sqlite(&row)?;
    load_assignments_sqlite(pool, Some(user.id))
        .await?
        .apply(&mut user);
    Ok(Some(user))
}

async fn list_users_sqlite(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    let mut assignments = load_assignments_sqlite(pool, None).await?;
    rows.iter()
        .map(|row| {
            let mut user = row_to_user_sqlite(row)?;
            assignments.apply(&mut user);
            Ok(user)
        })
        .collect()
}

async fn load_assignments_sqlite(pool: &SqlitePool, user_id: Option<i64>) -> Result<Assignments> {
    let filter = if user_id.is_some() { " WHERE user_id = ?" } else { "" };
    let mut assignments = Assignments::default();

    let articles_sql = format!(
        "SELECT user_id, article_id FROM user_articles{} ORDER BY article_id",
        filter
    );
    let mut query = sqlx::query(&articles_sql);
    if let Some(id) = user_id {
        query = query.bind(id);
    }
    for row in query
        .fetch_all(pool)
        .await
        .context("Failed to load article assignments")?
    {
        assignments
            .articles
            .entry(row.get("user_id"))
            .or_default()
            .push(row.get("article_id"));
    }

    let languages_sql = format!(
        "SELECT user_id, language_code FROM user_languages{} ORDER BY language_code",
        filter
    );
    let mut query = sqlx::query(&languages_sql);
    if let Some(id) = user_id {
        query = query.bind(id);
    }
    for row in query
        .fetch_all(pool)
        .await
        .context("Failed to load language assignments")?
    {
        assignments
            .languages
            .entry(row.get("user_id"))
            .or_default()
            .push(row.get("language_code"));
    }

    Ok(assignments)
}

async fn assign_articles_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    article_ids: &[i64],
    replace: bool,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    if replace {
        sqlx::query("DELETE FROM user_articles WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear article assignments")?;
    }
    for article_id in article_ids {
        sqlx::query("INSERT OR IGNORE INTO user_articles (user_id, article_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(article_id)
            .execute(&mut *tx)
            .await
            .context("Failed to assign article")?;
    }
    tx.commit().await.context("Failed to save article assignments")?;
    Ok(())
}

async fn assign_languages_sqlite(pool: &SqlitePool, user_id: i64, languages: &[String]) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM user_languages WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear language assignments")?;
    for code in languages {
        sqlx::query("INSERT OR IGNORE INTO user_languages (user_id, language_code) VALUES (?, ?)")
            .bind(user_id)
            .bind(code)
            .execute(&mut *tx)
            .await
            .context("Failed to assign language")?;
    }
    tx.commit().await.context("Failed to save language assignments")?;
    Ok(())
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: parse_role(&role),
        assigned_articles: Vec::new(),
        assigned_languages: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, input: &CreateUserInput) -> Result<User> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO users (email, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.email)
    .bind(&input.password_hash)
    .bind(input.role.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let mut user = User::new(input.email.clone(), input.password_hash.clone(), input.role);
    user.id = result.last_insert_id() as i64;
    user.created_at = now;
    user.updated_at = now;
    Ok(user)
}

async fn get_user_mysql(pool: &MySqlPool, sql: &str, key: UserKey<'_>) -> Result<Option<User>> {
    let query = sqlx::query(sql);
    let query = match key {
        UserKey::Id(id) => query.bind(id),
        UserKey::Email(email) => query.bind(email),
    };
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get user")?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut user = row_to_user_mysql(&row)?;
    load_assignments_mysql(pool, Some(user.id))
        .await?
        .apply(&mut user);
    Ok(Some(user))
}

async fn list_users_mysql(pool: &MySqlPool) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    let mut assignments = load_assignments_mysql(pool, None).await?;
    rows.iter()
        .map(|row| {
            let mut user = row_to_user_mysql(row)?;
            assignments.apply(&mut user);
            Ok(user)
        })
        .collect()
}

async fn load_assignments_mysql(pool: &MySqlPool, user_id: Option<i64>) -> Result<Assignments> {
    let filter = if user_id.is_some() { " WHERE user_id = ?" } else { "" };
    let mut assignments = Assignments::default();

    let articles_sql = format!(
        "SELECT user_id, article_id FROM user_articles{} ORDER BY article_id",
        filter
    );
    let mut query = sqlx::query(&articles_sql);
    if let Some(id) = user_id {
        query = query.bind(id);
    }
    for row in query
        .fetch_all(pool)
        .await
        .context("Failed to load article assignments")?
    {
        assignments
            .articles
            .entry(row.get("user_id"))
            .or_default()
            .push(row.get("article_id"));
    }

    let languages_sql = format!(
        "SELECT user_id, language_code FROM user_languages{} ORDER BY language_code",
        filter
    );
    let mut query = sqlx::query(&languages_sql);
    if let Some(id) = user_id {
        query = query.bind(id);
    }
    for row in query
        .fetch_all(pool)
        .await
        .context("Failed to load language assignments")?
    {
        assignments
            .languages
            .entry(row.get("user_id"))
            .or_default()
            .push(row.get("language_code"));
    }

    Ok(assignments)
}

async fn assign_articles_mysql(
    pool: &MySqlPool,
    user_id: i64,
    article_ids: &[i64],
    replace: bool,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    if replace {
        sqlx::query("DELETE FROM user_articles WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear article assignments")?;
    }
    for article_id in article_ids {
        sqlx::query("INSERT IGNORE INTO user_articles (user_id, article_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(article_id)
            .execute(&mut *tx)
            .await
            .context("Failed to assign article")?;
    }
    tx.commit().await.context("Failed to save article assignments")?;
    Ok(())
}

async fn assign_languages_mysql(pool: &MySqlPool, user_id: i64, languages: &[String]) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM user_languages WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear language assignments")?;
    for code in languages {
        sqlx::query("INSERT IGNORE INTO user_languages (user_id, language_code) VALUES (?, ?)")
            .bind(user_id)
            .bind(code)
            .execute(&mut *tx)
            .await
            .context("Failed to assign language")?;
    }
    tx.commit().await.context("Failed to save language assignments")?;
    Ok(())
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: parse_role(&role),
        assigned_articles: Vec::new(),
        assigned_languages: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
