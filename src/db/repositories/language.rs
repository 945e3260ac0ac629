//! Language repository
//!
//! The global language lookup table.

use crate::db::DynDatabasePool;
use crate::models::{Language, LanguageStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const SELECT_LANGUAGES: &str = "SELECT id, code, name, status, created_at FROM languages";

/// Language repository trait
#[async_trait]
pub trait LanguageRepository: Send + Sync {
    /// All languages ordered by id
    async fn list(&self) -> Result<Vec<Language>>;

    async fn get_by_code(&self, code: &str) -> Result<Option<Language>>;

    /// Insert the language unless the code is taken. Returns the stored row
    /// and whether it was created.
    async fn create_if_missing(
        &self,
        code: &str,
        name: &str,
        status: LanguageStatus,
    ) -> Result<(Language, bool)>;

    /// Update name and status of an existing language
    async fn update(&self, code: &str, name: &str, status: LanguageStatus) -> Result<Option<Language>>;
}

/// SQLx-based language repository implementation
pub struct SqlxLanguageRepository {
    pool: DynDatabasePool,
}

impl SqlxLanguageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LanguageRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LanguageRepository for SqlxLanguageRepository {
    async fn list(&self) -> Result<Vec<Language>> {
        let sql = format!("{} ORDER BY id", SELECT_LANGUAGES);
        let languages = on_pool!(self.pool, |pool| {
            sqlx::query(&sql)
                .fetch_all(pool)
                .await
                .context("Failed to list languages")?
                .iter()
                .map(|row| Language {
                    id: row.get("id"),
                    code: row.get("code"),
                    name: row.get("name"),
                    status: LanguageStatus::parse(row.get("status")),
                    created_at: row.get("created_at"),
                })
                .collect::<Vec<_>>()
        });
        Ok(languages)
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<Language>> {
        let sql = format!("{} WHERE code = ?", SELECT_LANGUAGES);
        let language = on_pool!(self.pool, |pool| {
            sqlx::query(&sql)
                .bind(code)
                .fetch_optional(pool)
                .await
                .context("Failed to get language")?
                .map(|row| Language {
                    id: row.get("id"),
                    code: row.get("code"),
                    name: row.get("name"),
                    status: LanguageStatus::parse(row.get("status")),
                    created_at: row.get("created_at"),
                })
        });
        Ok(language)
    }

    async fn create_if_missing(
        &self,
        code: &str,
        name: &str,
        status: LanguageStatus,
    ) -> Result<(Language, bool)> {
        if let Some(existing) = self.get_by_code(code).await? {
            return Ok((existing, false));
        }

        let now = Utc::now();
        on_pool!(self.pool, |pool| {
            sqlx::query("INSERT INTO languages (code, name, status, created_at) VALUES (?, ?, ?, ?)")
                .bind(code)
                .bind(name)
                .bind(status.as_str())
                .bind(now)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to create language '{}'", code))?;
        });

        let created = self
            .get_by_code(code)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Language '{}' missing after insert", code))?;
        Ok((created, true))
    }

    async fn update(&self, code: &str, name: &str, status: LanguageStatus) -> Result<Option<Language>> {
        if self.get_by_code(code).await?.is_none() {
            return Ok(None);
        }
        on_pool!(self.pool, |pool| {
            sqlx::query("UPDATE languages SET name = ?, status = ? WHERE code = ?")
                .bind(name)
                .bind(status.as_str())
                .bind(code)
                .execute(pool)
                .await
                .context("Failed to update language")?;
        });
        self.get_by_code(code).await
    }
}
