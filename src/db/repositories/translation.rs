//! Translation repository
//!
//! Per-language overlays of articles, unique per `(article_id, language)`.

use super::article::{bind_translation, NewTranslation};
use super::{decode_string_list, in_placeholders};
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Translation;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

pub(crate) const UPSERT_TRANSLATION_SQLITE: &str = r#"
    INSERT INTO translations (article_id, language, title, description, content, content_html,
        tags, canonical, og_title, og_description, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(article_id, language) DO UPDATE SET
        title = excluded.title,
        description = excluded.description,
        content = excluded.content,
        content_html = excluded.content_html,
        tags = excluded.tags,
        canonical = excluded.canonical,
        og_title = excluded.og_title,
        og_description = excluded.og_description,
        updated_at = excluded.updated_at
"#;

pub(crate) const UPSERT_TRANSLATION_MYSQL: &str = r#"
    INSERT INTO translations (article_id, language, title, description, content, content_html,
        tags, canonical, og_title, og_description, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON DUPLICATE KEY UPDATE
        title = VALUES(title),
        description = VALUES(description),
        content = VALUES(content),
        content_html = VALUES(content_html),
        tags = VALUES(tags),
        canonical = VALUES(canonical),
        og_title = VALUES(og_title),
        og_description = VALUES(og_description),
        updated_at = VALUES(updated_at)
"#;

const TRANSLATION_COLUMNS: &str = "id, article_id, language, title, description, content, content_html, \
     tags, canonical, og_title, og_description, created_at, updated_at";

/// Translation repository trait
#[async_trait]
pub trait TranslationRepository: Send + Sync {
    /// All translations of one article, ordered by language
    async fn list_for_article(&self, article_id: i64) -> Result<Vec<Translation>>;

    /// All translations of several articles
    async fn list_for_articles(&self, article_ids: &[i64]) -> Result<Vec<Translation>>;

    /// Insert or replace the translation for `(article_id, language)`
    async fn upsert(&self, article_id: i64, translation: &NewTranslation) -> Result<Translation>;

    /// Delete one translation. Returns false when none existed.
    async fn delete(&self, article_id: i64, language: &str) -> Result<bool>;
}

/// SQLx-based translation repository implementation
pub struct SqlxTranslationRepository {
    pool: DynDatabasePool,
}

impl SqlxTranslationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TranslationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TranslationRepository for SqlxTranslationRepository {
    async fn list_for_article(&self, article_id: i64) -> Result<Vec<Translation>> {
        self.list_for_articles(&[article_id]).await
    }

    async fn list_for_articles(&self, article_ids: &[i64]) -> Result<Vec<Translation>> {
        if article_ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_translations_sqlite(self.pool.as_sqlite().unwrap(), article_ids).await
            }
            DatabaseDriver::Mysql => {
                list_translations_mysql(self.pool.as_mysql().unwrap(), article_ids).await
            }
        }
    }

    async fn upsert(&self, article_id: i64, translation: &NewTranslation) -> Result<Translation> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                upsert_translation_sqlite(self.pool.as_sqlite().unwrap(), article_id, translation)
                    .await
            }
            DatabaseDriver::Mysql => {
                upsert_translation_mysql(self.pool.as_mysql().unwrap(), article_id, translation)
                    .await
            }
        }
    }

    async fn delete(&self, article_id: i64, language: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_translation_sqlite(self.pool.as_sqlite().unwrap(), article_id, language)
                    .await
            }
            DatabaseDriver::Mysql => {
                delete_translation_mysql(self.pool.as_mysql().unwrap(), article_id, language).await
            }
        }
    }
}

fn list_sql(count: usize) -> String {
    format!(
        "SELECT {} FROM translations WHERE article_id IN ({}) ORDER BY article_id, language",
        TRANSLATION_COLUMNS,
        in_placeholders(count)
    )
}

fn get_sql() -> String {
    format!(
        "SELECT {} FROM translations WHERE article_id = ? AND language = ?",
        TRANSLATION_COLUMNS
    )
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_translations_sqlite(pool: &SqlitePool, article_ids: &[i64]) -> Result<Vec<Translation>> {
    let mut translations = Vec::new();
    for chunk in article_ids.chunks(500) {
        let sql = list_sql(chunk.len());
        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(pool)
            .await
            .context("Failed to list translations")?;
        for row in &rows {
            translations.push(row_to_translation_sqlite(row)?);
        }
    }
    Ok(translations)
}

async fn upsert_translation_sqlite(
    pool: &SqlitePool,
    article_id: i64,
    translation: &NewTranslation,
) -> Result<Translation> {
    let now = Utc::now();
    bind_translation!(sqlx::query(UPSERT_TRANSLATION_SQLITE), article_id, translation, now)
        .execute(pool)
        .await
        .context("Failed to upsert translation")?;

    let row = sqlx::query(&get_sql())
        .bind(article_id)
        .bind(&translation.language)
        .fetch_one(pool)
        .await
        .context("Failed to read back translation")?;
    row_to_translation_sqlite(&row)
}

async fn delete_translation_sqlite(pool: &SqlitePool, article_id: i64, language: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM translations WHERE article_id = ? AND LOWER(language) = LOWER(?)")
        .bind(article_id)
        .bind(language)
        .execute(pool)
        .await
        .context("Failed to delete translation")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_translation_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Translation> {
    Ok(Translation {
        id: row.get("id"),
        article_id: row.get("article_id"),
        language: row.get("language"),
        title: row.get("title"),
        description: row.get("description"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        tags: decode_string_list(row.get("tags")),
        canonical: row.get("canonical"),
        og_title: row.get("og_title"),
        og_description: row.get("og_description"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_translations_mysql(pool: &MySqlPool, article_ids: &[i64]) -> Result<Vec<Translation>> {
    let mut translations = Vec::new();
    for chunk in article_ids.chunks(500) {
        let sql = list_sql(chunk.len());
        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(pool)
            .await
            .context("Failed to list translations")?;
        for row in &rows {
            translations.push(row_to_translation_mysql(row)?);
        }
    }
    Ok(translations)
}

async fn upsert_translation_mysql(
    pool: &MySqlPool,
    article_id: i64,
    translation: &NewTranslation,
) -> Result<Translation> {
    let now = Utc::now();
    bind_translation!(sqlx::query(UPSERT_TRANSLATION_MYSQL), article_id, translation, now)
        .execute(pool)
        .await
        .context("Failed to upsert translation")?;

    let row = sqlx::query(&get_sql())
        .bind(article_id)
        .bind(&translation.language)
        .fetch_one(pool)
        .await
        .context("Failed to read back translation")?;
    row_to_translation_mysql(&row)
}

async fn delete_translation_mysql(pool: &MySqlPool, article_id: i64, language: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM translations WHERE article_id = ? AND LOWER(language) = LOWER(?)")
        .bind(article_id)
        .bind(language)
        .execute(pool)
        .await
        .context("Failed to delete translation")?;

    Ok(result.rows_affected() > 0)
}

fn row_to_translation_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Translation> {
    Ok(Translation {
        id: row.get("id"),
        article_id: row.get("article_id"),
        language: row.get("language"),
        title: row.get("title"),
        description: row.get("description"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        tags: decode_string_list(row.get("tags")),
        canonical: row.get("canonical"),
        og_title: row.get("og_title"),
        og_description: row.get("og_description"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
