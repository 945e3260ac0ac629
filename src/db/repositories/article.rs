//! Article repository
//!
//! Database operations for articles, including the transactional bulk
//! write used by the importer.
//!
//! This module provides:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait for SQLite and MySQL

use super::translation::{UPSERT_TRANSLATION_MYSQL, UPSERT_TRANSLATION_SQLITE};
use super::{decode_string_list, in_placeholders};
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Article;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Maximum bound parameters per `IN (...)` query
const IN_CHUNK: usize = 500;

macro_rules! article_columns {
    () => {
        "id, slug, title, description, tags, language, content, content_html, author, canonical, \
         og_title, og_description, og_image, header_image, images, publish_date, created_at, updated_at"
    };
}

const INSERT_ARTICLE: &str = r#"
    INSERT INTO articles (slug, title, description, tags, language, content, content_html, author,
        canonical, og_title, og_description, og_image, header_image, images, publish_date, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_ARTICLE: &str = r#"
    UPDATE articles
    SET slug = ?, title = ?, description = ?, tags = ?, language = ?, content = ?, content_html = ?,
        author = ?, canonical = ?, og_title = ?, og_description = ?, og_image = ?, header_image = ?,
        images = ?, publish_date = ?, updated_at = ?
    WHERE id = ?
"#;

const SELECT_BY_ID: &str = concat!("SELECT ", article_columns!(), " FROM articles WHERE id = ?");
const SELECT_BY_SLUG: &str = concat!("SELECT ", article_columns!(), " FROM articles WHERE slug = ?");
const SELECT_ALL: &str = concat!(
    "SELECT ",
    article_columns!(),
    " FROM articles ORDER BY publish_date DESC, id DESC"
);

const INSERT_ASSIGNMENT_SQLITE: &str =
    "INSERT OR IGNORE INTO user_articles (user_id, article_id) VALUES (?, ?)";
const INSERT_ASSIGNMENT_MYSQL: &str =
    "INSERT IGNORE INTO user_articles (user_id, article_id) VALUES (?, ?)";

/// A fully resolved article, ready to be written.
///
/// The slug is already normalized and the HTML already rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub language: String,
    pub content: String,
    pub content_html: String,
    pub author: Option<String>,
    pub canonical: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub header_image: Option<String>,
    pub images: Vec<String>,
    pub publish_date: DateTime<Utc>,
}

impl From<&Article> for NewArticle {
    fn from(article: &Article) -> Self {
        Self {
            slug: article.slug.clone(),
            title: article.title.clone(),
            description: article.description.clone(),
            tags: article.tags.clone(),
            language: article.language.clone(),
            content: article.content.clone(),
            content_html: article.content_html.clone(),
            author: article.author.clone(),
            canonical: article.canonical.clone(),
            og_title: article.og_title.clone(),
            og_description: article.og_description.clone(),
            og_image: article.og_image.clone(),
            header_image: article.header_image.clone(),
            images: article.images.clone(),
            publish_date: article.publish_date,
        }
    }
}

/// A fully resolved translation, ready to be upserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewTranslation {
    pub language: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub content_html: String,
    pub tags: Vec<String>,
    pub canonical: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
}

/// Which article an imported translation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationTarget {
    /// An article already stored in the database
    Existing(i64),
    /// The article at this index of the same batch
    Batch(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportTranslation {
    pub target: TranslationTarget,
    pub translation: NewTranslation,
}

/// Result of a committed import batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Ids of the created articles, in batch order
    pub article_ids: Vec<i64>,
    /// Number of translations inserted or updated
    pub translation_count: usize,
}

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert a new article
    async fn create(&self, article: &NewArticle) -> Result<Article>;

    /// Get article by ID (without translations)
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Get article by slug (without translations)
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    /// List every article, newest publish date first
    async fn list(&self) -> Result<Vec<Article>>;

    /// List the given articles, newest publish date first. Unknown ids are skipped.
    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<Article>>;

    /// Replace every column of an article
    async fn update(&self, id: i64, article: &NewArticle) -> Result<Article>;

    /// Delete an article. Translations and assignments cascade.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Delete several articles, returning how many rows went away
    async fn delete_many(&self, ids: &[i64]) -> Result<u64>;

    /// Check if a slug already exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Check if a slug exists for a different article (for updates)
    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: i64) -> Result<bool>;

    /// Return the subset of `slugs` already taken
    async fn existing_slugs(&self, slugs: &[String]) -> Result<Vec<String>>;

    /// Write a whole import batch in one transaction.
    ///
    /// When `assign_to` is set, every created article is added to that
    /// user's assigned set.
    async fn import_batch(
        &self,
        articles: &[NewArticle],
        translations: &[ImportTranslation],
        assign_to: Option<i64>,
    ) -> Result<ImportOutcome>;
}

/// SQLx-based article repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &NewArticle) -> Result<Article> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_article_sqlite(self.pool.as_sqlite().unwrap(), article).await
            }
            DatabaseDriver::Mysql => {
                create_article_mysql(self.pool.as_mysql().unwrap(), article).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_one_sqlite(self.pool.as_sqlite().unwrap(), SELECT_BY_ID, id).await
            }
            DatabaseDriver::Mysql => {
                fetch_one_mysql(self.pool.as_mysql().unwrap(), SELECT_BY_ID, id).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                fetch_one_sqlite(self.pool.as_sqlite().unwrap(), SELECT_BY_SLUG, slug).await
            }
            DatabaseDriver::Mysql => {
                fetch_one_mysql(self.pool.as_mysql().unwrap(), SELECT_BY_SLUG, slug).await
            }
        }
    }

    async fn list(&self) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_articles_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => list_articles_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<Article>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut articles = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_articles_by_ids_sqlite(self.pool.as_sqlite().unwrap(), ids).await?
            }
            DatabaseDriver::Mysql => {
                list_articles_by_ids_mysql(self.pool.as_mysql().unwrap(), ids).await?
            }
        };
        // Chunked fetches come back grouped per chunk
        articles.sort_by(|a, b| b.publish_date.cmp(&a.publish_date).then(b.id.cmp(&a.id)));
        Ok(articles)
    }

    async fn update(&self, id: i64, article: &NewArticle) -> Result<Article> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_article_sqlite(self.pool.as_sqlite().unwrap(), id, article).await
            }
            DatabaseDriver::Mysql => {
                update_article_mysql(self.pool.as_mysql().unwrap(), id, article).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.delete_many(&[id]).await.map(|_| ())
    }

    async fn delete_many(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_articles_sqlite(self.pool.as_sqlite().unwrap(), ids).await
            }
            DatabaseDriver::Mysql => delete_articles_mysql(self.pool.as_mysql().unwrap(), ids).await,
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        // No real article has id 0
        self.exists_by_slug_excluding(slug, 0).await
    }

    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_by_slug_excluding_sqlite(self.pool.as_sqlite().unwrap(), slug, exclude_id)
                    .await
            }
            DatabaseDriver::Mysql => {
                exists_by_slug_excluding_mysql(self.pool.as_mysql().unwrap(), slug, exclude_id)
                    .await
            }
        }
    }

    async fn existing_slugs(&self, slugs: &[String]) -> Result<Vec<String>> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                existing_slugs_sqlite(self.pool.as_sqlite().unwrap(), slugs).await
            }
            DatabaseDriver::Mysql => existing_slugs_mysql(self.pool.as_mysql().unwrap(), slugs).await,
        }
    }

    async fn import_batch(
        &self,
        articles: &[NewArticle],
        translations: &[ImportTranslation],
        assign_to: Option<i64>,
    ) -> Result<ImportOutcome> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                import_batch_sqlite(self.pool.as_sqlite().unwrap(), articles, translations, assign_to)
                    .await
            }
            DatabaseDriver::Mysql => {
                import_batch_mysql(self.pool.as_mysql().unwrap(), articles, translations, assign_to)
                    .await
            }
        }
    }
}

/// Bind the `INSERT_ARTICLE` parameters in column order
macro_rules! bind_insert {
    ($query:expr, $a:expr, $now:expr) => {
        $query
            .bind(&$a.slug)
            .bind(&$a.title)
            .bind(&$a.description)
            .bind($crate::db::repositories::encode_string_list(&$a.tags))
            .bind(&$a.language)
            .bind(&$a.content)
            .bind(&$a.content_html)
            .bind(&$a.author)
            .bind(&$a.canonical)
            .bind(&$a.og_title)
            .bind(&$a.og_description)
            .bind(&$a.og_image)
            .bind(&$a.header_image)
            .bind($crate::db::repositories::encode_string_list(&$a.images))
            .bind($a.publish_date)
            .bind($now)
            .bind($now)
    };
}

/// Bind the `UPDATE_ARTICLE` parameters in column order
macro_rules! bind_update {
    ($query:expr, $a:expr, $now:expr, $id:expr) => {
        $query
            .bind(&$a.slug)
            .bind(&$a.title)
            .bind(&$a.description)
            .bind($crate::db::repositories::encode_string_list(&$a.tags))
            .bind(&$a.language)
            .bind(&$a.content)
            .bind(&$a.content_html)
            .bind(&$a.author)
            .bind(&$a.canonical)
            .bind(&$a.og_title)
            .bind(&$a.og_description)
            .bind(&$a.og_image)
            .bind(&$a.header_image)
            .bind($crate::db::repositories::encode_string_list(&$a.images))
            .bind($a.publish_date)
            .bind($now)
            .bind($id)
    };
}

/// Bind the translation upsert parameters in column order
macro_rules! bind_translation {
    ($query:expr, $article_id:expr, $t:expr, $now:expr) => {
        $query
            .bind($article_id)
            .bind(&$t.language)
            .bind(&$t.title)
            .bind(&$t.description)
            .bind(&$t.content)
            .bind(&$t.content_html)
            .bind($crate::db::repositories::encode_string_list(&$t.tags))
            .bind(&$t.canonical)
            .bind(&$t.og_title)
            .bind(&$t.og_description)
            .bind($now)
            .bind($now)
    };
}

pub(crate) use bind_translation;

fn stored_article(id: i64, article: &NewArticle, now: DateTime<Utc>) -> Article {
    Article {
        id,
        slug: article.slug.clone(),
        title: article.title.clone(),
        description: article.description.clone(),
        tags: article.tags.clone(),
        language: article.language.clone(),
        content: article.content.clone(),
        content_html: article.content_html.clone(),
        author: article.author.clone(),
        canonical: article.canonical.clone(),
        og_title: article.og_title.clone(),
        og_description: article.og_description.clone(),
        og_image: article.og_image.clone(),
        header_image: article.header_image.clone(),
        images: article.images.clone(),
        publish_date: article.publish_date,
        created_at: now,
        updated_at: now,
        translations: Vec::new(),
    }
}

fn resolve_target(target: TranslationTarget, created: &[i64]) -> Result<i64> {
    match target {
        TranslationTarget::Existing(id) => Ok(id),
        TranslationTarget::Batch(idx) => created
            .get(idx)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Translation refers to missing batch entry {}", idx)),
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_article_sqlite(pool: &SqlitePool, article: &NewArticle) -> Result<Article> {
    let now = Utc::now();
    let result = bind_insert!(sqlx::query(INSERT_ARTICLE), article, now)
        .execute(pool)
        .await
        .context("Failed to create article")?;

    Ok(stored_article(result.last_insert_rowid(), article, now))
}

async fn fetch_one_sqlite<'q, T>(pool: &SqlitePool, sql: &'q str, key: T) -> Result<Option<Article>>
where
    T: 'q + Send + sqlx::Encode<'q, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    let row = sqlx::query(sql)
        .bind(key)
        .fetch_optional(pool)
        .await
        .context("Failed to get article")?;

    row.as_ref().map(row_to_article_sqlite).transpose()
}

async fn list_articles_sqlite(pool: &SqlitePool) -> Result<Vec<Article>> {
    let rows = sqlx::query(SELECT_ALL)
        .fetch_all(pool)
        .await
        .context("Failed to list articles")?;

    rows.iter().map(row_to_article_sqlite).collect()
}

async fn list_articles_by_ids_sqlite(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Article>> {
    let mut articles = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(IN_CHUNK) {
        let sql = format!(
            "SELECT {} FROM articles WHERE id IN ({})",
            article_columns!(),
            in_placeholders(chunk.len())
        );
        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(pool)
            .await
            .context("Failed to list articles by ids")?;
        for row in &rows {
            articles.push(row_to_article_sqlite(row)?);
        }
    }
    Ok(articles)
}

async fn update_article_sqlite(pool: &SqlitePool, id: i64, article: &NewArticle) -> Result<Article> {
    let now = Utc::now();
    bind_update!(sqlx::query(UPDATE_ARTICLE), article, now, id)
        .execute(pool)
        .await
        .context("Failed to update article")?;

    fetch_one_sqlite(pool, SELECT_BY_ID, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Article not found after update"))
}

async fn delete_articles_sqlite(pool: &SqlitePool, ids: &[i64]) -> Result<u64> {
    let mut removed = 0;
    for chunk in ids.chunks(IN_CHUNK) {
        let sql = format!("DELETE FROM articles WHERE id IN ({})", in_placeholders(chunk.len()));
        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id);
        }
        removed += query
            .execute(pool)
            .await
            .context("Failed to delete articles")?
            .rows_affected();
    }
    Ok(removed)
}

async fn exists_by_slug_excluding_sqlite(pool: &SqlitePool, slug: &str, exclude_id: i64) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM articles WHERE slug = ? AND id != ?")
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
        .context("Failed to check slug existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn existing_slugs_sqlite(pool: &SqlitePool, slugs: &[String]) -> Result<Vec<String>> {
    let mut found = Vec::new();
    for chunk in slugs.chunks(IN_CHUNK) {
        let sql = format!(
            "SELECT slug FROM articles WHERE slug IN ({})",
            in_placeholders(chunk.len())
        );
        let mut query = sqlx::query(&sql);
        for slug in chunk {
            query = query.bind(slug);
        }
        let rows = query
            .fetch_all(pool)
            .await
            .context("Failed to look up existing slugs")?;
        found.extend(rows.iter().map(|row| row.get::<String, _>("slug")));
    }
    Ok(found)
}

async fn import_batch_sqlite(
    pool: &SqlitePool,
    articles: &[NewArticle],
    translations: &[ImportTranslation],
    assign_to: Option<i64>,
) -> Result<ImportOutcome> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to start import transaction")?;
    let mut outcome = ImportOutcome::default();

    for article in articles {
        let result = bind_insert!(sqlx::query(INSERT_ARTICLE), article, now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to import article '{}'", article.slug))?;
        outcome.article_ids.push(result.last_insert_rowid());
    }

    for item in translations {
        let article_id = resolve_target(item.target, &outcome.article_ids)?;
        bind_translation!(sqlx::query(UPSERT_TRANSLATION_SQLITE), article_id, item.translation, now)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!("Failed to import {} translation", item.translation.language)
            })?;
        outcome.translation_count += 1;
    }

    if let Some(user_id) = assign_to {
        for article_id in &outcome.article_ids {
            sqlx::query(INSERT_ASSIGNMENT_SQLITE)
                .bind(user_id)
                .bind(article_id)
                .execute(&mut *tx)
                .await
                .context("Failed to assign imported article")?;
        }
    }

    tx.commit().await.context("Failed to commit import")?;
    Ok(outcome)
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Article> {
    Ok(Article {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        description: row.get("description"),
        tags: decode_string_list(row.get("tags")),
        language: row.get("language"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        author: row.get("author"),
        canonical: row.get("canonical"),
        og_title: row.get("og_title"),
        og_description: row.get("og_description"),
        og_image: row.get("og_image"),
        header_image: row.get("header_image"),
        images: decode_string_list(row.get("images")),
        publish_date: row.get("publish_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        translations: Vec::new(),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_article_mysql(pool: &MySqlPool, article: &NewArticle) -> Result<Article> {
    let now = Utc::now();
    let result = bind_insert!(sqlx::query(INSERT_ARTICLE), article, now)
        .execute(pool)
        .await
        .context("Failed to create article")?;

    Ok(stored_article(result.last_insert_id() as i64, article, now))
}

async fn fetch_one_mysql<'q, T>(pool: &MySqlPool, sql: &'q str, key: T) -> Result<Option<Article>>
where
    T: 'q + Send + sqlx::Encode<'q, sqlx::MySql> + sqlx::Type<sqlx::MySql>,
{
    let row = sqlx::query(sql)
        .bind(key)
        .fetch_optional(pool)
        .await
        .context("Failed to get article")?;

    row.as_ref().map(row_to_article_mysql).transpose()
}

async fn list_articles_mysql(pool: &MySqlPool) -> Result<Vec<Article>> {
    let rows = sqlx::query(SELECT_ALL)
        .fetch_all(pool)
        .await
        .context("Failed to list articles")?;

    rows.iter().map(row_to_article_mysql).collect()
}

async fn list_articles_by_ids_mysql(pool: &MySqlPool, ids: &[i64]) -> Result<Vec<Article>> {
    let mut articles = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(IN_CHUNK) {
        let sql = format!(
            "SELECT {} FROM articles WHERE id IN ({})",
            article_columns!(),
            in_placeholders(chunk.len())
        );
        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(pool)
            .await
            .context("Failed to list articles by ids")?;
        for row in &rows {
            articles.push(row_to_article_mysql(row)?);
        }
    }
    Ok(articles)
}

async fn update_article_mysql(pool: &MySqlPool, id: i64, article: &NewArticle) -> Result<Article> {
    let now = Utc::now();
    bind_update!(sqlx::query(UPDATE_ARTICLE), article, now, id)
        .execute(pool)
        .await
        .context("Failed to update article")?;

    fetch_one_mysql(pool, SELECT_BY_ID, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Article not found after update"))
}

async fn delete_articles_mysql(pool: &MySqlPool, ids: &[i64]) -> Result<u64> {
    let mut removed = 0;
    for chunk in ids.chunks(IN_CHUNK) {
        let sql = format!("DELETE FROM articles WHERE id IN ({})", in_placeholders(chunk.len()));
        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id);
        }
        removed += query
            .execute(pool)
            .await
            .context("Failed to delete articles")?
            .rows_affected();
    }
    Ok(removed)
}

async fn exists_by_slug_excluding_mysql(pool: &MySqlPool, slug: &str, exclude_id: i64) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM articles WHERE slug = ? AND id != ?")
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
        .context("Failed to check slug existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn existing_slugs_mysql(pool: &MySqlPool, slugs: &[String]) -> Result<Vec<String>> {
    let mut found = Vec::new();
    for chunk in slugs.chunks(IN_CHUNK) {
        let sql = format!(
            "SELECT slug FROM articles WHERE slug IN ({})",
            in_placeholders(chunk.len())
        );
        let mut query = sqlx::query(&sql);
        for slug in chunk {
            query = query.bind(slug);
        }
        let rows = query
            .fetch_all(pool)
            .await
            .context("Failed to look up existing slugs")?;
        found.extend(rows.iter().map(|row| row.get::<String, _>("slug")));
    }
    Ok(found)
}

async fn import_batch_mysql(
    pool: &MySqlPool,
    articles: &[NewArticle],
    translations: &[ImportTranslation],
    assign_to: Option<i64>,
) -> Result<ImportOutcome> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to start import transaction")?;
    let mut outcome = ImportOutcome::default();

    for article in articles {
        let result = bind_insert!(sqlx::query(INSERT_ARTICLE), article, now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to import article '{}'", article.slug))?;
        outcome.article_ids.push(result.last_insert_id() as i64);
    }

    for item in translations {
        let article_id = resolve_target(item.target, &outcome.article_ids)?;
        bind_translation!(sqlx::query(UPSERT_TRANSLATION_MYSQL), article_id, item.translation, now)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!("Failed to import {} translation", item.translation.language)
            })?;
        outcome.translation_count += 1;
    }

    if let Some(user_id) = assign_to {
        for article_id in &outcome.article_ids {
            sqlx::query(INSERT_ASSIGNMENT_MYSQL)
                .bind(user_id)
                .bind(article_id)
                .execute(&mut *tx)
                .await
                .context("Failed to assign imported article")?;
        }
    }

    tx.commit().await.context("Failed to commit import")?;
    Ok(outcome)
}

fn row_to_article_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Article> {
    Ok(Article {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        description: row.get("description"),
        tags: decode_string_list(row.get("tags")),
        language: row.get("language"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        author: row.get("author"),
        canonical: row.get("canonical"),
        og_title: row.get("og_title"),
        og_description: row.get("og_description"),
        og_image: row.get("og_image"),
        header_image: row.get("header_image"),
        images: decode_string_list(row.get("images")),
        publish_date: row.get("publish_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        translations: Vec::new(),
    })
}
