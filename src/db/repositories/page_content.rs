//! Static page repository

use crate::db::DynDatabasePool;
use crate::models::PageContent;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const SELECT_PAGES: &str =
    "SELECT id, slug, title, content, content_html, created_at, updated_at FROM pages_content";

/// A resolved page row, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub content_html: String,
}

/// Page repository trait
#[async_trait]
pub trait PageContentRepository: Send + Sync {
    /// All pages ordered by title
    async fn list(&self) -> Result<Vec<PageContent>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<PageContent>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<PageContent>>;

    async fn create(&self, page: &PageRecord) -> Result<PageContent>;

    async fn update(&self, id: i64, page: &PageRecord) -> Result<PageContent>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Check if another page already uses the slug
    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: i64) -> Result<bool>;
}

/// SQLx-based page repository implementation
pub struct SqlxPageContentRepository {
    pool: DynDatabasePool,
}

impl SqlxPageContentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PageContentRepository> {
        Arc::new(Self::new(pool))
    }
}

macro_rules! row_to_page {
    ($row:expr) => {
        PageContent {
            id: $row.get("id"),
            slug: $row.get("slug"),
            title: $row.get("title"),
            content: $row.get("content"),
            content_html: $row.get("content_html"),
            created_at: $row.get("created_at"),
            updated_at: $row.get("updated_at"),
        }
    };
}

#[async_trait]
impl PageContentRepository for SqlxPageContentRepository {
    async fn list(&self) -> Result<Vec<PageContent>> {
        let sql = format!("{} ORDER BY title", SELECT_PAGES);
        let pages = on_pool!(self.pool, |pool| {
            sqlx::query(&sql)
                .fetch_all(pool)
                .await
                .context("Failed to list pages")?
                .iter()
                .map(|row| row_to_page!(row))
                .collect::<Vec<_>>()
        });
        Ok(pages)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PageContent>> {
        let sql = format!("{} WHERE id = ?", SELECT_PAGES);
        let page = on_pool!(self.pool, |pool| {
            sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get page")?
                .map(|row| row_to_page!(row))
        });
        Ok(page)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<PageContent>> {
        let sql = format!("{} WHERE slug = ?", SELECT_PAGES);
        let page = on_pool!(self.pool, |pool| {
            sqlx::query(&sql)
                .bind(slug)
                .fetch_optional(pool)
                .await
                .context("Failed to get page by slug")?
                .map(|row| row_to_page!(row))
        });
        Ok(page)
    }

    async fn create(&self, page: &PageRecord) -> Result<PageContent> {
        let now = Utc::now();
        let sql = "INSERT INTO pages_content (slug, title, content, content_html, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)";
        on_pool!(self.pool, |pool| {
            sqlx::query(sql)
                .bind(&page.slug)
                .bind(&page.title)
                .bind(&page.content)
                .bind(&page.content_html)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create page")?;
        });

        self.get_by_slug(&page.slug)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Page not found after insert"))
    }

    async fn update(&self, id: i64, page: &PageRecord) -> Result<PageContent> {
        let now = Utc::now();
        let sql = "UPDATE pages_content SET slug = ?, title = ?, content = ?, content_html = ?, updated_at = ? WHERE id = ?";
        on_pool!(self.pool, |pool| {
            sqlx::query(sql)
                .bind(&page.slug)
                .bind(&page.title)
                .bind(&page.content)
                .bind(&page.content_html)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to update page")?;
        });

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Page not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |pool| {
            sqlx::query("DELETE FROM pages_content WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete page")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: i64) -> Result<bool> {
        let count: i64 = on_pool!(self.pool, |pool| {
            sqlx::query_scalar("SELECT COUNT(*) FROM pages_content WHERE slug = ? AND id != ?")
                .bind(slug)
                .bind(exclude_id)
                .fetch_one(pool)
                .await
                .context("Failed to check page slug")?
        });
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxPageContentRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxPageContentRepository::new(pool)
    }

    fn record(slug: &str, title: &str) -> PageRecord {
        PageRecord {
            slug: slug.to_string(),
            title: title.to_string(),
            content: "Hello".to_string(),
            content_html: "<p>Hello</p>\n".to_string(),
        }
    }

    #[tokio::test]
    async fn test_page_crud() {
        let repo = setup().await;

        let page = repo.create(&record("about", "About us")).await.unwrap();
        assert_eq!(repo.get_by_slug("about").await.unwrap().unwrap().id, page.id);

        let updated = repo.update(page.id, &record("about-us", "About us")).await.unwrap();
        assert_eq!(updated.slug, "about-us");
        assert!(repo.get_by_slug("about").await.unwrap().is_none());

        assert!(repo.delete(page.id).await.unwrap());
        assert!(!repo.delete(page.id).await.unwrap());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slug_uniqueness() {
        let repo = setup().await;
        let about = repo.create(&record("about", "About")).await.unwrap();
        repo.create(&record("privacy", "Privacy")).await.unwrap();

        assert!(repo.exists_by_slug_excluding("privacy", about.id).await.unwrap());
        assert!(!repo.exists_by_slug_excluding("about", about.id).await.unwrap());
        assert!(repo.create(&record("about", "Again")).await.is_err());
    }
}
