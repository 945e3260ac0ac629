//! Page service
//!
//! Static pages (about, privacy, ...) served at `/{slug}` when no article
//! claims the slug.

use crate::cache::{CacheLayer, MemoryCache};
use crate::db::repositories::{PageContentRepository, PageRecord};
use crate::models::{CreatePageInput, PageContent, UpdatePageInput, User};
use crate::services::article::generate_slug;
use crate::services::MarkdownRenderer;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

const CACHE_KEY_PAGE_SLUG: &str = "page:slug:";

#[derive(Debug, thiserror::Error)]
pub enum PageServiceError {
    #[error("Page not found")]
    NotFound,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PageService {
    repo: Arc<dyn PageContentRepository>,
    cache: Arc<MemoryCache>,
    markdown: MarkdownRenderer,
    cache_ttl: Duration,
}

impl PageService {
    pub fn new(repo: Arc<dyn PageContentRepository>, cache: Arc<MemoryCache>) -> Self {
        let cache_ttl = cache.default_ttl();
        Self {
            repo,
            cache,
            markdown: MarkdownRenderer::new(),
            cache_ttl,
        }
    }

    pub async fn list(&self) -> Result<Vec<PageContent>, PageServiceError> {
        Ok(self.repo.list().await.context("Failed to list pages")?)
    }

    pub async fn get(&self, id: i64) -> Result<PageContent, PageServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get page")?
            .ok_or(PageServiceError::NotFound)
    }

    /// Cached lookup for public rendering
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<PageContent>, PageServiceError> {
        let key = format!("{}{}", CACHE_KEY_PAGE_SLUG, slug);
        if let Some(page) = self.cache.get::<PageContent>(&key).await.ok().flatten() {
            return Ok(Some(page));
        }

        let page = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get page by slug")?;
        if let Some(ref page) = page {
            let _ = self.cache.set(&key, page, self.cache_ttl).await;
        }
        Ok(page)
    }

    pub async fn create(&self, actor: &User, input: CreatePageInput) -> Result<PageContent, PageServiceError> {
        require_super_admin(actor)?;

        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(PageServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        let slug = self.resolve_slug(&input.slug, &title, 0).await?;

        let page = self
            .repo
            .create(&PageRecord {
                content_html: self.markdown.render(&input.content),
                slug,
                title,
                content: input.content,
            })
            .await
            .context("Failed to create page")?;

        tracing::info!("Page '{}' created by {}", page.slug, actor.email);
        Ok(page)
    }

    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdatePageInput,
    ) -> Result<PageContent, PageServiceError> {
        require_super_admin(actor)?;
        let existing = self.get(id).await?;

        let title = match input.title {
            Some(title) if title.trim().is_empty() => {
                return Err(PageServiceError::ValidationError(
                    "Title cannot be empty".to_string(),
                ))
            }
            Some(title) => title.trim().to_string(),
            None => existing.title.clone(),
        };
        let slug = match input.slug {
            Some(slug) => self.resolve_slug(&slug, &title, id).await?,
            None => existing.slug.clone(),
        };
        let (content, content_html) = match input.content {
            Some(content) => {
                let html = self.markdown.render(&content);
                (content, html)
            }
            None => (existing.content, existing.content_html),
        };

        let page = self
            .repo
            .update(
                id,
                &PageRecord {
                    slug,
                    title,
                    content,
                    content_html,
                },
            )
            .await
            .context("Failed to update page")?;

        self.invalidate(&existing.slug).await;
        self.invalidate(&page.slug).await;
        Ok(page)
    }

    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), PageServiceError> {
        require_super_admin(actor)?;
        let existing = self.get(id).await?;

        if !self.repo.delete(id).await.context("Failed to delete page")? {
            return Err(PageServiceError::NotFound);
        }
        self.invalidate(&existing.slug).await;
        tracing::info!("Page '{}' deleted by {}", existing.slug, actor.email);
        Ok(())
    }

    /// Explicit slug normalized, or one generated from the title
    async fn resolve_slug(&self, raw: &str, title: &str, exclude_id: i64) -> Result<String, PageServiceError> {
        let slug = match generate_slug(raw) {
            s if s.is_empty() => generate_slug(title),
            s => s,
        };
        if slug.is_empty() {
            return Err(PageServiceError::ValidationError(
                "Slug cannot be empty".to_string(),
            ));
        }

        if self
            .repo
            .exists_by_slug_excluding(&slug, exclude_id)
            .await
            .context("Failed to check slug")?
        {
            return Err(PageServiceError::ValidationError(format!(
                "Page with slug '{}' already exists",
                slug
            )));
        }
        Ok(slug)
    }

    async fn invalidate(&self, slug: &str) {
        let _ = self
            .cache
            .delete(&format!("{}{}", CACHE_KEY_PAGE_SLUG, slug))
            .await;
    }
}

fn require_super_admin(actor: &User) -> Result<(), PageServiceError> {
    if actor.is_super_admin() {
        Ok(())
    } else {
        Err(PageServiceError::Forbidden(
            "Super-admin access required".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxPageContentRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::UserRole;

    async fn service() -> PageService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        PageService::new(
            SqlxPageContentRepository::boxed(pool),
            Arc::new(MemoryCache::new()),
        )
    }

    fn admin() -> User {
        User::new("root@example.com".into(), "x".into(), UserRole::SuperAdmin)
    }

    fn input(slug: &str, title: &str) -> CreatePageInput {
        CreatePageInput {
            slug: slug.into(),
            title: title.into(),
            content: "We are **a clinic**.".into(),
        }
    }

    #[tokio::test]
    async fn test_create_generates_slug_and_html() {
        let service = service().await;
        let page = service.create(&admin(), input("", "About Us")).await.unwrap();
        assert_eq!(page.slug, "about-us");
        assert!(page.content_html.contains("<strong>a clinic</strong>"));

        let fetched = service.get_by_slug("about-us").await.unwrap().unwrap();
        assert_eq!(fetched.id, page.id);
        assert!(service.get_by_slug("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_rejected() {
        let service = service().await;
        let admin = admin();
        service.create(&admin, input("privacy", "Privacy")).await.unwrap();

        let dup = service.create(&admin, input("Privacy", "Another")).await;
        assert!(matches!(dup, Err(PageServiceError::ValidationError(_))));

        let other = service.create(&admin, input("terms", "Terms")).await.unwrap();
        let clash = service
            .update(
                &admin,
                other.id,
                UpdatePageInput {
                    slug: Some("privacy".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(clash, Err(PageServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_update_refreshes_cache() {
        let service = service().await;
        let admin = admin();
        let page = service.create(&admin, input("about", "About")).await.unwrap();
        service.get_by_slug("about").await.unwrap();

        service
            .update(
                &admin,
                page.id,
                UpdatePageInput {
                    title: Some("About ClinicLane".into()),
                    content: Some("# Hello".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let fresh = service.get_by_slug("about").await.unwrap().unwrap();
        assert_eq!(fresh.title, "About ClinicLane");
        assert!(fresh.content_html.contains("<h1>Hello</h1>"));
    }

    #[tokio::test]
    async fn test_delete_and_permissions() {
        let service = service().await;
        let admin = admin();
        let page = service.create(&admin, input("about", "About")).await.unwrap();

        let editor = User::new("e@example.com".into(), "x".into(), UserRole::User);
        let denied = service.delete(&editor, page.id).await;
        assert!(matches!(denied, Err(PageServiceError::Forbidden(_))));

        service.get_by_slug("about").await.unwrap();
        service.delete(&admin, page.id).await.unwrap();
        assert!(service.get_by_slug("about").await.unwrap().is_none());
        assert!(matches!(service.get(page.id).await, Err(PageServiceError::NotFound)));
    }
}
