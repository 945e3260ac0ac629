//! Article service
//!
//! Business logic for articles:
//! - CRUD scoped to the acting user's assigned set
//! - Translations per language
//! - Localized public reads backed by the cache

use crate::cache::{CacheLayer, MemoryCache};
use crate::db::repositories::{
    ArticleRepository, LanguageRepository, NewArticle, NewTranslation, TranslationRepository,
    UserRepository,
};
use crate::models::{
    Article, CreateArticleInput, ListParams, PagedResult, Translation, TranslationInput,
    UpdateArticleInput, User, DEFAULT_LANGUAGE,
};
use crate::services::localization::{filter_by_language, localize};
use crate::services::markdown::MarkdownRenderer;
use anyhow::Context;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Cache key prefix for a single article (with translations) by slug
const CACHE_KEY_ARTICLE_BY_SLUG: &str = "article:slug:";
/// Cache key prefix for localized public list pages
const CACHE_KEY_ARTICLE_LIST: &str = "articles:list:";

/// Default cache TTL (1 hour)
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    #[error("Article not found: {0}")]
    NotFound(String),

    /// The article or language is outside the user's assignments
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Article slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Article service
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    translations: Arc<dyn TranslationRepository>,
    users: Arc<dyn UserRepository>,
    languages: Arc<dyn LanguageRepository>,
    cache: Arc<MemoryCache>,
    renderer: MarkdownRenderer,
    default_language: String,
    cache_ttl: Duration,
}

impl ArticleService {
    pub fn new(
        repo: Arc<dyn ArticleRepository>,
        translations: Arc<dyn TranslationRepository>,
        users: Arc<dyn UserRepository>,
        languages: Arc<dyn LanguageRepository>,
        cache: Arc<MemoryCache>,
    ) -> Self {
        Self {
            repo,
            translations,
            users,
            languages,
            cache,
            renderer: MarkdownRenderer::new(),
            default_language: DEFAULT_LANGUAGE.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Language that articles are written in unless told otherwise
    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into().trim().to_lowercase();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub fn render_markdown(&self, content: &str) -> String {
        self.renderer.render(content)
    }

    /// Create an article.
    ///
    /// The slug comes from the title when left empty. A non-super-admin
    /// creator gets the new article added to their assigned set.
    pub async fn create(
        &self,
        actor: &User,
        input: CreateArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Article title cannot be empty".to_string(),
            ));
        }

        let slug = resolve_slug(&input.slug, &title)?;
        if self
            .repo
            .exists_by_slug(&slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(ArticleServiceError::DuplicateSlug(slug));
        }

        let language = self.resolve_language(input.language.as_deref()).await?;
        let record = NewArticle {
            slug,
            title,
            description: input.description.trim().to_string(),
            tags: clean_tags(input.tags),
            language,
            content_html: self.renderer.render(&input.content),
            content: input.content,
            author: non_empty(input.author),
            canonical: non_empty(input.canonical),
            og_title: non_empty(input.og_title),
            og_description: non_empty(input.og_description),
            og_image: non_empty(input.og_image),
            header_image: non_empty(input.header_image),
            images: input.images,
            publish_date: input.publish_date.unwrap_or_else(Utc::now),
        };

        let article = self
            .repo
            .create(&record)
            .await
            .context("Failed to create article")?;

        if !actor.is_super_admin() {
            self.users
                .add_assigned_articles(actor.id, &[article.id])
                .await
                .context("Failed to assign article to its creator")?;
        }

        tracing::info!("Article {} ({}) created by {}", article.id, article.slug, actor.email);
        self.invalidate_list_cache().await;
        Ok(article)
    }

    /// Get an article with its translations, within the actor's scope
    pub async fn get(&self, actor: &User, id: i64) -> Result<Article, ArticleServiceError> {
        let mut article = self.load_scoped(actor, id).await?;
        article.translations = self
            .translations
            .list_for_article(id)
            .await
            .context("Failed to load translations")?;
        Ok(article)
    }

    /// Get an article with its translations by slug. Cached.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>, ArticleServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_ARTICLE_BY_SLUG, slug);
        if let Some(article) = self.cache.get::<Article>(&cache_key).await.ok().flatten() {
            return Ok(Some(article));
        }

        let Some(mut article) = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get article by slug")?
        else {
            return Ok(None);
        };

        article.translations = self
            .translations
            .list_for_article(article.id)
            .await
            .context("Failed to load translations")?;

        let _ = self.cache.set(&cache_key, &article, self.cache_ttl).await;
        Ok(Some(article))
    }

    /// Every article for a super-admin, the assigned subset otherwise
    pub async fn list(&self, actor: &User) -> Result<Vec<Article>, ArticleServiceError> {
        let articles = if actor.is_super_admin() {
            self.repo.list().await
        } else {
            self.repo.list_by_ids(&actor.assigned_articles).await
        }
        .context("Failed to list articles")?;
        Ok(articles)
    }

    /// Articles in the actor's scope with translations attached.
    ///
    /// `ids` narrows the selection; an id outside the scope is an error.
    pub async fn list_with_translations(
        &self,
        actor: &User,
        ids: Option<&[i64]>,
    ) -> Result<Vec<Article>, ArticleServiceError> {
        let mut articles = match ids {
            Some(ids) => {
                self.ensure_all_in_scope(actor, ids)?;
                self.repo
                    .list_by_ids(ids)
                    .await
                    .context("Failed to list articles")?
            }
            None => self.list(actor).await?,
        };
        self.attach_translations(&mut articles).await?;
        Ok(articles)
    }

    /// Partially update an article.
    ///
    /// An empty slug is regenerated from the resulting title.
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdateArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        let existing = self.load_scoped(actor, id).await?;
        let mut record = NewArticle::from(&existing);

        if let Some(title) = input.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(ArticleServiceError::ValidationError(
                    "Article title cannot be empty".to_string(),
                ));
            }
            record.title = title;
        }

        if let Some(slug) = input.slug {
            record.slug = resolve_slug(&slug, &record.title)?;
        }
        if record.slug != existing.slug
            && self
                .repo
                .exists_by_slug_excluding(&record.slug, id)
                .await
                .context("Failed to check slug uniqueness")?
        {
            return Err(ArticleServiceError::DuplicateSlug(record.slug));
        }

        if let Some(content) = input.content {
            record.content_html = self.renderer.render(&content);
            record.content = content;
        }
        if let Some(language) = input.language {
            record.language = self.resolve_language(Some(&language)).await?;
            if !record.language.eq_ignore_ascii_case(&existing.language) {
                let translations = self
                    .translations
                    .list_for_article(id)
                    .await
                    .context("Failed to load translations")?;
                if translations
                    .iter()
                    .any(|t| t.language.eq_ignore_ascii_case(&record.language))
                {
                    return Err(ArticleServiceError::ValidationError(format!(
                        "Article already has a {} translation",
                        record.language
                    )));
                }
            }
        }
        if let Some(description) = input.description {
            record.description = description.trim().to_string();
        }
        if let Some(tags) = input.tags {
            record.tags = clean_tags(tags);
        }
        if let Some(images) = input.images {
            record.images = images;
        }
        if let Some(date) = input.publish_date {
            record.publish_date = date;
        }
        // Optional text fields: present but empty clears the value
        for (field, value) in [
            (&mut record.author, input.author),
            (&mut record.canonical, input.canonical),
            (&mut record.og_title, input.og_title),
            (&mut record.og_description, input.og_description),
            (&mut record.og_image, input.og_image),
            (&mut record.header_image, input.header_image),
        ] {
            if value.is_some() {
                *field = non_empty(value);
            }
        }

        let mut updated = self
            .repo
            .update(id, &record)
            .await
            .context("Failed to update article")?;
        updated.translations = self
            .translations
            .list_for_article(id)
            .await
            .context("Failed to load translations")?;

        self.invalidate_article_cache(&existing.slug).await;
        if updated.slug != existing.slug {
            self.invalidate_article_cache(&updated.slug).await;
        }
        tracing::info!("Article {} updated by {}", id, actor.email);
        Ok(updated)
    }

    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), ArticleServiceError> {
        let existing = self.load_scoped(actor, id).await?;
        self.repo
            .delete(id)
            .await
            .context("Failed to delete article")?;

        self.invalidate_article_cache(&existing.slug).await;
        tracing::info!("Article {} ({}) deleted by {}", id, existing.slug, actor.email);
        Ok(())
    }

    /// Delete several articles. Nothing is deleted if any id is out of scope.
    pub async fn delete_many(&self, actor: &User, ids: &[i64]) -> Result<u64, ArticleServiceError> {
        if ids.is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "IDs are required".to_string(),
            ));
        }
        self.ensure_all_in_scope(actor, ids)?;

        let deleted = self
            .repo
            .delete_many(ids)
            .await
            .context("Failed to delete articles")?;

        invalidate_article_caches(&self.cache).await;
        tracing::info!("{} articles deleted by {}", deleted, actor.email);
        Ok(deleted)
    }

    /// Create or replace the translation of an article in one language
    pub async fn upsert_translation(
        &self,
        actor: &User,
        id: i64,
        language: &str,
        input: TranslationInput,
    ) -> Result<Translation, ArticleServiceError> {
        let article = self.load_scoped(actor, id).await?;
        let language = language.trim().to_lowercase();

        if self
            .languages
            .get_by_code(&language)
            .await
            .context("Failed to look up language")?
            .is_none()
        {
            return Err(ArticleServiceError::ValidationError(format!(
                "Unknown language: {}",
                language
            )));
        }
        if language.eq_ignore_ascii_case(&article.language) {
            return Err(ArticleServiceError::ValidationError(format!(
                "'{}' is the article's base language",
                language
            )));
        }
        if !actor.can_edit_language(&language) {
            return Err(ArticleServiceError::Forbidden(format!(
                "Language '{}' is not assigned to you",
                language
            )));
        }

        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Translation title cannot be empty".to_string(),
            ));
        }

        let record = NewTranslation {
            language,
            title,
            description: input.description.trim().to_string(),
            content_html: self.renderer.render(&input.content),
            content: input.content,
            tags: clean_tags(input.tags),
            canonical: non_empty(input.canonical),
            og_title: non_empty(input.og_title),
            og_description: non_empty(input.og_description),
        };
        let translation = self
            .translations
            .upsert(id, &record)
            .await
            .context("Failed to save translation")?;

        self.invalidate_article_cache(&article.slug).await;
        Ok(translation)
    }

    pub async fn delete_translation(
        &self,
        actor: &User,
        id: i64,
        language: &str,
    ) -> Result<(), ArticleServiceError> {
        let article = self.load_scoped(actor, id).await?;
        if !actor.can_edit_language(language) {
            return Err(ArticleServiceError::Forbidden(format!(
                "Language '{}' is not assigned to you",
                language
            )));
        }

        let removed = self
            .translations
            .delete(id, language.trim())
            .await
            .context("Failed to delete translation")?;
        if !removed {
            return Err(ArticleServiceError::NotFound(format!(
                "No '{}' translation for article {}",
                language, id
            )));
        }

        self.invalidate_article_cache(&article.slug).await;
        Ok(())
    }

    /// Localized page of articles for the public site. Cached.
    ///
    /// Outside the default language only translated articles are listed.
    pub async fn list_public(
        &self,
        language: &str,
        params: &ListParams,
    ) -> Result<PagedResult<Article>, ArticleServiceError> {
        let cache_key = format!(
            "{}{}:{}:{}",
            CACHE_KEY_ARTICLE_LIST, language, params.page, params.per_page
        );
        if let Some(page) = self
            .cache
            .get::<PagedResult<Article>>(&cache_key)
            .await
            .ok()
            .flatten()
        {
            return Ok(page);
        }

        let mut articles = self.repo.list().await.context("Failed to list articles")?;
        self.attach_translations(&mut articles).await?;
        let page = params.paginate(filter_by_language(&articles, language, &self.default_language));

        let _ = self.cache.set(&cache_key, &page, self.cache_ttl).await;
        Ok(page)
    }

    /// The article as a reader of `language` sees it.
    ///
    /// `None` when the slug is unknown or the article has no such translation.
    pub async fn get_public(
        &self,
        slug: &str,
        language: &str,
    ) -> Result<Option<Article>, ArticleServiceError> {
        let article = self.get_by_slug(slug).await?;
        Ok(article.and_then(|a| localize(&a, language, &self.default_language)))
    }

    /// Every article with no scoping and no translations, for the sitemap
    pub async fn list_all(&self) -> Result<Vec<Article>, ArticleServiceError> {
        Ok(self.repo.list().await.context("Failed to list articles")?)
    }

    async fn load_scoped(&self, actor: &User, id: i64) -> Result<Article, ArticleServiceError> {
        let article = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get article")?
            .ok_or_else(|| ArticleServiceError::NotFound(format!("Article with ID {} not found", id)))?;

        if !actor.can_access_article(id) {
            return Err(ArticleServiceError::Forbidden(format!(
                "Article {} is not assigned to you",
                id
            )));
        }
        Ok(article)
    }

    fn ensure_all_in_scope(&self, actor: &User, ids: &[i64]) -> Result<(), ArticleServiceError> {
        if let Some(id) = ids.iter().find(|id| !actor.can_access_article(**id)) {
            return Err(ArticleServiceError::Forbidden(format!(
                "Article {} is not assigned to you",
                id
            )));
        }
        Ok(())
    }

    async fn attach_translations(&self, articles: &mut [Article]) -> Result<(), ArticleServiceError> {
        let ids: Vec<i64> = articles.iter().map(|a| a.id).collect();
        let mut by_article: HashMap<i64, Vec<Translation>> = HashMap::new();
        for translation in self
            .translations
            .list_for_articles(&ids)
            .await
            .context("Failed to load translations")?
        {
            by_article.entry(translation.article_id).or_default().push(translation);
        }
        for article in articles.iter_mut() {
            article.translations = by_article.remove(&article.id).unwrap_or_default();
        }
        Ok(())
    }

    /// Lowercased language code, checked against the language table.
    /// The default language is always accepted.
    async fn resolve_language(&self, language: Option<&str>) -> Result<String, ArticleServiceError> {
        let language = language.map(|l| l.trim().to_lowercase()).unwrap_or_default();
        if language.is_empty() || language == self.default_language {
            return Ok(self.default_language.clone());
        }
        match self
            .languages
            .get_by_code(&language)
            .await
            .context("Failed to look up language")?
        {
            Some(_) => Ok(language),
            None => Err(ArticleServiceError::ValidationError(format!(
                "Unknown language: {}",
                language
            ))),
        }
    }

    async fn invalidate_article_cache(&self, slug: &str) {
        let _ = self
            .cache
            .delete(&format!("{}{}", CACHE_KEY_ARTICLE_BY_SLUG, slug))
            .await;
        self.invalidate_list_cache().await;
    }

    async fn invalidate_list_cache(&self) {
        let _ = self
            .cache
            .delete_pattern(&format!("{}*", CACHE_KEY_ARTICLE_LIST))
            .await;
    }
}

/// Drop every cached article and article list
pub(crate) async fn invalidate_article_caches(cache: &MemoryCache) {
    let _ = cache.delete_pattern(&format!("{}*", CACHE_KEY_ARTICLE_BY_SLUG)).await;
    let _ = cache.delete_pattern(&format!("{}*", CACHE_KEY_ARTICLE_LIST)).await;
}

/// Normalize an explicit slug, or derive one from the title when empty
fn resolve_slug(slug: &str, title: &str) -> Result<String, ArticleServiceError> {
    let source = if slug.trim().is_empty() { title } else { slug };
    let slug = generate_slug(source);
    if slug.is_empty() {
        return Err(ArticleServiceError::ValidationError(
            "Cannot derive a slug from the title".to_string(),
        ));
    }
    Ok(slug)
}

/// Trim tags, dropping empties and repeats
pub(crate) fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !cleaned.iter().any(|t| t == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Generate a URL-friendly slug from a title.
///
/// Lowercases, keeps ASCII alphanumerics and any non-ASCII character, turns
/// everything else into single hyphens and trims hyphens from both ends.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.to_lowercase().chars() {
        let keep = c.is_ascii_alphanumeric() || (!c.is_ascii() && !c.is_whitespace());
        if keep {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxArticleRepository, SqlxLanguageRepository, SqlxTranslationRepository,
        SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{CreateUserInput, LanguageStatus, UserRole};

    pub(crate) struct Fixture {
        pub pool: DynDatabasePool,
        pub service: ArticleService,
        pub users: Arc<dyn UserRepository>,
        pub admin: User,
        pub editor: User,
    }

    impl Fixture {
        /// Editor as currently stored, with fresh assignments
        pub async fn editor(&self) -> User {
            self.users.get_by_id(self.editor.id).await.unwrap().unwrap()
        }
    }

    pub(crate) async fn fixture() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let languages = SqlxLanguageRepository::boxed(pool.clone());
        for (code, name) in [("english", "English"), ("german", "Deutsch"), ("urdu", "اردو")] {
            languages
                .create_if_missing(code, name, LanguageStatus::Active)
                .await
                .unwrap();
        }

        let users = SqlxUserRepository::boxed(pool.clone());
        let admin = users
            .create(&CreateUserInput {
                email: "admin@example.com".into(),
                password_hash: "x".into(),
                role: UserRole::SuperAdmin,
            })
            .await
            .unwrap();
        let editor = users
            .create(&CreateUserInput {
                email: "editor@example.com".into(),
                password_hash: "x".into(),
                role: UserRole::User,
            })
            .await
            .unwrap();
        users
            .set_assigned_languages(editor.id, &["german".to_string()])
            .await
            .unwrap();

        let service = ArticleService::new(
            SqlxArticleRepository::boxed(pool.clone()),
            SqlxTranslationRepository::boxed(pool.clone()),
            users.clone(),
            languages,
            Arc::new(MemoryCache::new()),
        );

        Fixture {
            pool,
            service,
            users,
            admin,
            editor,
        }
    }

    fn german(title: &str) -> TranslationInput {
        TranslationInput {
            title: title.to_string(),
            content: "## Anwendung".to_string(),
            tags: vec!["schmerz".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
        assert_eq!(generate_slug("  Aspirin: Uses & Side-Effects!  "), "aspirin-uses-side-effects");
        assert_eq!(generate_slug("snake_case__title"), "snake-case-title");
        assert_eq!(generate_slug("Paracetamol 500mg"), "paracetamol-500mg");
        assert_eq!(generate_slug("ڈسپرین کے فوائد"), "ڈسپرین-کے-فوائد");
        assert_eq!(generate_slug("Über Ärzte"), "über-ärzte");
        assert_eq!(generate_slug("!!!"), "");
    }

    #[tokio::test]
    async fn test_create_generates_slug_and_renders() {
        let f = fixture().await;
        let article = f
            .service
            .create(&f.admin, CreateArticleInput::new("Aspirin Uses", "# Uses\n\nPain"))
            .await
            .unwrap();

        assert_eq!(article.slug, "aspirin-uses");
        assert_eq!(article.language, "english");
        assert!(article.content_html.contains("<h1>Uses</h1>"));
    }

    #[tokio::test]
    async fn test_create_then_fetch_by_slug_round_trip() {
        let f = fixture().await;
        let input = CreateArticleInput {
            description: "  Pain relief  ".into(),
            canonical: Some("https://example.com/aspirin".into()),
            og_title: Some("".into()),
            ..CreateArticleInput::new("Aspirin", "Body")
                .with_slug("Aspirin Guide")
                .with_tags(vec![" pain ".into(), "pain".into(), "fever".into()])
        };
        let created = f.service.create(&f.admin, input).await.unwrap();
        let fetched = f.service.get_by_slug("aspirin-guide").await.unwrap().unwrap();

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.title, "Aspirin");
        assert_eq!(fetched.description, "Pain relief");
        assert_eq!(fetched.tags, vec!["pain", "fever"]);
        assert_eq!(fetched.canonical.as_deref(), Some("https://example.com/aspirin"));
        assert_eq!(fetched.og_title, None);
        assert_eq!(fetched.content, "Body");
    }

    #[tokio::test]
    async fn test_create_validation() {
        let f = fixture().await;
        let err = f
            .service
            .create(&f.admin, CreateArticleInput::new("   ", "Body"))
            .await
            .unwrap_err();
        assert!(matches!(err, ArticleServiceError::ValidationError(_)));

        f.service
            .create(&f.admin, CreateArticleInput::new("Aspirin", "Body"))
            .await
            .unwrap();
        let err = f
            .service
            .create(&f.admin, CreateArticleInput::new("ASPIRIN", "Other"))
            .await
            .unwrap_err();
        assert!(matches!(err, ArticleServiceError::DuplicateSlug(s) if s == "aspirin"));

        let mut input = CreateArticleInput::new("Ibuprofen", "Body");
        input.language = Some("klingon".into());
        let err = f.service.create(&f.admin, input).await.unwrap_err();
        assert!(matches!(err, ArticleServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_editor_sees_only_assigned_articles() {
        let f = fixture().await;
        f.service
            .create(&f.admin, CreateArticleInput::new("Admin Article", "Body"))
            .await
            .unwrap();
        let own = f
            .service
            .create(&f.editor, CreateArticleInput::new("Editor Article", "Body"))
            .await
            .unwrap();

        let editor = f.editor().await;
        assert_eq!(editor.assigned_articles, vec![own.id]);

        let visible = f.service.list(&editor).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, own.id);
        assert_eq!(f.service.list(&f.admin).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_scope_enforced_on_get_update_delete() {
        let f = fixture().await;
        let article = f
            .service
            .create(&f.admin, CreateArticleInput::new("Aspirin", "Body"))
            .await
            .unwrap();
        let editor = f.editor().await;

        assert!(matches!(
            f.service.get(&editor, article.id).await,
            Err(ArticleServiceError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.update(&editor, article.id, UpdateArticleInput::default()).await,
            Err(ArticleServiceError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.delete_many(&editor, &[article.id]).await,
            Err(ArticleServiceError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.get(&f.admin, 9999).await,
            Err(ArticleServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_regenerates_empty_slug_and_checks_duplicates() {
        let f = fixture().await;
        let article = f
            .service
            .create(&f.admin, CreateArticleInput::new("Aspirin", "Body"))
            .await
            .unwrap();
        f.service
            .create(&f.admin, CreateArticleInput::new("Ibuprofen", "Body"))
            .await
            .unwrap();

        let updated = f
            .service
            .update(
                &f.admin,
                article.id,
                UpdateArticleInput {
                    title: Some("Aspirin Dosage".into()),
                    slug: Some(String::new()),
                    content: Some("**bold**".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, "aspirin-dosage");
        assert!(updated.content_html.contains("<strong>bold</strong>"));
        assert!(f.service.get_by_slug("aspirin").await.unwrap().is_none());

        let err = f
            .service
            .update(
                &f.admin,
                article.id,
                UpdateArticleInput {
                    slug: Some("ibuprofen".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ArticleServiceError::DuplicateSlug(_)));
    }

    #[tokio::test]
    async fn test_get_by_slug_cache_is_invalidated_on_update() {
        let f = fixture().await;
        let article = f
            .service
            .create(&f.admin, CreateArticleInput::new("Aspirin", "Body"))
            .await
            .unwrap();
        assert_eq!(f.service.get_by_slug("aspirin").await.unwrap().unwrap().title, "Aspirin");

        f.service
            .update(
                &f.admin,
                article.id,
                UpdateArticleInput {
                    title: Some("Aspirin 2".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(f.service.get_by_slug("aspirin").await.unwrap().unwrap().title, "Aspirin 2");
    }

    #[tokio::test]
    async fn test_translation_rules() {
        let f = fixture().await;
        let own = f
            .service
            .create(&f.editor, CreateArticleInput::new("Aspirin", "Body"))
            .await
            .unwrap();
        let editor = f.editor().await;

        let saved = f
            .service
            .upsert_translation(&editor, own.id, "German", german("Aspirin DE"))
            .await
            .unwrap();
        assert_eq!(saved.language, "german");

        // Updated in place
        f.service
            .upsert_translation(&editor, own.id, "german", german("Aspirin (DE)"))
            .await
            .unwrap();
        let article = f.service.get(&editor, own.id).await.unwrap();
        assert_eq!(article.translations.len(), 1);
        assert_eq!(article.translations[0].title, "Aspirin (DE)");

        let base = f
            .service
            .upsert_translation(&f.admin, own.id, "english", german("x"))
            .await;
        assert!(matches!(base, Err(ArticleServiceError::ValidationError(_))));

        let unknown = f
            .service
            .upsert_translation(&f.admin, own.id, "klingon", german("x"))
            .await;
        assert!(matches!(unknown, Err(ArticleServiceError::ValidationError(_))));

        let unassigned = f
            .service
            .upsert_translation(&editor, own.id, "urdu", german("x"))
            .await;
        assert!(matches!(unassigned, Err(ArticleServiceError::Forbidden(_))));

        f.service.delete_translation(&editor, own.id, "german").await.unwrap();
        assert!(matches!(
            f.service.delete_translation(&editor, own.id, "german").await,
            Err(ArticleServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_base_language_cannot_collide_with_translation() {
        let f = fixture().await;
        let article = f
            .service
            .create(&f.admin, CreateArticleInput::new("Aspirin", "Body"))
            .await
            .unwrap();
        f.service
            .upsert_translation(&f.admin, article.id, "german", german("Aspirin DE"))
            .await
            .unwrap();

        let to_german = UpdateArticleInput {
            language: Some("German".to_string()),
            ..Default::default()
        };
        let result = f.service.update(&f.admin, article.id, to_german).await;
        assert!(matches!(result, Err(ArticleServiceError::ValidationError(_))));
        assert_eq!(f.service.get(&f.admin, article.id).await.unwrap().language, "english");

        let to_urdu = UpdateArticleInput {
            language: Some("urdu".to_string()),
            ..Default::default()
        };
        let updated = f.service.update(&f.admin, article.id, to_urdu).await.unwrap();
        assert_eq!(updated.language, "urdu");
        assert_eq!(updated.translations[0].language, "german");
    }

    #[tokio::test]
    async fn test_public_views_are_localized() {
        let f = fixture().await;
        let translated = f
            .service
            .create(&f.admin, CreateArticleInput::new("Aspirin", "Body"))
            .await
            .unwrap();
        f.service
            .create(&f.admin, CreateArticleInput::new("Ibuprofen", "Body"))
            .await
            .unwrap();
        f.service
            .upsert_translation(&f.admin, translated.id, "german", german("Aspirin DE"))
            .await
            .unwrap();

        let english = f.service.list_public("english", &ListParams::default()).await.unwrap();
        assert_eq!(english.total, 2);

        let german_page = f.service.list_public("german", &ListParams::default()).await.unwrap();
        assert_eq!(german_page.total, 1);
        assert_eq!(german_page.items[0].title, "Aspirin DE");

        let single = f.service.get_public("aspirin", "german").await.unwrap().unwrap();
        assert_eq!(single.content, "## Anwendung");
        assert!(f.service.get_public("ibuprofen", "german").await.unwrap().is_none());
        assert!(f.service.get_public("missing", "english").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_many() {
        let f = fixture().await;
        let a = f
            .service
            .create(&f.admin, CreateArticleInput::new("A", "Body"))
            .await
            .unwrap();
        let b = f
            .service
            .create(&f.admin, CreateArticleInput::new("B", "Body"))
            .await
            .unwrap();

        assert!(matches!(
            f.service.delete_many(&f.admin, &[]).await,
            Err(ArticleServiceError::ValidationError(_))
        ));
        assert_eq!(f.service.delete_many(&f.admin, &[a.id, b.id]).await.unwrap(), 2);
        assert!(f.service.list(&f.admin).await.unwrap().is_empty());
    }

    mod slug_props {
        use super::super::generate_slug;
        use proptest::prelude::*;

        proptest! {
            /// Slugs never carry separators at the ends or doubled
            #[test]
            fn slug_has_clean_hyphens(title in "[ -~]{0,40}") {
                let slug = generate_slug(&title);
                prop_assert!(!slug.starts_with('-'));
                prop_assert!(!slug.ends_with('-'));
                prop_assert!(!slug.contains("--"));
                prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            }

            /// Slugging is idempotent
            #[test]
            fn slug_is_stable(title in "[ -~äöüéßÄÖÜ]{0,40}") {
                let slug = generate_slug(&title);
                prop_assert_eq!(generate_slug(&slug), slug);
            }
        }
    }
}
