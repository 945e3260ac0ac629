//! Article model
//!
//! This module provides:
//! - `Article` entity, the base record in its own language
//! - `Translation`, a per-language overlay of an article
//! - Input types for creating and updating articles and translations
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Language code used when a record does not name one
pub const DEFAULT_LANGUAGE: &str = "english";

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// Article entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug, unique across articles
    pub slug: String,
    /// Article title
    pub title: String,
    /// Short summary, also used as meta description
    #[serde(default)]
    pub description: String,
    /// Keyword tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Base language code
    #[serde(default = "default_language")]
    pub language: String,
    /// Markdown/MDX body
    pub content: String,
    /// Rendered HTML body
    pub content_html: String,
    /// Author display name
    #[serde(default)]
    pub author: Option<String>,
    /// Canonical URL override
    #[serde(default)]
    pub canonical: Option<String>,
    #[serde(default)]
    pub og_title: Option<String>,
    #[serde(default)]
    pub og_description: Option<String>,
    #[serde(default)]
    pub og_image: Option<String>,
    #[serde(default)]
    pub header_image: Option<String>,
    /// Image URLs referenced by the body
    #[serde(default)]
    pub images: Vec<String>,
    /// Publication date shown on the site and used for ordering
    pub publish_date: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Translations, populated on detail reads
    #[serde(default)]
    pub translations: Vec<Translation>,
}

impl Article {
    /// Create a new unsaved article in the default language
    pub fn new(slug: String, title: String, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by database
            slug,
            title,
            description: String::new(),
            tags: Vec::new(),
            language: default_language(),
            content,
            content_html: String::new(),
            author: None,
            canonical: None,
            og_title: None,
            og_description: None,
            og_image: None,
            header_image: None,
            images: Vec::new(),
            publish_date: now,
            created_at: now,
            updated_at: now,
            translations: Vec::new(),
        }
    }

    /// Find the translation for a language, ignoring case
    pub fn translation(&self, language: &str) -> Option<&Translation> {
        self.translations
            .iter()
            .find(|t| t.language.eq_ignore_ascii_case(language))
    }

    /// Languages this article can be read in, base language first
    pub fn available_languages(&self) -> Vec<String> {
        let mut languages = vec![self.language.clone()];
        for t in &self.translations {
            if !languages.iter().any(|l| l.eq_ignore_ascii_case(&t.language)) {
                languages.push(t.language.clone());
            }
        }
        languages
    }
}

/// A translated variant of an article, unique per `(article_id, language)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub id: i64,
    pub article_id: i64,
    pub language: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    pub content_html: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub canonical: Option<String>,
    #[serde(default)]
    pub og_title: Option<String>,
    #[serde(default)]
    pub og_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new article
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateArticleInput {
    pub title: String,
    /// Explicit slug; generated from the title when empty
    pub slug: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Base language; the configured default when absent
    pub language: Option<String>,
    #[serde(alias = "mdxString")]
    pub content: String,
    pub author: Option<String>,
    pub canonical: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub header_image: Option<String>,
    pub images: Vec<String>,
    pub publish_date: Option<DateTime<Utc>>,
}

impl CreateArticleInput {
    /// Create a new CreateArticleInput
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Set the slug
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    /// Set the tags
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Input for updating an existing article
///
/// Absent fields are left untouched. An empty `slug` asks for the slug to be
/// regenerated from the (possibly new) title.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateArticleInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub language: Option<String>,
    #[serde(alias = "mdxString")]
    pub content: Option<String>,
    pub author: Option<String>,
    pub canonical: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub header_image: Option<String>,
    pub images: Option<Vec<String>>,
    pub publish_date: Option<DateTime<Utc>>,
}

impl UpdateArticleInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.slug.is_some()
            || self.description.is_some()
            || self.tags.is_some()
            || self.language.is_some()
            || self.content.is_some()
            || self.author.is_some()
            || self.canonical.is_some()
            || self.og_title.is_some()
            || self.og_description.is_some()
            || self.og_image.is_some()
            || self.header_image.is_some()
            || self.images.is_some()
            || self.publish_date.is_some()
    }
}

/// Input for creating or replacing a translation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationInput {
    pub title: String,
    pub description: String,
    #[serde(alias = "mdxString")]
    pub content: String,
    pub tags: Vec<String>,
    pub canonical: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Number of items to skip
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.per_page as usize
    }

    /// Slice one page out of an already ordered list
    pub fn paginate<T>(&self, items: Vec<T>) -> PagedResult<T> {
        let total = items.len() as i64;
        let page = items
            .into_iter()
            .skip(self.offset())
            .take(self.per_page as usize)
            .collect();
        PagedResult::new(page, total, self)
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        ((self.total as u32) + self.per_page - 1) / self.per_page
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation(language: &str) -> Translation {
        let now = Utc::now();
        Translation {
            id: 1,
            article_id: 1,
            language: language.to_string(),
            title: "Titel".to_string(),
            description: String::new(),
            content: String::new(),
            content_html: String::new(),
            tags: vec![],
            canonical: None,
            og_title: None,
            og_description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_translation_lookup_ignores_case() {
        let mut article = Article::new("aspirin".into(), "Aspirin".into(), "body".into());
        article.translations.push(translation("german"));

        assert!(article.translation("German").is_some());
        assert!(article.translation("french").is_none());
        assert_eq!(article.available_languages(), vec!["english", "german"]);
    }

    #[test]
    fn test_create_input_accepts_mdx_alias() {
        let input: CreateArticleInput =
            serde_json::from_str(r##"{"title": "T", "mdxString": "# Body"}"##).unwrap();
        assert_eq!(input.content, "# Body");
        assert!(input.slug.is_empty());
        assert!(input.language.is_none());
    }

    #[test]
    fn test_update_input_has_changes() {
        assert!(!UpdateArticleInput::default().has_changes());
        let input = UpdateArticleInput {
            tags: Some(vec![]),
            ..Default::default()
        };
        assert!(input.has_changes());
    }

    #[test]
    fn test_list_params_paginate() {
        let params = ListParams::new(2, 3);
        let page = params.paginate((1..=8).collect::<Vec<_>>());

        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 8);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(page.has_prev());
    }

    #[test]
    fn test_list_params_clamps() {
        let params = ListParams::new(0, 1000);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
        assert_eq!(params.offset(), 0);
    }
}
