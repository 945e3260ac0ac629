//! Bulk article import
//!
//! Pipeline: parse the upload into records, detect each record's shape,
//! normalize it into an article or translation draft, then validate the
//! batch as a whole. A preview reports every problem found; a commit
//! refuses the batch on the first one and otherwise writes everything in a
//! single transaction.

pub mod export;
pub mod monograph;
pub mod normalize;
pub mod quasi_json;
pub mod shape;

use crate::cache::MemoryCache;
use crate::db::repositories::{
    ArticleRepository, ImportTranslation, LanguageRepository, NewArticle, NewTranslation,
    TranslationTarget,
};
use crate::models::{User, DEFAULT_LANGUAGE};
use crate::services::article::invalidate_article_caches;
use crate::services::markdown::MarkdownRenderer;
use anyhow::Context;
use chrono::Utc;
use normalize::{normalize_record, ArticleDraft, Normalized, NormalizeContext, TranslationDraft};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Reasons an import is refused
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("{0}")]
    Parse(String),

    #[error("Record {index} is not in a recognized article format")]
    UnrecognizedRecord { index: usize },

    #[error("Record {index} has an empty title")]
    EmptyTitle { index: usize },

    #[error("Duplicate slugs: {}", .slugs.join(", "))]
    DuplicateSlugs { slugs: Vec<String> },

    #[error("Record {index} translates an unknown article '{base_slug}'")]
    OrphanTranslation { index: usize, base_slug: String },

    #[error("Record {index} translates into the base language '{language}'")]
    BaseLanguageTranslation { index: usize, language: String },

    #[error("Article '{base_slug}' has more than one '{language}' translation")]
    DuplicateTranslation { base_slug: String, language: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Validate and report without writing
    #[default]
    Preview,
    /// Write the batch if it is clean
    Commit,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportOptions {
    #[serde(default)]
    pub mode: ImportMode,
    /// Language forced onto every base article
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanTranslation {
    pub index: usize,
    pub base_slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateTranslation {
    pub base_slug: String,
    pub language: String,
}

/// Every problem found in a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportIssues {
    pub unrecognized: Vec<usize>,
    /// Records whose title is empty or yields no slug
    pub empty_titles: Vec<usize>,
    pub duplicate_slugs: Vec<String>,
    pub orphans: Vec<OrphanTranslation>,
    pub base_language_translations: Vec<usize>,
    pub duplicate_translations: Vec<DuplicateTranslation>,
}

impl ImportIssues {
    pub fn is_clean(&self) -> bool {
        self.unrecognized.is_empty()
            && self.empty_titles.is_empty()
            && self.duplicate_slugs.is_empty()
            && self.orphans.is_empty()
            && self.base_language_translations.is_empty()
            && self.duplicate_translations.is_empty()
    }

    /// The error a commit reports for these issues, if any
    pub fn into_error(self, translations: &[TranslationDraft]) -> Option<ImportError> {
        if let Some(&index) = self.unrecognized.first() {
            return Some(ImportError::UnrecognizedRecord { index });
        }
        if let Some(&index) = self.empty_titles.first() {
            return Some(ImportError::EmptyTitle { index });
        }
        if !self.duplicate_slugs.is_empty() {
            return Some(ImportError::DuplicateSlugs {
                slugs: self.duplicate_slugs,
            });
        }
        if let Some(orphan) = self.orphans.into_iter().next() {
            return Some(ImportError::OrphanTranslation {
                index: orphan.index,
                base_slug: orphan.base_slug,
            });
        }
        if let Some(&index) = self.base_language_translations.first() {
            let language = translations
                .iter()
                .find(|t| t.index == index)
                .map(|t| t.language.clone())
                .unwrap_or_default();
            return Some(ImportError::BaseLanguageTranslation { index, language });
        }
        self.duplicate_translations
            .into_iter()
            .next()
            .map(|d| ImportError::DuplicateTranslation {
                base_slug: d.base_slug,
                language: d.language,
            })
    }
}

/// Dry-run result
#[derive(Debug, Clone, Serialize)]
pub struct ImportPreview {
    pub articles: Vec<ArticleDraft>,
    pub translations: Vec<TranslationDraft>,
    #[serde(flatten)]
    pub issues: ImportIssues,
}

/// Committed result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Ids of the created articles, in file order
    pub created: Vec<i64>,
    /// Translations inserted or updated
    pub translations: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ImportResult {
    Preview(ImportPreview),
    Commit(ImportReport),
}

/// A normalized batch and what is wrong with it
struct Analysis {
    articles: Vec<ArticleDraft>,
    translations: Vec<TranslationDraft>,
    /// Resolved base article per translation; `None` for orphans
    targets: Vec<Option<TranslationTarget>>,
    issues: ImportIssues,
}

/// Import service
pub struct ImportService {
    articles: Arc<dyn ArticleRepository>,
    languages: Arc<dyn LanguageRepository>,
    cache: Arc<MemoryCache>,
    renderer: MarkdownRenderer,
    default_language: String,
}

impl ImportService {
    pub fn new(
        articles: Arc<dyn ArticleRepository>,
        languages: Arc<dyn LanguageRepository>,
        cache: Arc<MemoryCache>,
    ) -> Self {
        Self {
            articles,
            languages,
            cache,
            renderer: MarkdownRenderer::new(),
            default_language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into().trim().to_lowercase();
        self
    }

    /// Preview or commit depending on `options.mode`
    pub async fn run(
        &self,
        actor: &User,
        input: &str,
        options: &ImportOptions,
    ) -> Result<ImportResult, ImportError> {
        let language = options.language.as_deref();
        match options.mode {
            ImportMode::Preview => Ok(ImportResult::Preview(self.preview(actor, input, language).await?)),
            ImportMode::Commit => Ok(ImportResult::Commit(self.commit(actor, input, language).await?)),
        }
    }

    /// Normalize and validate without writing anything
    pub async fn preview(
        &self,
        actor: &User,
        input: &str,
        language: Option<&str>,
    ) -> Result<ImportPreview, ImportError> {
        let analysis = self.analyze(actor, input, language).await?;
        Ok(ImportPreview {
            articles: analysis.articles,
            translations: analysis.translations,
            issues: analysis.issues,
        })
    }

    /// Write the batch in one transaction, or nothing at all
    pub async fn commit(
        &self,
        actor: &User,
        input: &str,
        language: Option<&str>,
    ) -> Result<ImportReport, ImportError> {
        let analysis = self.analyze(actor, input, language).await?;
        if let Some(err) = analysis.issues.into_error(&analysis.translations) {
            tracing::warn!("Import by {} rejected: {}", actor.email, err);
            return Err(err);
        }

        let articles: Vec<NewArticle> = analysis
            .articles
            .into_iter()
            .map(|draft| self.new_article(draft))
            .collect();
        let translations: Vec<ImportTranslation> = analysis
            .translations
            .into_iter()
            .zip(analysis.targets)
            .filter_map(|(draft, target)| {
                target.map(|target| ImportTranslation {
                    target,
                    translation: self.new_translation(draft),
                })
            })
            .collect();

        let assign_to = (!actor.is_super_admin()).then_some(actor.id);
        let outcome = self
            .articles
            .import_batch(&articles, &translations, assign_to)
            .await
            .context("Failed to write import batch")?;

        invalidate_article_caches(&self.cache).await;
        tracing::info!(
            "Imported {} articles and {} translations for {}",
            outcome.article_ids.len(),
            outcome.translation_count,
            actor.email
        );

        Ok(ImportReport {
            created: outcome.article_ids,
            translations: outcome.translation_count,
        })
    }

    async fn analyze(
        &self,
        actor: &User,
        input: &str,
        language: Option<&str>,
    ) -> Result<Analysis, ImportError> {
        let records = shape::parse_document(input)?;

        let known_languages: Vec<String> = self
            .languages
            .list()
            .await
            .context("Failed to list languages")?
            .into_iter()
            .map(|l| l.code)
            .collect();
        let ctx = NormalizeContext {
            default_language: self.default_language.clone(),
            known_languages,
            language_override: language
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            now: Utc::now(),
        };

        let mut issues = ImportIssues::default();
        let mut articles = Vec::new();
        let mut translations = Vec::new();

        for (index, record) in records.iter().enumerate() {
            match record.as_object().and_then(|r| normalize_record(index, r, &ctx)) {
                Some(Normalized::Article(article, embedded)) => {
                    articles.push(article);
                    translations.extend(embedded);
                }
                Some(Normalized::Translation(translation)) => translations.push(translation),
                None => issues.unrecognized.push(index),
            }
        }

        issues.empty_titles = articles
            .iter()
            .filter(|a| a.title.is_empty() || a.slug.is_empty())
            .map(|a| a.index)
            .chain(translations.iter().filter(|t| t.title.is_empty()).map(|t| t.index))
            .collect();
        issues.empty_titles.sort_unstable();
        issues.empty_titles.dedup();

        issues.duplicate_slugs = self.duplicate_slugs(&articles).await?;

        let mut batch_slugs: HashMap<&str, usize> = HashMap::new();
        for (position, article) in articles.iter().enumerate() {
            batch_slugs.entry(article.slug.as_str()).or_insert(position);
        }

        let mut targets = Vec::with_capacity(translations.len());
        let mut seen_pairs: HashSet<(String, String)> = HashSet::new();
        for translation in &translations {
            let resolved = match batch_slugs.get(translation.base_slug.as_str()) {
                Some(&position) => Some((
                    TranslationTarget::Batch(position),
                    articles[position].language.clone(),
                )),
                None => self
                    .articles
                    .get_by_slug(&translation.base_slug)
                    .await
                    .context("Failed to look up base article")?
                    .map(|base| (TranslationTarget::Existing(base.id), base.language)),
            };

            let Some((target, base_language)) = resolved else {
                issues.orphans.push(OrphanTranslation {
                    index: translation.index,
                    base_slug: translation.base_slug.clone(),
                });
                targets.push(None);
                continue;
            };

            if let TranslationTarget::Existing(id) = target {
                if !actor.can_access_article(id) {
                    return Err(ImportError::Forbidden(format!(
                        "Article '{}' is not assigned to you",
                        translation.base_slug
                    )));
                }
            }
            if !actor.can_edit_language(&translation.language) {
                return Err(ImportError::Forbidden(format!(
                    "Language '{}' is not assigned to you",
                    translation.language
                )));
            }

            if translation.language.eq_ignore_ascii_case(&base_language) {
                issues.base_language_translations.push(translation.index);
            } else if !seen_pairs.insert((translation.base_slug.clone(), translation.language.clone())) {
                issues.duplicate_translations.push(DuplicateTranslation {
                    base_slug: translation.base_slug.clone(),
                    language: translation.language.clone(),
                });
            }
            targets.push(Some(target));
        }

        Ok(Analysis {
            articles,
            translations,
            targets,
            issues,
        })
    }

    /// Slugs generated twice in the batch or already stored, sorted
    async fn duplicate_slugs(&self, articles: &[ArticleDraft]) -> Result<Vec<String>, ImportError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut duplicates: Vec<String> = Vec::new();
        for article in articles.iter().filter(|a| !a.slug.is_empty()) {
            if !seen.insert(article.slug.as_str()) {
                duplicates.push(article.slug.clone());
            }
        }

        let slugs: Vec<String> = seen.into_iter().map(str::to_string).collect();
        duplicates.extend(
            self.articles
                .existing_slugs(&slugs)
                .await
                .context("Failed to check existing slugs")?,
        );
        duplicates.sort();
        duplicates.dedup();
        Ok(duplicates)
    }

    fn new_article(&self, draft: ArticleDraft) -> NewArticle {
        NewArticle {
            content_html: self.renderer.render(&draft.content),
            slug: draft.slug,
            title: draft.title,
            description: draft.description,
            tags: draft.tags,
            language: draft.language,
            content: draft.content,
            author: draft.author,
            canonical: draft.canonical,
            og_title: draft.og_title,
            og_description: draft.og_description,
            og_image: draft.og_image,
            header_image: draft.header_image,
            images: draft.images,
            publish_date: draft.publish_date,
        }
    }

    fn new_translation(&self, draft: TranslationDraft) -> NewTranslation {
        NewTranslation {
            content_html: self.renderer.render(&draft.content),
            language: draft.language,
            title: draft.title,
            description: draft.description,
            content: draft.content,
            tags: draft.tags,
            canonical: draft.canonical,
            og_title: draft.og_title,
            og_description: draft.og_description,
        }
    }
}
