//! Localized article views
//!
//! Articles are authored in a base language and carry translations. Readers
//! pick a locale; these helpers produce what the reader should see.

use crate::models::Article;

/// Name of the cookie that remembers the reader's locale
pub const LOCALE_COOKIE: &str = "preferredLanguage";

/// The article as seen in `language`.
///
/// The default language returns the base article. Any other language
/// overlays the matching translation; SEO fields the translation leaves
/// empty fall back to the base. `None` when no translation exists.
pub fn localize(article: &Article, language: &str, default_language: &str) -> Option<Article> {
    if language.eq_ignore_ascii_case(default_language) {
        return Some(article.clone());
    }

    let translation = article.translation(language)?;
    let mut localized = article.clone();
    localized.title = translation.title.clone();
    localized.description = translation.description.clone();
    localized.tags = translation.tags.clone();
    localized.content = translation.content.clone();
    localized.content_html = translation.content_html.clone();
    localized.language = translation.language.clone();
    localized.canonical = translation.canonical.clone().or_else(|| article.canonical.clone());
    localized.og_title = translation.og_title.clone().or_else(|| article.og_title.clone());
    localized.og_description = translation
        .og_description
        .clone()
        .or_else(|| article.og_description.clone());
    localized.updated_at = translation.updated_at.max(article.updated_at);
    Some(localized)
}

/// Localize every article, dropping those without a translation
pub fn filter_by_language(articles: &[Article], language: &str, default_language: &str) -> Vec<Article> {
    articles
        .iter()
        .filter_map(|a| localize(a, language, default_language))
        .collect()
}

/// Pick the reader's locale: `?lang=` first, then the cookie, then the default.
///
/// Candidates outside `supported` are skipped. The returned code uses the
/// spelling from `supported`.
pub fn resolve_locale(
    query: Option<&str>,
    cookie: Option<&str>,
    supported: &[String],
    default_language: &str,
) -> String {
    [query, cookie]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find_map(|candidate| {
            supported
                .iter()
                .find(|code| code.eq_ignore_ascii_case(candidate))
                .cloned()
        })
        .unwrap_or_else(|| default_language.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Translation;
    use chrono::{Duration, Utc};

    fn article(slug: &str) -> Article {
        let mut article = Article::new(slug.to_string(), format!("{} title", slug), "Body".to_string());
        article.id = 1;
        article.tags = vec!["pain".to_string()];
        article.canonical = Some(format!("https://example.com/{}", slug));
        article.og_title = Some("Base OG".to_string());
        article
    }

    fn translation(language: &str, title: &str) -> Translation {
        let now = Utc::now();
        Translation {
            id: 1,
            article_id: 1,
            language: language.to_string(),
            title: title.to_string(),
            description: "Beschreibung".to_string(),
            content: "Inhalt".to_string(),
            content_html: "<p>Inhalt</p>\n".to_string(),
            tags: vec!["schmerz".to_string()],
            canonical: None,
            og_title: Some("Übersetzt".to_string()),
            og_description: None,
            created_at: now,
            updated_at: now + Duration::seconds(5),
        }
    }

    #[test]
    fn test_default_language_is_unchanged() {
        let base = article("aspirin");
        let localized = localize(&base, "English", "english").unwrap();
        assert_eq!(localized.title, base.title);
        assert_eq!(localized.language, "english");
    }

    #[test]
    fn test_overlay_translation() {
        let mut base = article("aspirin");
        base.translations.push(translation("german", "Aspirin DE"));

        let localized = localize(&base, "GERMAN", "english").unwrap();
        assert_eq!(localized.title, "Aspirin DE");
        assert_eq!(localized.content, "Inhalt");
        assert_eq!(localized.tags, vec!["schmerz"]);
        assert_eq!(localized.language, "german");
        assert_eq!(localized.og_title.as_deref(), Some("Übersetzt"));
        // Falls back to the base article
        assert_eq!(localized.canonical, base.canonical);
        assert_eq!(localized.slug, "aspirin");
    }

    #[test]
    fn test_missing_translation() {
        let base = article("aspirin");
        assert!(localize(&base, "urdu", "english").is_none());
    }

    #[test]
    fn test_filter_by_language_drops_untranslated() {
        let mut translated = article("aspirin");
        translated.translations.push(translation("german", "Aspirin DE"));
        let untranslated = article("ibuprofen");

        let all = vec![translated, untranslated];
        assert_eq!(filter_by_language(&all, "english", "english").len(), 2);

        let german = filter_by_language(&all, "german", "english");
        assert_eq!(german.len(), 1);
        assert_eq!(german[0].title, "Aspirin DE");
    }

    #[test]
    fn test_resolve_locale() {
        let supported: Vec<String> = ["english", "german", "urdu"].iter().map(|s| s.to_string()).collect();

        assert_eq!(resolve_locale(Some("German"), Some("urdu"), &supported, "english"), "german");
        assert_eq!(resolve_locale(Some("klingon"), Some("urdu"), &supported, "english"), "urdu");
        assert_eq!(resolve_locale(None, Some("french"), &supported, "english"), "english");
        assert_eq!(resolve_locale(None, None, &supported, "english"), "english");
    }
}
