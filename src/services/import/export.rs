//! Article export in the schema.org shape
//!
//! The importer reads this shape back, so an export can be re-imported into
//! another installation. Translations are emitted as separate records that
//! point at their base article through `translationOf`.

use crate::models::{Article, Translation};
use crate::services::markdown::strip_markdown;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const RECORD_TYPE: &str = "drug-article";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub headline: String,
    pub description: String,
    pub in_language: String,
    /// The article's tags
    pub common_side_effects: Vec<String>,
    pub authors: Vec<ExportAuthor>,
    pub breadcrumbs: Vec<serde_json::Value>,
    /// Plain-text rendition of the body
    pub article_body: String,
    /// Markdown source of the body
    pub article_body_html: String,
    pub is_mdx: bool,
    pub canonical_url: Option<String>,
    pub url: String,
    pub date_published: String,
    pub date_published_raw: String,
    pub date_modified: String,
    pub date_modified_raw: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub translation_of: Option<String>,
    pub metadata: ExportMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportAuthor {
    pub name: String,
    pub name_raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub date_downloaded: String,
    pub probability: u8,
    #[serde(rename = "_type")]
    pub record_type: String,
}

/// Download name for an export taken at `now`
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("{}_articles.json", now.format("%Y%m%d%H%M%S"))
}

/// Export records for a set of articles, each followed by its translations
pub fn export_articles(articles: &[Article], base_url: &str, now: DateTime<Utc>) -> Vec<ExportRecord> {
    articles
        .iter()
        .flat_map(|article| {
            std::iter::once(article_record(article, base_url, now)).chain(
                article
                    .translations
                    .iter()
                    .map(move |t| translation_record(article, t, base_url, now)),
            )
        })
        .collect()
}

fn article_record(article: &Article, base_url: &str, now: DateTime<Utc>) -> ExportRecord {
    ExportRecord {
        headline: article.title.clone(),
        description: article.description.clone(),
        in_language: language_or_default(&article.language),
        common_side_effects: article.tags.clone(),
        authors: authors(article.author.as_deref()),
        breadcrumbs: Vec::new(),
        article_body: strip_markdown(&article.content),
        article_body_html: article.content.clone(),
        is_mdx: true,
        canonical_url: article.canonical.clone(),
        url: article_url(base_url, &article.slug, None),
        date_published: article.publish_date.to_rfc3339(),
        date_published_raw: human_date(article.publish_date),
        date_modified: article.updated_at.to_rfc3339(),
        date_modified_raw: human_date(article.updated_at),
        translation_of: None,
        metadata: metadata(now),
    }
}

fn translation_record(
    article: &Article,
    translation: &Translation,
    base_url: &str,
    now: DateTime<Utc>,
) -> ExportRecord {
    ExportRecord {
        headline: translation.title.clone(),
        description: translation.description.clone(),
        in_language: translation.language.clone(),
        common_side_effects: translation.tags.clone(),
        authors: authors(article.author.as_deref()),
        breadcrumbs: Vec::new(),
        article_body: strip_markdown(&translation.content),
        article_body_html: translation.content.clone(),
        is_mdx: true,
        canonical_url: translation.canonical.clone().or_else(|| article.canonical.clone()),
        url: article_url(base_url, &article.slug, Some(&translation.language)),
        date_published: article.publish_date.to_rfc3339(),
        date_published_raw: human_date(article.publish_date),
        date_modified: translation.updated_at.to_rfc3339(),
        date_modified_raw: human_date(translation.updated_at),
        translation_of: Some(article.slug.clone()),
        metadata: metadata(now),
    }
}

fn article_url(base_url: &str, slug: &str, language: Option<&str>) -> String {
    let url = format!("{}/{}", base_url.trim_end_matches('/'), urlencoding::encode(slug));
    match language {
        Some(language) => format!("{}?lang={}", url, urlencoding::encode(language)),
        None => url,
    }
}

fn authors(author: Option<&str>) -> Vec<ExportAuthor> {
    author
        .map(|name| ExportAuthor {
            name: name.to_string(),
            name_raw: name.to_string(),
        })
        .into_iter()
        .collect()
}

fn language_or_default(language: &str) -> String {
    if language.trim().is_empty() {
        crate::models::DEFAULT_LANGUAGE.to_string()
    } else {
        language.to_string()
    }
}

fn human_date(date: DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn metadata(now: DateTime<Utc>) -> ExportMetadata {
    ExportMetadata {
        date_downloaded: now.to_rfc3339(),
        probability: 1,
        record_type: RECORD_TYPE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Article {
        let mut article = Article::new(
            "aspirin".into(),
            "Aspirin".into(),
            "# Uses\n\n- **Pain**".into(),
        );
        article.tags = vec!["Nausea".into()];
        article.author = Some("Dr. A".into());
        article.publish_date = Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap();
        article
    }

    #[test]
    fn test_file_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 8, 9, 10).unwrap();
        assert_eq!(export_file_name(now), "20240305080910_articles.json");
    }

    #[test]
    fn test_article_record_shape() {
        let now = Utc::now();
        let records = export_articles(&[sample()], "https://cliniclane.test/", now);
        assert_eq!(records.len(), 1);

        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json["headline"], "Aspirin");
        assert_eq!(json["inLanguage"], "english");
        assert_eq!(json["commonSideEffects"][0], "Nausea");
        assert_eq!(json["authors"][0]["nameRaw"], "Dr. A");
        assert_eq!(json["articleBody"], "Uses\n Pain");
        assert_eq!(json["articleBodyHtml"], "# Uses\n\n- **Pain**");
        assert_eq!(json["isMdx"], true);
        assert_eq!(json["url"], "https://cliniclane.test/aspirin");
        assert_eq!(json["datePublishedRaw"], "March 5, 2024");
        assert_eq!(json["metadata"]["_type"], "drug-article");
        assert_eq!(json["metadata"]["probability"], 1);
        assert!(json.get("translationOf").is_none());
    }

    #[test]
    fn test_translations_follow_their_base() {
        let mut article = sample();
        let now = Utc::now();
        article.translations.push(Translation {
            id: 1,
            article_id: article.id,
            language: "urdu".into(),
            title: "اسپرین".into(),
            description: String::new(),
            content: "متن".into(),
            content_html: String::new(),
            tags: vec![],
            canonical: None,
            og_title: None,
            og_description: None,
            created_at: now,
            updated_at: now,
        });

        let records = export_articles(&[article], "https://cliniclane.test", now);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].translation_of.as_deref(), Some("aspirin"));
        assert_eq!(records[1].in_language, "urdu");
        assert_eq!(records[1].url, "https://cliniclane.test/aspirin?lang=urdu");
    }
}
