//! Field normalization for imported records
//!
//! Turns a raw record of any known shape into an article draft or a
//! translation draft with trimmed fields, canonical language codes, a slug
//! and a Markdown body.

use super::monograph;
use super::quasi_json::coerce;
use super::shape::{classify, translation_of, RecordShape};
use crate::services::article::generate_slug;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Alias spellings and the canonical code they stand for
const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("en", "english"),
    ("eng", "english"),
    ("de", "german"),
    ("deu", "german"),
    ("ger", "german"),
    ("deutsch", "german"),
    ("fr", "french"),
    ("fra", "french"),
    ("fre", "french"),
    ("francais", "french"),
    ("français", "french"),
    ("ur", "urdu"),
    ("urd", "urdu"),
];

/// Settings shared by every record of a batch
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    /// Language of records that name none, or an unknown one
    pub default_language: String,
    /// Canonical codes accepted as-is
    pub known_languages: Vec<String>,
    /// Replaces the language of every base record
    pub language_override: Option<String>,
    /// Publish date for records without a readable one
    pub now: DateTime<Utc>,
}

impl NormalizeContext {
    pub fn canonical_language(&self, raw: Option<&str>) -> String {
        canonical_language(raw, &self.known_languages, &self.default_language)
    }
}

/// An article ready for validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleDraft {
    /// Position of the source record in the file
    pub index: usize,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub language: String,
    pub content: String,
    pub author: Option<String>,
    pub canonical: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub header_image: Option<String>,
    pub images: Vec<String>,
    pub publish_date: DateTime<Utc>,
}

/// A translation ready for reconciliation against its base article
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationDraft {
    /// Position of the source record in the file
    pub index: usize,
    /// Slug of the article this translates
    pub base_slug: String,
    pub language: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub tags: Vec<String>,
    pub canonical: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
}

/// What a single record turned into
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// A base article plus the translations it embedded
    Article(ArticleDraft, Vec<TranslationDraft>),
    Translation(TranslationDraft),
}

/// Normalize one record. `None` when the shape is not recognized.
pub fn normalize_record(index: usize, record: &Map<String, Value>, ctx: &NormalizeContext) -> Option<Normalized> {
    let shape = classify(record)?;
    let draft = match shape {
        RecordShape::Native => from_native(index, record, ctx),
        RecordShape::SchemaOrg => from_schema_org(index, record, ctx),
        RecordShape::Monograph => from_monograph(index, record, ctx),
    };

    if let Some(reference) = translation_of(record) {
        let base_slug = Some(generate_slug(&reference))
            .filter(|s| !s.is_empty())
            .unwrap_or(reference);
        let language = ctx.canonical_language(language_field(record, shape).as_deref());
        return Some(Normalized::Translation(into_translation(draft, base_slug, language)));
    }

    let embedded = match (shape, record.get("translations")) {
        (RecordShape::Native, Some(Value::Array(items))) => items
            .iter()
            .filter_map(Value::as_object)
            .map(|t| embedded_translation(index, &draft.slug, t, ctx))
            .collect(),
        _ => Vec::new(),
    };

    Some(Normalized::Article(draft, embedded))
}

fn from_native(index: usize, record: &Map<String, Value>, ctx: &NormalizeContext) -> ArticleDraft {
    let title = text(record, &["title"]).unwrap_or_default();
    let language = base_language(language_field(record, RecordShape::Native).as_deref(), ctx);
    ArticleDraft {
        index,
        slug: slug_for(text(record, &["slug"]), &title),
        description: text(record, &["description"]).unwrap_or_default(),
        tags: tags(record.get("tags")),
        language,
        content: raw_text(record, &["mdxString", "content"]),
        author: text(record, &["author"]),
        canonical: text(record, &["canonical", "canonicalUrl"]),
        og_title: text(record, &["openGraphTitle", "og_title", "ogTitle"]),
        og_description: text(record, &["openGraphDescription", "og_description", "ogDescription"]),
        og_image: text(record, &["openGraphImage", "og_image", "ogImage"]),
        header_image: text(record, &["headerImage", "header_image"]),
        images: tags(record.get("images")),
        publish_date: date(record, &["publishDate", "publish_date", "date"], ctx.now),
        title,
    }
}

fn from_schema_org(index: usize, record: &Map<String, Value>, ctx: &NormalizeContext) -> ArticleDraft {
    let title = text(record, &["headline", "title"]).unwrap_or_default();
    let explicit_slug = text(record, &["slug"]).or_else(|| text(record, &["url"]).and_then(|u| slug_from_url(&u)));
    let language = base_language(language_field(record, RecordShape::SchemaOrg).as_deref(), ctx);

    // Our own export keeps the Markdown source in articleBodyHtml
    let content = match raw_text(record, &["articleBodyHtml"]) {
        body if !body.trim().is_empty() => body,
        _ => raw_text(record, &["articleBody"]),
    };

    ArticleDraft {
        index,
        slug: slug_for(explicit_slug, &title),
        description: text(record, &["description"]).unwrap_or_default(),
        tags: tags(record.get("commonSideEffects").or_else(|| record.get("keywords"))),
        language,
        content,
        author: author(record.get("authors").or_else(|| record.get("author"))),
        canonical: text(record, &["canonicalUrl"]),
        og_title: None,
        og_description: None,
        og_image: text(record, &["image"]),
        header_image: None,
        images: Vec::new(),
        publish_date: date(record, &["datePublished", "datePublishedRaw"], ctx.now),
        title,
    }
}

fn from_monograph(index: usize, record: &Map<String, Value>, ctx: &NormalizeContext) -> ArticleDraft {
    let title = text(record, &["title", "name", "drug_name"]).unwrap_or_default();
    let description = text(record, &["description", "overview", "summary"]).unwrap_or_default();
    let language = base_language(language_field(record, RecordShape::Monograph).as_deref(), ctx);

    ArticleDraft {
        index,
        slug: slug_for(text(record, &["slug"]), &title),
        content: monograph::assemble(record, &description),
        description,
        tags: tags(record.get("tags")),
        language,
        author: text(record, &["author"]),
        canonical: text(record, &["canonical"]),
        og_title: None,
        og_description: None,
        og_image: text(record, &["image"]),
        header_image: None,
        images: Vec::new(),
        publish_date: date(record, &["publishDate", "publish_date", "date"], ctx.now),
        title,
    }
}

fn embedded_translation(
    index: usize,
    base_slug: &str,
    record: &Map<String, Value>,
    ctx: &NormalizeContext,
) -> TranslationDraft {
    TranslationDraft {
        index,
        base_slug: base_slug.to_string(),
        language: ctx.canonical_language(text(record, &["language", "lang"]).as_deref()),
        title: text(record, &["title"]).unwrap_or_default(),
        description: text(record, &["description"]).unwrap_or_default(),
        content: raw_text(record, &["mdxString", "content"]),
        tags: tags(record.get("tags")),
        canonical: text(record, &["canonical"]),
        og_title: text(record, &["openGraphTitle", "og_title", "ogTitle"]),
        og_description: text(record, &["openGraphDescription", "og_description", "ogDescription"]),
    }
}

fn into_translation(draft: ArticleDraft, base_slug: String, language: String) -> TranslationDraft {
    TranslationDraft {
        index: draft.index,
        base_slug,
        language,
        title: draft.title,
        description: draft.description,
        content: draft.content,
        tags: draft.tags,
        canonical: draft.canonical,
        og_title: draft.og_title,
        og_description: draft.og_description,
    }
}

fn language_field(record: &Map<String, Value>, shape: RecordShape) -> Option<String> {
    match shape {
        RecordShape::SchemaOrg => text(record, &["inLanguage", "language"]),
        _ => text(record, &["language", "lang", "inLanguage"]),
    }
}

fn base_language(raw: Option<&str>, ctx: &NormalizeContext) -> String {
    match &ctx.language_override {
        Some(language) => ctx.canonical_language(Some(language)),
        None => ctx.canonical_language(raw),
    }
}

fn slug_for(explicit: Option<String>, title: &str) -> String {
    match explicit.map(|s| generate_slug(&s)).filter(|s| !s.is_empty()) {
        Some(slug) => slug,
        None => generate_slug(title),
    }
}

/// Last path segment of a URL, ignoring query and fragment
fn slug_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .map(|s| urlencoding::decode(s).map(|d| d.into_owned()).unwrap_or_else(|_| s.to_string()))
}

/// Map a language name or code to a canonical known code.
///
/// Aliases resolve first; anything not in `known` becomes `default`.
pub fn canonical_language(raw: Option<&str>, known: &[String], default: &str) -> String {
    let Some(code) = raw.map(|r| r.trim().to_lowercase()).filter(|r| !r.is_empty()) else {
        return default.to_string();
    };
    let code = LANGUAGE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == code)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(code);

    if code == default || known.iter().any(|k| k.eq_ignore_ascii_case(&code)) {
        code
    } else {
        default.to_string()
    }
}

/// Tags from an array, a comma-separated string or a quasi-JSON string
pub fn tags(value: Option<&Value>) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
        Some(Value::String(raw)) => match coerce(raw) {
            Value::Array(items) => items.iter().filter_map(value_text).collect(),
            Value::String(s) => s.split(',').map(str::to_string).collect(),
            other => value_text(&other).into_iter().collect(),
        },
        _ => Vec::new(),
    };

    let mut seen: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !seen.iter().any(|s| s == item) {
            seen.push(item.to_string());
        }
    }
    seen
}

/// RFC 3339, `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&date));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| Utc.from_utc_datetime(&d))
}

fn date(record: &Map<String, Value>, keys: &[&str], fallback: DateTime<Utc>) -> DateTime<Utc> {
    keys.iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .find_map(parse_date)
        .unwrap_or(fallback)
}

fn author(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::Object(map) => text(map, &["name", "nameRaw"]),
            other => value_text(other),
        }),
        Value::Object(map) => text(map, &["name", "nameRaw"]),
        other => value_text(other),
    }
}

/// First non-empty, trimmed text among `keys`
fn text(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .filter_map(value_text)
        .find(|s| !s.is_empty())
}

/// Body text, untrimmed apart from surrounding blank lines
fn raw_text(record: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .map(|s| s.trim_matches(|c| c == '\n' || c == '\r').to_string())
        .unwrap_or_default()
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> NormalizeContext {
        NormalizeContext {
            default_language: "english".into(),
            known_languages: vec!["english".into(), "german".into(), "french".into(), "urdu".into()],
            language_override: None,
            now: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn article(value: Value, ctx: &NormalizeContext) -> (ArticleDraft, Vec<TranslationDraft>) {
        match normalize_record(0, &record(value), ctx) {
            Some(Normalized::Article(draft, translations)) => (draft, translations),
            other => panic!("expected an article, got {:?}", other),
        }
    }

    #[test]
    fn test_canonical_language() {
        let known = ctx().known_languages;
        assert_eq!(canonical_language(Some("EN"), &known, "english"), "english");
        assert_eq!(canonical_language(Some(" deu "), &known, "english"), "german");
        assert_eq!(canonical_language(Some("Français"), &known, "english"), "french");
        assert_eq!(canonical_language(Some("urd"), &known, "english"), "urdu");
        assert_eq!(canonical_language(Some("German"), &known, "english"), "german");
        assert_eq!(canonical_language(Some("klingon"), &known, "english"), "english");
        assert_eq!(canonical_language(Some("es"), &known, "english"), "english");
        assert_eq!(canonical_language(None, &known, "english"), "english");
    }

    #[test]
    fn test_tags_forms() {
        assert_eq!(tags(Some(&json!([" pain ", "fever", "pain", 5]))), vec!["pain", "fever", "5"]);
        assert_eq!(tags(Some(&json!("pain, fever ,"))), vec!["pain", "fever"]);
        assert_eq!(tags(Some(&json!("['pain', 'fever']"))), vec!["pain", "fever"]);
        assert!(tags(Some(&json!(null))).is_empty());
        assert!(tags(None).is_empty());
    }

    #[test]
    fn test_parse_date() {
        let expected = Utc.with_ymd_and_hms(2023, 5, 4, 10, 30, 0).unwrap();
        assert_eq!(parse_date("2023-05-04T10:30:00Z"), Some(expected));
        assert_eq!(parse_date("2023-05-04T15:30:00+05:00"), Some(expected));
        assert_eq!(parse_date("2023-05-04 10:30:00"), Some(expected));
        assert_eq!(parse_date("2023-05-04"), Some(Utc.with_ymd_and_hms(2023, 5, 4, 0, 0, 0).unwrap()));
        assert_eq!(parse_date("May 4th"), None);
    }

    #[test]
    fn test_native_record() {
        let (draft, translations) = article(
            json!({
                "title": "  Aspirin Uses ",
                "mdxString": "\n# Uses\n\nPain\n",
                "language": "en",
                "tags": "pain, fever",
                "openGraphTitle": "OG",
                "publishDate": "2023-05-04",
                "translations": [
                    {"language": "de", "title": "Aspirin DE", "content": "Inhalt"}
                ]
            }),
            &ctx(),
        );

        assert_eq!(draft.title, "Aspirin Uses");
        assert_eq!(draft.slug, "aspirin-uses");
        assert_eq!(draft.content, "# Uses\n\nPain");
        assert_eq!(draft.language, "english");
        assert_eq!(draft.tags, vec!["pain", "fever"]);
        assert_eq!(draft.og_title.as_deref(), Some("OG"));
        assert_eq!(draft.publish_date, Utc.with_ymd_and_hms(2023, 5, 4, 0, 0, 0).unwrap());

        assert_eq!(translations.len(), 1);
        assert_eq!(translations[0].base_slug, "aspirin-uses");
        assert_eq!(translations[0].language, "german");
    }

    #[test]
    fn test_explicit_slug_is_normalized() {
        let (draft, _) = article(json!({"title": "A", "slug": "My Custom Slug", "content": "x"}), &ctx());
        assert_eq!(draft.slug, "my-custom-slug");
    }

    #[test]
    fn test_unknown_language_falls_back() {
        let (draft, _) = article(json!({"title": "A", "content": "x", "language": "klingon"}), &ctx());
        assert_eq!(draft.language, "english");
    }

    #[test]
    fn test_language_override_applies_to_base_records() {
        let mut ctx = ctx();
        ctx.language_override = Some("ur".into());
        let (draft, _) = article(json!({"title": "A", "content": "x", "language": "german"}), &ctx);
        assert_eq!(draft.language, "urdu");
    }

    #[test]
    fn test_schema_org_record() {
        let (draft, _) = article(
            json!({
                "headline": "Aspirin",
                "description": "Pain relief",
                "inLanguage": "english",
                "commonSideEffects": ["Nausea"],
                "authors": [{"name": "Dr. A", "nameRaw": "Dr. A"}],
                "articleBody": "Uses plain",
                "articleBodyHtml": "# Uses",
                "canonicalUrl": "https://example.com/aspirin",
                "url": "https://example.com/aspirin-guide?lang=english",
                "datePublished": "2023-05-04T10:30:00Z"
            }),
            &ctx(),
        );

        assert_eq!(draft.slug, "aspirin-guide");
        assert_eq!(draft.content, "# Uses");
        assert_eq!(draft.tags, vec!["Nausea"]);
        assert_eq!(draft.author.as_deref(), Some("Dr. A"));
        assert_eq!(draft.canonical.as_deref(), Some("https://example.com/aspirin"));
    }

    #[test]
    fn test_monograph_record() {
        let (draft, _) = article(
            json!({
                "drug_name": "Disprin 300mg",
                "description": "Aspirin tablets.",
                "uses": "['Headache']"
            }),
            &ctx(),
        );
        assert_eq!(draft.title, "Disprin 300mg");
        assert_eq!(draft.slug, "disprin-300mg");
        assert_eq!(draft.content, "Aspirin tablets.\n\n# Uses\n\n- Headache\n");
        assert_eq!(draft.publish_date, ctx().now);
    }

    #[test]
    fn test_translation_record() {
        let rec = record(json!({
            "title": "Aspirin DE",
            "content": "Inhalt",
            "language": "ger",
            "translationOf": "Aspirin Guide"
        }));
        match normalize_record(3, &rec, &ctx()) {
            Some(Normalized::Translation(t)) => {
                assert_eq!(t.index, 3);
                assert_eq!(t.base_slug, "aspirin-guide");
                assert_eq!(t.language, "german");
                assert_eq!(t.title, "Aspirin DE");
            }
            other => panic!("expected a translation, got {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_record() {
        assert!(normalize_record(0, &record(json!({"foo": "bar"})), &ctx()).is_none());
    }

    #[test]
    fn test_slug_from_url() {
        assert_eq!(slug_from_url("https://x.com/a/b-c/").as_deref(), Some("b-c"));
        assert_eq!(slug_from_url("https://x.com/%D8%A7").as_deref(), Some("ا"));
        assert_eq!(slug_from_url("https://"), None);
    }
}
