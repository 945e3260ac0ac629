//! Public site
//!
//! Server-rendered HTML through the theme engine:
//! - GET / - Localized article list
//! - GET /{slug} - Article (localized), else a static page, else 404
//! - GET /sitemap.xml - Home, pages and articles with lastmod

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::api::common::{default_page, LangQuery};
use crate::api::middleware::{cookie_value, ApiError, AppState};
use crate::models::{Article, ListParams, PageContent};
use crate::services::{extract_headings, localize, resolve_locale, LOCALE_COOKIE};
use crate::theme::{hreflang, StandardTemplateVars};

/// One year
const LOCALE_COOKIE_MAX_AGE: i64 = 365 * 24 * 60 * 60;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/sitemap.xml", get(sitemap))
        .route("/{slug}", get(article_or_page))
}

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
}

/// Article summary for the home page
#[derive(Debug, Serialize)]
struct ArticleCard {
    slug: String,
    title: String,
    description: String,
    published: String,
}

impl From<&Article> for ArticleCard {
    fn from(article: &Article) -> Self {
        Self {
            slug: article.slug.clone(),
            title: article.title.clone(),
            description: article.description.clone(),
            published: display_date(article.publish_date),
        }
    }
}

/// Language switcher entry
#[derive(Debug, Serialize)]
struct LanguageLink {
    code: String,
    name: String,
}

/// `<link rel="alternate">` entry
#[derive(Debug, Serialize)]
struct Alternate {
    hreflang: &'static str,
    href: String,
}

#[derive(Debug, Serialize)]
struct SitemapEntry {
    loc: String,
    lastmod: Option<String>,
}

fn display_date(date: DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Resolved locale for a request: `?lang=`, then the cookie, then the default
fn request_locale(state: &AppState, lang: Option<&str>, headers: &HeaderMap) -> String {
    let site = &state.config.site;
    let supported: Vec<String> = site.locales.iter().map(|l| l.code.clone()).collect();
    resolve_locale(
        lang,
        cookie_value(headers, LOCALE_COOKIE).as_deref(),
        &supported,
        &site.default_language,
    )
}

fn standard_vars(state: &AppState, request_path: &str, language: &str) -> StandardTemplateVars {
    let site = &state.config.site;
    StandardTemplateVars::new(&site.name, &site.base_url, request_path, language)
}

/// Active languages for the switcher
async fn language_links(state: &AppState) -> Result<Vec<LanguageLink>, ApiError> {
    Ok(state
        .language_service
        .list()
        .await?
        .into_iter()
        .filter(|l| l.is_active())
        .map(|l| LanguageLink {
            code: l.code,
            name: l.name,
        })
        .collect())
}

fn locale_cookie(language: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax",
        LOCALE_COOKIE, language, LOCALE_COOKIE_MAX_AGE
    ))
    .map_err(|_| ApiError::internal_error("Failed to build locale cookie"))
}

/// GET /
async fn home(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HomeQuery>,
) -> Result<Response, ApiError> {
    let language = request_locale(&state, query.lang.as_deref(), &headers);
    let params = ListParams::new(query.page, state.config.site.page_size);
    let result = state.article_service.list_public(&language, &params).await?;

    let articles: Vec<ArticleCard> = result.items.iter().map(ArticleCard::from).collect();
    let mut context = TeraContext::new();
    context.insert("articles", &articles);
    context.insert("page", &result.page);
    context.insert("total_pages", &result.total_pages());
    context.insert("languages", &language_links(&state).await?);

    let html = state.theme.render_with_fallback(
        "index.html",
        &context,
        &standard_vars(&state, "/", &language),
    );
    Ok(Html(html).into_response())
}

/// GET /{slug}
async fn article_or_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(query): Query<LangQuery>,
) -> Result<Response, ApiError> {
    let request_path = format!("/{}", slug);
    let language = request_locale(&state, query.lang.as_deref(), &headers);

    if let Some(article) = state.article_service.get_by_slug(&slug).await? {
        return render_article(&state, &article, &language, &request_path).await;
    }

    if let Some(page) = state.page_service.get_by_slug(&slug).await? {
        return render_page(&state, &page, &language, &request_path).await;
    }

    let mut context = TeraContext::new();
    context.insert("languages", &language_links(&state).await?);
    let html = state.theme.render_with_fallback(
        "not_found.html",
        &context,
        &standard_vars(&state, &request_path, &language),
    );
    Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
}

/// Article page; without a translation for `language` the base version is shown
async fn render_article(
    state: &AppState,
    article: &Article,
    language: &str,
    request_path: &str,
) -> Result<Response, ApiError> {
    let site = &state.config.site;
    let default_language = state.article_service.default_language();
    let (shown, language) = match localize(article, language, default_language) {
        Some(localized) => (localized, language.to_string()),
        None => (article.clone(), article.language.clone()),
    };

    let base_url = site.absolute_url(&article.slug);
    let canonical = shown.canonical.clone().unwrap_or_else(|| base_url.clone());
    let mut alternates = vec![Alternate {
        hreflang: hreflang(&article.language),
        href: base_url.clone(),
    }];
    alternates.extend(article.translations.iter().map(|t| Alternate {
        hreflang: hreflang(&t.language),
        href: format!("{}?lang={}", base_url, urlencoding::encode(&t.language)),
    }));

    let og_title = shown.og_title.clone().unwrap_or_else(|| shown.title.clone());
    let og_description = shown
        .og_description
        .clone()
        .unwrap_or_else(|| shown.description.clone());
    let og_image = shown.og_image.clone().or_else(|| shown.header_image.clone());

    let mut context = TeraContext::new();
    context.insert(
        "article",
        &serde_json::json!({
            "title": shown.title,
            "description": shown.description,
            "content_html": shown.content_html,
            "tags": shown.tags,
            "author": shown.author,
            "header_image": shown.header_image,
            "published": display_date(shown.publish_date),
        }),
    );
    context.insert("keywords", &shown.tags.join(", "));
    context.insert("canonical", &canonical);
    context.insert("alternates", &alternates);
    context.insert("og_url", &canonical);
    context.insert("og_title", &og_title);
    context.insert("og_description", &og_description);
    context.insert("og_image", &og_image);
    context.insert("headings", &extract_headings(&shown.content));
    context.insert("languages", &language_links(state).await?);

    let html = state.theme.render_with_fallback(
        "article.html",
        &context,
        &standard_vars(state, request_path, &language),
    );
    Ok(([(header::SET_COOKIE, locale_cookie(&language)?)], Html(html)).into_response())
}

async fn render_page(
    state: &AppState,
    page: &PageContent,
    language: &str,
    request_path: &str,
) -> Result<Response, ApiError> {
    let mut context = TeraContext::new();
    context.insert("page", page);
    context.insert("canonical", &state.config.site.absolute_url(&page.slug));
    context.insert("languages", &language_links(state).await?);

    let html = state.theme.render_with_fallback(
        "page.html",
        &context,
        &standard_vars(state, request_path, language),
    );
    Ok(Html(html).into_response())
}

/// GET /sitemap.xml
async fn sitemap(State(state): State<AppState>) -> Result<Response, ApiError> {
    let site = &state.config.site;
    let lastmod = |date: DateTime<Utc>| Some(date.format("%Y-%m-%d").to_string());

    let mut entries = vec![SitemapEntry {
        loc: site.absolute_url("/"),
        lastmod: None,
    }];
    entries.extend(state.page_service.list().await?.iter().map(|page| SitemapEntry {
        loc: site.absolute_url(&urlencoding::encode(&page.slug)),
        lastmod: lastmod(page.updated_at),
    }));
    entries.extend(
        state
            .article_service
            .list_all()
            .await?
            .iter()
            .map(|article| SitemapEntry {
                loc: site.absolute_url(&urlencoding::encode(&article.slug)),
                lastmod: lastmod(article.updated_at),
            }),
    );

    let mut context = TeraContext::new();
    context.insert("entries", &entries);
    let xml = state
        .theme
        .render("sitemap.xml", &context)
        .map_err(|e| {
            tracing::error!("Failed to render sitemap: {:#}", e);
            ApiError::internal_error("Failed to render sitemap")
        })?;

    Ok((
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        xml,
    )
        .into_response())
}
