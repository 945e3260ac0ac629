//! Article API endpoints
//!
//! Authenticated (scoped to the caller's assigned articles unless super-admin):
//! - GET /api/v1/articles - List articles (`?ids=` narrows, translations included)
//! - POST /api/v1/articles - Create article
//! - DELETE /api/v1/articles - Bulk delete (`{"ids": [...]}`)
//! - GET /api/v1/articles/{id} - Get article
//! - PUT /api/v1/articles/{id} - Update article
//! - DELETE /api/v1/articles/{id} - Delete article
//! - PUT /api/v1/articles/{id}/translations/{language} - Upsert translation
//! - DELETE /api/v1/articles/{id}/translations/{language} - Delete translation
//! - POST /api/v1/articles/import - Preview or commit a bulk import
//! - GET /api/v1/articles/export - Download articles as JSON
//!
//! Public:
//! - GET /api/v1/public/articles - Localized, paginated list
//! - GET /api/v1/public/articles/{slug} - Localized article

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::api::common::{non_empty, IdsQuery, LangQuery, PublicListQuery};
use crate::api::middleware::{cookie_value, ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{DeletedResponse, ListResponse, PaginatedResponse};
use crate::models::{Article, CreateArticleInput, Translation, TranslationInput, UpdateArticleInput};
use crate::services::import::export::{export_articles, export_file_name};
use crate::services::{resolve_locale, ImportOptions, ImportResult, LOCALE_COOKIE};

/// Build the authenticated article router
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_articles).post(create_article).delete(delete_articles),
        )
        .route("/import", axum::routing::post(import_articles))
        .route("/export", get(export))
        .route(
            "/{id}",
            get(get_article).put(update_article).delete(delete_article),
        )
        .route(
            "/{id}/translations/{language}",
            put(upsert_translation).delete(delete_translation),
        )
}

/// Build the public article router
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_public))
        .route("/{slug}", get(get_public))
}

/// GET /api/v1/articles
async fn list_articles(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<IdsQuery>,
) -> Result<Json<ListResponse<Article>>, ApiError> {
    let ids = query.parse().map_err(ApiError::validation_error)?;
    let articles = state
        .article_service
        .list_with_translations(&user.0, ids.as_deref())
        .await?;
    Ok(Json(articles.into()))
}

/// POST /api/v1/articles
async fn create_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateArticleInput>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.article_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<i64>,
}

/// DELETE /api/v1/articles
async fn delete_articles(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted = state.article_service.delete_many(&user.0, &body.ids).await?;
    Ok(Json(DeletedResponse { deleted }))
}

/// GET /api/v1/articles/{id}
async fn get_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.get(&user.0, id).await?))
}

/// PUT /api/v1/articles/{id}
async fn update_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateArticleInput>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.update(&user.0, id, body).await?))
}

/// DELETE /api/v1/articles/{id}
async fn delete_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.article_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/articles/{id}/translations/{language}
async fn upsert_translation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, language)): Path<(i64, String)>,
    Json(body): Json<TranslationInput>,
) -> Result<Json<Translation>, ApiError> {
    let translation = state
        .article_service
        .upsert_translation(&user.0, id, &language, body)
        .await?;
    Ok(Json(translation))
}

/// DELETE /api/v1/articles/{id}/translations/{language}
async fn delete_translation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, language)): Path<(i64, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .article_service
        .delete_translation(&user.0, id, &language)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Import request: either the raw file text or already parsed records
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub records: Option<serde_json::Value>,
    #[serde(flatten)]
    pub options: ImportOptions,
}

impl ImportRequest {
    fn input(&self) -> Result<String, ApiError> {
        if let Some(records) = &self.records {
            return serde_json::to_string(records)
                .map_err(|e| ApiError::validation_error(format!("Invalid records: {}", e)));
        }
        match non_empty(self.content.as_deref()) {
            Some(content) => Ok(content.to_string()),
            None => Err(ApiError::validation_error(
                "Either 'content' or 'records' is required",
            )),
        }
    }
}

/// POST /api/v1/articles/import
async fn import_articles(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ImportRequest>,
) -> Result<Json<ImportResult>, ApiError> {
    let input = body.input()?;
    let result = state
        .import_service
        .run(&user.0, &input, &body.options)
        .await?;
    Ok(Json(result))
}

/// GET /api/v1/articles/export
async fn export(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<IdsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = query.parse().map_err(ApiError::validation_error)?;
    let articles = state
        .article_service
        .list_with_translations(&user.0, ids.as_deref())
        .await?;

    let now = Utc::now();
    let records = export_articles(&articles, &state.config.site.base_url, now);
    let disposition = format!("attachment; filename=\"{}\"", export_file_name(now));
    tracing::info!("{} exported {} articles", user.0.email, articles.len());

    Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(records)))
}

/// Locale for a public request: `?lang=`, then the preference cookie
fn request_locale(state: &AppState, lang: Option<&str>, headers: &axum::http::HeaderMap) -> String {
    let site = &state.config.site;
    let supported: Vec<String> = site.locales.iter().map(|l| l.code.clone()).collect();
    resolve_locale(
        lang,
        cookie_value(headers, LOCALE_COOKIE).as_deref(),
        &supported,
        &site.default_language,
    )
}

/// GET /api/v1/public/articles
async fn list_public(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Query(query): Query<PublicListQuery>,
) -> Result<Json<PaginatedResponse<Article>>, ApiError> {
    let language = request_locale(&state, query.lang.as_deref(), &headers);
    let page = state
        .article_service
        .list_public(&language, &query.params())
        .await?;
    Ok(Json(page.into()))
}

/// GET /api/v1/public/articles/{slug}
async fn get_public(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(slug): Path<String>,
    Query(query): Query<LangQuery>,
) -> Result<Json<Article>, ApiError> {
    let language = request_locale(&state, query.lang.as_deref(), &headers);
    state
        .article_service
        .get_public(&slug, &language)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Article not found"))
}
