//! API middleware
//!
//! Contains:
//! - Shared application state
//! - Authentication (session token from `Authorization: Bearer` or the
//!   `session` cookie)
//! - Super-admin authorization
//! - `ApiError` and its conversions from service errors

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::models::{Session, User};
use crate::services::{
    ArticleService, ArticleServiceError, ImageService, ImageServiceError, ImportError,
    ImportService, LanguageService, LanguageServiceError, PageService, PageServiceError,
    UserService, UserServiceError,
};
use crate::theme::ThemeEngine;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub config: Arc<Config>,
    pub user_service: Arc<UserService>,
    pub article_service: Arc<ArticleService>,
    pub import_service: Arc<ImportService>,
    pub language_service: Arc<LanguageService>,
    pub page_service: Arc<PageService>,
    pub image_service: Arc<ImageService>,
    pub theme: Arc<ThemeEngine>,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Session token of the current request, inserted next to the user
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionToken>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn duplicate_slug(message: impl Into<String>) -> Self {
        Self::new("DUPLICATE_SLUG", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" | "DUPLICATE_SLUG" | "IMPORT_REJECTED" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Log the cause, return a generic message
fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!("Internal error: {:#}", e);
    ApiError::internal_error("Internal server error")
}

impl From<ArticleServiceError> for ApiError {
    fn from(e: ArticleServiceError) -> Self {
        match e {
            ArticleServiceError::NotFound(msg) => ApiError::not_found(msg),
            ArticleServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ArticleServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ArticleServiceError::DuplicateSlug(slug) => {
                ApiError::duplicate_slug(format!("Article slug already exists: {}", slug))
            }
            ArticleServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists => ApiError::validation_error("User already exists"),
            UserServiceError::NotFound => ApiError::not_found("User not found"),
            UserServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            UserServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<LanguageServiceError> for ApiError {
    fn from(e: LanguageServiceError) -> Self {
        match e {
            LanguageServiceError::NotFound(code) => {
                ApiError::not_found(format!("Language not found: {}", code))
            }
            LanguageServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            LanguageServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            LanguageServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<PageServiceError> for ApiError {
    fn from(e: PageServiceError) -> Self {
        match e {
            PageServiceError::NotFound => ApiError::not_found("Page not found"),
            PageServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            PageServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            PageServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<ImageServiceError> for ApiError {
    fn from(e: ImageServiceError) -> Self {
        match e {
            ImageServiceError::NotFound => ApiError::not_found("Image not found"),
            ImageServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ImageServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ImageServiceError::InternalError(e) => internal(e),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(e: ImportError) -> Self {
        let message = e.to_string();
        match e {
            ImportError::Forbidden(msg) => ApiError::forbidden(msg),
            ImportError::InternalError(e) => internal(e),
            ImportError::Parse(msg) => ApiError::validation_error(msg),
            ImportError::DuplicateSlugs { slugs } => ApiError::with_details(
                "DUPLICATE_SLUG",
                message,
                serde_json::json!({ "duplicate_slugs": slugs }),
            ),
            ImportError::UnrecognizedRecord { index } | ImportError::EmptyTitle { index } => {
                ApiError::with_details("IMPORT_REJECTED", message, serde_json::json!({ "index": index }))
            }
            ImportError::OrphanTranslation { index, base_slug } => ApiError::with_details(
                "IMPORT_REJECTED",
                message,
                serde_json::json!({ "index": index, "base_slug": base_slug }),
            ),
            ImportError::BaseLanguageTranslation { index, language } => ApiError::with_details(
                "IMPORT_REJECTED",
                message,
                serde_json::json!({ "index": index, "language": language }),
            ),
            ImportError::DuplicateTranslation { base_slug, language } => ApiError::with_details(
                "IMPORT_REJECTED",
                message,
                serde_json::json!({ "base_slug": base_slug, "language": language }),
            ),
        }
    }
}

/// Read a cookie value from the request headers
pub fn cookie_value(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|s| s.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Extract session token from request, bearer header first
fn extract_session_token(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    cookie_value(headers, SESSION_COOKIE)
}

/// `Set-Cookie` value for a fresh session
pub fn session_cookie(session: &Session) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        session.id,
        session.max_age_seconds()
    )
}

/// `Set-Cookie` value that clears the session
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    request.extensions_mut().insert(SessionToken(token));
    Ok(next.run(request).await)
}

/// Super-admin authorization middleware; runs after `require_auth`
pub async fn require_super_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_super_admin() {
        return Err(ApiError::forbidden("Super-admin access required"));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_extract_session_token_from_bearer() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer abc-123")]);
        assert_eq!(extract_session_token(&h).as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_extract_session_token_from_cookie() {
        let h = headers(&[(header::COOKIE, "preferredLanguage=urdu; session=tok-1")]);
        assert_eq!(extract_session_token(&h).as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_extract_session_token_bearer_priority() {
        let h = headers(&[
            (header::AUTHORIZATION, "Bearer from-header"),
            (header::COOKIE, "session=from-cookie"),
        ]);
        assert_eq!(extract_session_token(&h).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_extract_session_token_none() {
        assert!(extract_session_token(&HeaderMap::new()).is_none());
        let h = headers(&[(header::AUTHORIZATION, "Basic dXNlcg=="), (header::COOKIE, "session=")]);
        assert!(extract_session_token(&h).is_none());
    }

    #[test]
    fn test_session_cookie_format() {
        let session = Session::start(1, 7);
        let cookie = session_cookie(&session);
        assert!(cookie.starts_with(&format!("session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age=", session.id)));
        assert!(clear_session_cookie().ends_with("Max-Age=0"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::duplicate_slug("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::internal_error("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_import_error_mapping() {
        let err: ApiError = ImportError::DuplicateSlugs {
            slugs: vec!["aspirin".into()],
        }
        .into();
        assert_eq!(err.error.code, "DUPLICATE_SLUG");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error.details.unwrap()["duplicate_slugs"][0], "aspirin");

        let err: ApiError = ImportError::EmptyTitle { index: 2 }.into();
        assert_eq!(err.error.code, "IMPORT_REJECTED");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = ImportError::Forbidden("no".into()).into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_service_error_mapping() {
        let err: ApiError = PageServiceError::NotFound.into();
        assert_eq!(err.error.message, "Page not found");

        let err: ApiError = UserServiceError::UserExists.into();
        assert_eq!(err.error.message, "User already exists");

        let err: ApiError = ArticleServiceError::InternalError(anyhow::anyhow!("db down")).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.error.message.contains("db down"));
    }
}
