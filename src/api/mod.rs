//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP endpoints for ClinicLane.
//! It includes:
//! - Auth API endpoints (login, sessions, bootstrap registration)
//! - Article API endpoints (CRUD, translations, import/export)
//! - User management endpoints (super-admin)
//! - Language, page and image endpoints
//! - Public JSON article endpoints
//! - The server-rendered public site and sitemap
//! - Uploaded file serving

pub mod articles;
pub mod auth;
pub mod common;
pub mod images;
pub mod languages;
pub mod middleware;
pub mod pages;
pub mod responses;
pub mod site;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxArticleRepository, SqlxImageRepository, SqlxLanguageRepository,
    SqlxPageContentRepository, SqlxSessionRepository, SqlxTranslationRepository,
    SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    ArticleService, ImageService, ImportService, LanguageService, PageService, UserService,
};
use crate::theme::ThemeEngine;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Wire repositories, cache, services and the theme into the shared state
pub fn build_state(pool: DynDatabasePool, config: Config) -> anyhow::Result<AppState> {
    let cache = create_cache(&config.cache);
    let default_language = config.site.default_language.clone();

    let article_repo = SqlxArticleRepository::boxed(pool.clone());
    let translation_repo = SqlxTranslationRepository::boxed(pool.clone());
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let language_repo = SqlxLanguageRepository::boxed(pool.clone());
    let page_repo = SqlxPageContentRepository::boxed(pool.clone());
    let image_repo = SqlxImageRepository::boxed(pool.clone());

    let article_service = ArticleService::new(
        article_repo.clone(),
        translation_repo,
        user_repo.clone(),
        language_repo.clone(),
        cache.clone(),
    )
    .with_default_language(default_language.clone())
    .with_cache_ttl(Duration::from_secs(config.cache.ttl_seconds));

    let import_service =
        ImportService::new(article_repo.clone(), language_repo.clone(), cache.clone())
            .with_default_language(default_language);

    let user_service = UserService::new(user_repo, session_repo, article_repo)
        .with_session_days(config.auth.session_days);

    let theme = ThemeEngine::new(config.theme.path.as_deref())?;

    Ok(AppState {
        pool,
        user_service: Arc::new(user_service),
        article_service: Arc::new(article_service),
        import_service: Arc::new(import_service),
        language_service: Arc::new(LanguageService::new(language_repo)),
        page_service: Arc::new(PageService::new(page_repo, cache)),
        image_service: Arc::new(ImageService::new(
            image_repo,
            Arc::new(config.upload.clone()),
        )),
        theme: Arc::new(theme),
        config: Arc::new(config),
    })
}

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Super-admin routes
    let admin_routes = Router::new()
        .nest("/users", users::router())
        .nest("/admin/pages", pages::router())
        .route_layer(axum_middleware::from_fn(middleware::require_super_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth, scoped inside the services)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/articles", articles::router())
        .nest("/languages", languages::router())
        .nest("/images", images::router(state.config.upload.max_file_size))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/public/articles", articles::public_router())
        .nest("/pages", pages::public_router())
        .merge(admin_routes)
        .merge(protected_routes)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!("Invalid CORS origin '{}', cross-origin requests disabled", origin);
            cors
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service(&config.upload.url_prefix, ServeDir::new(&config.upload.path))
        .merge(site::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors_layer(&config.server.cors_origin)),
        )
        .with_state(state)
}
