//! Pages API endpoints
//!
//! Public:
//! - GET /api/v1/pages - List pages
//! - GET /api/v1/pages/{slug} - Get page by slug
//!
//! Super-admin:
//! - POST /api/v1/admin/pages - Create page
//! - GET /api/v1/admin/pages/{id} - Get page by id
//! - PUT /api/v1/admin/pages/{id} - Update page
//! - DELETE /api/v1/admin/pages/{id} - Delete page

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ListResponse;
use crate::models::{CreatePageInput, PageContent, UpdatePageInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_page))
        .route("/{id}", get(get_page).put(update_page).delete(delete_page))
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pages))
        .route("/{slug}", get(get_page_by_slug))
}

async fn list_pages(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<PageContent>>, ApiError> {
    Ok(Json(state.page_service.list().await?.into()))
}

async fn get_page_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PageContent>, ApiError> {
    state
        .page_service
        .get_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Page not found"))
}

async fn get_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PageContent>, ApiError> {
    Ok(Json(state.page_service.get(id).await?))
}

async fn create_page(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePageInput>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.page_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

async fn update_page(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePageInput>,
) -> Result<Json<PageContent>, ApiError> {
    Ok(Json(state.page_service.update(&user.0, id, body).await?))
}

async fn delete_page(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.page_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
