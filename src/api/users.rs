//! User management API endpoints (super-admin only)
//!
//! - GET /api/v1/users - List users
//! - POST /api/v1/users - Create user
//! - GET /api/v1/users/{id} - Get user
//! - PUT /api/v1/users/{id}/articles - Replace assigned articles
//! - PUT /api/v1/users/{id}/languages - Replace assigned languages
//! - PUT /api/v1/users/{id}/password - Reset password

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ListResponse;
use crate::models::User;
use crate::services::{ArticleAssignment, RegisterInput};

/// Build the user management router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user))
        .route("/{id}/articles", put(assign_articles))
        .route("/{id}/languages", put(assign_languages))
        .route("/{id}/password", put(reset_password))
}

/// GET /api/v1/users
async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ListResponse<User>>, ApiError> {
    let users = state.user_service.list_users(&user.0).await?;
    Ok(Json(users.into()))
}

/// POST /api/v1/users
async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.user_service.create_user(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/users/{id}
async fn get_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.user_service.get_user(&user.0, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct AssignArticlesRequest {
    pub articles: ArticleAssignment,
}

/// PUT /api/v1/users/{id}/articles
///
/// Accepts `[1, 2]` or `"1,2"`.
async fn assign_articles(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<AssignArticlesRequest>,
) -> Result<Json<User>, ApiError> {
    let updated = state
        .user_service
        .assign_articles(&user.0, id, &body.articles)
        .await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct AssignLanguagesRequest {
    pub languages: Vec<String>,
}

/// PUT /api/v1/users/{id}/languages
async fn assign_languages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<AssignLanguagesRequest>,
) -> Result<Json<User>, ApiError> {
    let updated = state
        .user_service
        .assign_languages(&user.0, id, &body.languages)
        .await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// PUT /api/v1/users/{id}/password
async fn reset_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .user_service
        .reset_password(&user.0, id, &body.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
