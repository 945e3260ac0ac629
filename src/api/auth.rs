//! Authentication API endpoints
//!
//! Handles HTTP requests for user authentication:
//! - POST /api/v1/auth/register - Bootstrap registration (first user only)
//! - POST /api/v1/auth/login - User login
//! - POST /api/v1/auth/logout - User logout
//! - GET /api/v1/auth/me - Get current user
//! - PUT /api/v1/auth/password - Change own password
//! - GET /api/v1/auth/has-admin - Whether bootstrap registration is closed

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{
    clear_session_cookie, session_cookie, ApiError, AppState, AuthenticatedUser, SessionToken,
};
use crate::api::responses::AuthResponse;
use crate::models::{Session, User};
use crate::services::{ChangePasswordInput, LoginInput, RegisterInput};

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
        .route("/password", put(change_password))
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/has-admin", get(has_admin))
}

/// Response for has-admin check
#[derive(Debug, Serialize)]
pub struct HasAdminResponse {
    pub has_admin: bool,
}

/// GET /api/v1/auth/has-admin
async fn has_admin(State(state): State<AppState>) -> Result<Json<HasAdminResponse>, ApiError> {
    let is_first = state.user_service.is_first_user().await?;
    Ok(Json(HasAdminResponse {
        has_admin: !is_first,
    }))
}

/// Headers carrying a `Set-Cookie`
fn cookie_headers(cookie: &str) -> Result<HeaderMap, ApiError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|_| ApiError::internal_error("Failed to build session cookie"))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

fn signed_in(session: &Session, user: User) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let headers = cookie_headers(&session_cookie(session))?;
    Ok((headers, Json(AuthResponse::new(session, user))))
}

/// POST /api/v1/auth/register
///
/// Only works while no user exists. The new super-admin is signed in.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let password = body.password.clone();
    let user = state.user_service.register(body).await?;

    let (session, user) = state
        .user_service
        .login(LoginInput {
            email: user.email,
            password,
        })
        .await?;

    let (headers, body) = signed_in(&session, user)?;
    Ok((StatusCode::CREATED, headers, body))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (session, user) = state.user_service.login(body).await?;
    signed_in(&session, user)
}

/// POST /api/v1/auth/logout
///
/// Requires authentication.
async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<impl IntoResponse, ApiError> {
    state.user_service.logout(&token).await?;
    Ok((StatusCode::NO_CONTENT, cookie_headers(&clear_session_cookie())?))
}

/// GET /api/v1/auth/me
///
/// Requires authentication.
async fn get_current_user(user: AuthenticatedUser) -> Json<User> {
    Json(user.0)
}

/// PUT /api/v1/auth/password
async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordInput>,
) -> Result<StatusCode, ApiError> {
    state.user_service.change_password(&user.0, body).await?;
    Ok(StatusCode::NO_CONTENT)
}
