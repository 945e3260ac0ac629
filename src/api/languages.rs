//! Language API endpoints
//!
//! - GET /api/v1/languages - List languages
//! - GET /api/v1/languages/mine - Languages the caller may translate into
//! - POST /api/v1/languages - Create unless the code exists (super-admin)
//! - PUT /api/v1/languages/{code} - Update name/status (super-admin)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ListResponse;
use crate::models::{Language, LanguageInput};

/// Build the language router (authenticated)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_languages).post(upsert_language))
        .route("/mine", get(my_languages))
        .route("/{code}", put(update_language))
}

/// GET /api/v1/languages
async fn list_languages(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<Language>>, ApiError> {
    Ok(Json(state.language_service.list().await?.into()))
}

/// GET /api/v1/languages/mine
async fn my_languages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ListResponse<Language>>, ApiError> {
    Ok(Json(state.language_service.mine(&user.0).await?.into()))
}

/// POST /api/v1/languages
///
/// 201 when created, 200 with the stored record when the code exists.
async fn upsert_language(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<LanguageInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (language, created) = state.language_service.upsert(&user.0, body).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(language)))
}

/// PUT /api/v1/languages/{code}
async fn update_language(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(code): Path<String>,
    Json(body): Json<LanguageInput>,
) -> Result<Json<Language>, ApiError> {
    Ok(Json(state.language_service.update(&user.0, &code, body).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{create_editor, login_as, test_server, ADMIN_EMAIL, EDITOR_EMAIL};
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_list_contains_seeded_locales() {
        let (server, _state) = test_server().await;
        let token = login_as(&server, ADMIN_EMAIL).await;
        let listed: Value = server.get("/api/v1/languages").authorization_bearer(&token).await.json();
        let codes: Vec<&str> = listed["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["english", "german", "french", "urdu"]);
    }

    #[tokio::test]
    async fn test_upsert_keeps_existing_and_update_changes() {
        let (server, _state) = test_server().await;
        let token = login_as(&server, ADMIN_EMAIL).await;

        let created = server
            .post("/api/v1/languages")
            .authorization_bearer(&token)
            .json(&json!({"code": "Spanish", "name": "Español"}))
            .await;
        created.assert_status(StatusCode::CREATED);
        assert_eq!(created.json::<Value>()["code"], "spanish");

        let existing = server
            .post("/api/v1/languages")
            .authorization_bearer(&token)
            .json(&json!({"code": "german", "name": "Renamed"}))
            .await;
        existing.assert_status_ok();
        assert_eq!(existing.json::<Value>()["name"], "Deutsch");

        let updated: Value = server
            .put("/api/v1/languages/german")
            .authorization_bearer(&token)
            .json(&json!({"status": "inactive"}))
            .await
            .json();
        assert_eq!(updated["status"], "inactive");
        assert_eq!(updated["name"], "Deutsch");

        server
            .put("/api/v1/languages/klingon")
            .authorization_bearer(&token)
            .json(&json!({"name": "tlhIngan"}))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_mine_and_editor_restrictions() {
        let (server, state) = test_server().await;
        let admin = login_as(&server, ADMIN_EMAIL).await;
        let editor_id = create_editor(&state).await.id;
        server
            .put(&format!("/api/v1/users/{}/languages", editor_id))
            .authorization_bearer(&admin)
            .json(&json!({"languages": ["urdu"]}))
            .await
            .assert_status_ok();

        let editor = login_as(&server, EDITOR_EMAIL).await;
        let mine: Value = server
            .get("/api/v1/languages/mine")
            .authorization_bearer(&editor)
            .await
            .json();
        assert_eq!(mine["total"], 1);
        assert_eq!(mine["items"][0]["code"], "urdu");

        server
            .post("/api/v1/languages")
            .authorization_bearer(&editor)
            .json(&json!({"code": "arabic"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
