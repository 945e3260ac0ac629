//! Image API endpoints
//!
//! Handles the image registry:
//! - GET /api/v1/images - List images (`?email=` filters by uploader)
//! - POST /api/v1/images - Register an external image URL
//! - POST /api/v1/images/upload - Upload a file (multipart field "file")
//! - DELETE /api/v1/images/{id} - Delete image (and its local file)

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ListResponse;
use crate::models::Image;

/// Multipart framing allowance on top of the file size limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the image router; request bodies are capped just above `max_file_size`
pub fn router(max_file_size: u64) -> Router<AppState> {
    Router::new()
        .route("/", get(list_images).post(register_image))
        .route(
            "/upload",
            post(upload_image)
                .layer(DefaultBodyLimit::max(max_file_size as usize + MULTIPART_OVERHEAD)),
        )
        .route("/{id}", delete(delete_image))
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageListQuery {
    #[serde(default)]
    pub email: Option<String>,
}

/// GET /api/v1/images
async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<ImageListQuery>,
) -> Result<Json<ListResponse<Image>>, ApiError> {
    let images = state.image_service.list(query.email.as_deref()).await?;
    Ok(Json(images.into()))
}

#[derive(Debug, Deserialize)]
pub struct RegisterImageRequest {
    pub url: String,
}

/// POST /api/v1/images
async fn register_image(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<RegisterImageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let image = state.image_service.register(&user.0, &body.url).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// POST /api/v1/images/upload
///
/// Accepts multipart/form-data with a single file field named "file".
async fn upload_image(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        // Reject before buffering the body
        if !state.image_service.config().is_type_allowed(&content_type) {
            return Err(ApiError::validation_error(format!(
                "Invalid file type: {}. Allowed types: {}",
                content_type,
                state.image_service.config().allowed_types.join(", ")
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

        let image = state
            .image_service
            .upload(&user.0, &content_type, &data)
            .await?;
        return Ok((StatusCode::CREATED, Json(image)));
    }

    Err(ApiError::validation_error("No file provided"))
}

/// DELETE /api/v1/images/{id}
async fn delete_image(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.image_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{create_editor, login_as, test_server, ADMIN_EMAIL, EDITOR_EMAIL};
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::{json, Value};

    fn png_form(bytes: &[u8]) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(bytes.to_vec())
                .file_name("pill.png")
                .mime_type("image/png"),
        )
    }

    #[tokio::test]
    async fn test_upload_serve_and_delete() {
        let (server, _state) = test_server().await;
        let token = login_as(&server, ADMIN_EMAIL).await;

        let uploaded = server
            .post("/api/v1/images/upload")
            .authorization_bearer(&token)
            .multipart(png_form(b"\x89PNG fake image"))
            .await;
        uploaded.assert_status(StatusCode::CREATED);
        let image: Value = uploaded.json();
        let url = image["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".png"));

        let served = server.get(&url).await;
        served.assert_status_ok();
        assert_eq!(served.as_bytes().as_ref(), b"\x89PNG fake image");

        server
            .delete(&format!("/api/v1/images/{}", image["id"]))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server.get(&url).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_rejects_wrong_type_and_missing_file() {
        let (server, _state) = test_server().await;
        let token = login_as(&server, ADMIN_EMAIL).await;

        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(b"%PDF-1.4".to_vec())
                .file_name("leaflet.pdf")
                .mime_type("application/pdf"),
        );
        server
            .post("/api/v1/images/upload")
            .authorization_bearer(&token)
            .multipart(form)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let form = MultipartForm::new().add_text("caption", "no file here");
        let response = server
            .post("/api/v1/images/upload")
            .authorization_bearer(&token)
            .multipart(form)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"]["message"], "No file provided");
    }

    #[tokio::test]
    async fn test_register_list_by_email_and_ownership() {
        let (server, state) = test_server().await;
        let admin = login_as(&server, ADMIN_EMAIL).await;
        create_editor(&state).await;
        let editor = login_as(&server, EDITOR_EMAIL).await;

        let theirs: Value = server
            .post("/api/v1/images")
            .authorization_bearer(&admin)
            .json(&json!({"url": "https://cdn.example.com/a.jpg"}))
            .await
            .json();
        server
            .post("/api/v1/images")
            .authorization_bearer(&editor)
            .json(&json!({"url": "https://cdn.example.com/b.jpg"}))
            .await
            .assert_status(StatusCode::CREATED);

        let filtered: Value = server
            .get(&format!("/api/v1/images?email={}", EDITOR_EMAIL))
            .authorization_bearer(&editor)
            .await
            .json();
        assert_eq!(filtered["total"], 1);
        assert_eq!(filtered["items"][0]["url"], "https://cdn.example.com/b.jpg");

        server
            .delete(&format!("/api/v1/images/{}", theirs["id"]))
            .authorization_bearer(&editor)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
