//! Image service
//!
//! Keeps the image registry: uploaded files stored under the upload
//! directory and external URLs registered by editors.

use crate::config::UploadConfig;
use crate::db::repositories::ImageRepository;
use crate::models::{Image, User};
use anyhow::Context;
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ImageServiceError {
    #[error("Image not found")]
    NotFound,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ImageService {
    repo: Arc<dyn ImageRepository>,
    config: Arc<UploadConfig>,
}

impl ImageService {
    pub fn new(repo: Arc<dyn ImageRepository>, config: Arc<UploadConfig>) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Newest first, optionally filtered by uploader email
    pub async fn list(&self, uploader_email: Option<&str>) -> Result<Vec<Image>, ImageServiceError> {
        let email = uploader_email.map(str::trim).filter(|e| !e.is_empty());
        Ok(self.repo.list(email).await.context("Failed to list images")?)
    }

    /// Register an image hosted elsewhere
    pub async fn register(&self, actor: &User, url: &str) -> Result<Image, ImageServiceError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ImageServiceError::ValidationError(
                "Image URL is required".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with('/')) {
            return Err(ImageServiceError::ValidationError(format!(
                "Invalid image URL: {}",
                url
            )));
        }
        // Upload paths are created only by `upload`
        if self.config.local_file_name(url).is_some() {
            return Err(ImageServiceError::ValidationError(format!(
                "Upload paths cannot be registered: {}",
                url
            )));
        }

        Ok(self
            .repo
            .create(url, Some(actor.id))
            .await
            .context("Failed to register image")?)
    }

    /// Store an uploaded file under a fresh UUID name and register it
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a disallowed MIME type, an empty file or one
    ///   over the size limit
    pub async fn upload(
        &self,
        actor: &User,
        content_type: &str,
        data: &[u8],
    ) -> Result<Image, ImageServiceError> {
        let config = &self.config;
        if !config.is_type_allowed(content_type) {
            return Err(ImageServiceError::ValidationError(format!(
                "Invalid file type: {}. Allowed types: {}",
                content_type,
                config.allowed_types.join(", ")
            )));
        }
        if data.is_empty() {
            return Err(ImageServiceError::ValidationError(
                "No file provided".to_string(),
            ));
        }
        if data.len() as u64 > config.max_file_size {
            return Err(ImageServiceError::ValidationError(format!(
                "File too large. Maximum size: {} bytes ({} MB)",
                config.max_file_size,
                config.max_file_size / 1024 / 1024
            )));
        }

        fs::create_dir_all(&config.path)
            .await
            .with_context(|| format!("Failed to create upload directory {}", config.path.display()))?;

        let file_name = format!("{}.{}", Uuid::new_v4(), config.get_extension(content_type));
        fs::write(config.path.join(&file_name), data)
            .await
            .context("Failed to save file")?;

        let image = self
            .repo
            .create(&config.public_url(&file_name), Some(actor.id))
            .await
            .context("Failed to register image")?;

        tracing::info!("{} uploaded {} ({} bytes)", actor.email, image.url, data.len());
        Ok(image)
    }

    /// Remove an image; uploaded files are deleted from disk too.
    ///
    /// Super-admins may delete anything, other users only their own uploads.
    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), ImageServiceError> {
        let image = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get image")?
            .ok_or(ImageServiceError::NotFound)?;

        if !actor.is_super_admin() && image.uploaded_by != Some(actor.id) {
            return Err(ImageServiceError::Forbidden(
                "You can only delete your own images".to_string(),
            ));
        }

        if !self.repo.delete(id).await.context("Failed to delete image")? {
            return Err(ImageServiceError::NotFound);
        }

        if let Some(file_name) = self.config.local_file_name(&image.url) {
            let path = self.config.path.join(file_name);
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        Ok(())
    }
}
