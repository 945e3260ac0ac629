//! Image repository

use crate::db::DynDatabasePool;
use crate::models::Image;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const SELECT_IMAGES: &str = r#"
    SELECT images.id, images.url, images.uploaded_by, images.created_at, users.email AS uploader_email
    FROM images
    LEFT JOIN users ON users.id = images.uploaded_by
"#;

/// Image repository trait
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Register an image URL
    async fn create(&self, url: &str, uploaded_by: Option<i64>) -> Result<Image>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Image>>;

    /// Newest first, optionally only those uploaded by the given email
    async fn list(&self, uploader_email: Option<&str>) -> Result<Vec<Image>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based image repository implementation
pub struct SqlxImageRepository {
    pool: DynDatabasePool,
}

impl SqlxImageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ImageRepository> {
        Arc::new(Self::new(pool))
    }
}

macro_rules! row_to_image {
    ($row:expr) => {
        Image {
            id: $row.get("id"),
            url: $row.get("url"),
            uploaded_by: $row.get("uploaded_by"),
            uploader_email: $row.get("uploader_email"),
            created_at: $row.get("created_at"),
        }
    };
}

#[async_trait]
impl ImageRepository for SqlxImageRepository {
    async fn create(&self, url: &str, uploaded_by: Option<i64>) -> Result<Image> {
        let now = Utc::now();
        let id = on_pool!(self.pool, |pool| {
            let result = sqlx::query("INSERT INTO images (url, uploaded_by, created_at) VALUES (?, ?, ?)")
                .bind(url)
                .bind(uploaded_by)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to register image")?;
            result.inserted_id()
        });

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Image not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Image>> {
        let sql = format!("{} WHERE images.id = ?", SELECT_IMAGES);
        let image = on_pool!(self.pool, |pool| {
            sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get image")?
                .map(|row| row_to_image!(row))
        });
        Ok(image)
    }

    async fn list(&self, uploader_email: Option<&str>) -> Result<Vec<Image>> {
        let sql = match uploader_email {
            Some(_) => format!(
                "{} WHERE LOWER(users.email) = LOWER(?) ORDER BY images.created_at DESC, images.id DESC",
                SELECT_IMAGES
            ),
            None => format!("{} ORDER BY images.created_at DESC, images.id DESC", SELECT_IMAGES),
        };
        let images = on_pool!(self.pool, |pool| {
            let mut query = sqlx::query(&sql);
            if let Some(email) = uploader_email {
                query = query.bind(email);
            }
            query
                .fetch_all(pool)
                .await
                .context("Failed to list images")?
                .iter()
                .map(|row| row_to_image!(row))
                .collect::<Vec<_>>()
        });
        Ok(images)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |pool| {
            sqlx::query("DELETE FROM images WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete image")?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}

/// Driver-neutral access to the generated key of an insert
trait InsertId {
    fn inserted_id(&self) -> i64;
}

impl InsertId for sqlx::sqlite::SqliteQueryResult {
    fn inserted_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

impl InsertId for sqlx::mysql::MySqlQueryResult {
    fn inserted_id(&self) -> i64 {
        self.last_insert_id() as i64
    }
}
