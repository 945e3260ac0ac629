//! Image model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered image, either uploaded locally or an external URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub url: String,
    /// Uploader's user id, cleared when the user is deleted
    pub uploaded_by: Option<i64>,
    /// Uploader's email, joined in on listing
    #[serde(default)]
    pub uploader_email: Option<String>,
    pub created_at: DateTime<Utc>,
}
