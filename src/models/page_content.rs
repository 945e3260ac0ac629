//! Static page model (about, privacy, advertising, ...)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub id: i64,
    /// URL-friendly slug, unique across pages
    pub slug: String,
    pub title: String,
    /// Markdown body
    pub content: String,
    /// Rendered HTML body
    pub content_html: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatePageInput {
    pub slug: String,
    pub title: String,
    pub content: String,
}

/// Input for updating a page. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatePageInput {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
}
