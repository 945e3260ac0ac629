//! Language model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry in the global language table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub id: i64,
    /// Canonical code, e.g. `english`
    pub code: String,
    /// Display name
    pub name: String,
    pub status: LanguageStatus,
    pub created_at: DateTime<Utc>,
}

impl Language {
    pub fn is_active(&self) -> bool {
        self.status == LanguageStatus::Active
    }
}

/// Whether a language is offered for translation and on the public site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LanguageStatus {
    #[default]
    Active,
    Inactive,
}

impl LanguageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageStatus::Active => "active",
            LanguageStatus::Inactive => "inactive",
        }
    }

    /// Parse a stored status; anything unknown counts as inactive
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("active") {
            LanguageStatus::Active
        } else {
            LanguageStatus::Inactive
        }
    }
}

/// Input for creating or updating a language
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageInput {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<LanguageStatus>,
}
