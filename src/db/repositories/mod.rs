//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

/// Run a block against whichever backend the pool wraps.
///
/// Only for statements whose SQL is portable: both drivers share one body
/// and only the executor type differs.
macro_rules! on_pool {
    ($pool:expr, |$p:ident| $body:expr) => {
        match $pool.driver() {
            $crate::config::DatabaseDriver::Sqlite => {
                let $p = $pool.as_sqlite().unwrap();
                $body
            }
            $crate::config::DatabaseDriver::Mysql => {
                let $p = $pool.as_mysql().unwrap();
                $body
            }
        }
    };
}

pub mod article;
pub mod image;
pub mod language;
pub mod page_content;
pub mod session;
pub mod translation;
pub mod user;

pub use article::{
    ArticleRepository, ImportOutcome, ImportTranslation, NewArticle, NewTranslation,
    SqlxArticleRepository, TranslationTarget,
};
pub use image::{ImageRepository, SqlxImageRepository};
pub use language::{LanguageRepository, SqlxLanguageRepository};
pub use page_content::{PageContentRepository, PageRecord, SqlxPageContentRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use translation::{SqlxTranslationRepository, TranslationRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// Store a string list as a JSON array
pub(crate) fn encode_string_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Read a JSON array column back; malformed values read as empty
pub(crate) fn decode_string_list(raw: String) -> Vec<String> {
    serde_json::from_str(&raw).unwrap_or_default()
}

/// `?, ?, ?` for an `IN (...)` clause
pub(crate) fn in_placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_list_roundtrip() {
        let tags = vec!["pain".to_string(), "fever, mild".to_string()];
        assert_eq!(decode_string_list(encode_string_list(&tags)), tags);
        assert!(decode_string_list("not json".to_string()).is_empty());
    }

    #[test]
    fn test_in_placeholders() {
        assert_eq!(in_placeholders(3), "?, ?, ?");
        assert_eq!(in_placeholders(1), "?");
    }
}
