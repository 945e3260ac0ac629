//! Language service
//!
//! Manages the global language table and seeds the configured locales.

use crate::config::LocaleConfig;
use crate::db::repositories::LanguageRepository;
use crate::models::{Language, LanguageInput, LanguageStatus, User};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LanguageServiceError {
    #[error("Language not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct LanguageService {
    repo: Arc<dyn LanguageRepository>,
}

impl LanguageService {
    pub fn new(repo: Arc<dyn LanguageRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<Language>, LanguageServiceError> {
        Ok(self.repo.list().await.context("Failed to list languages")?)
    }

    /// Languages the user may translate into
    pub async fn mine(&self, user: &User) -> Result<Vec<Language>, LanguageServiceError> {
        let all = self.list().await?;
        Ok(all
            .into_iter()
            .filter(|l| user.can_edit_language(&l.code))
            .collect())
    }

    /// Create the language unless its code exists; an existing record is
    /// returned untouched. The flag tells whether it was created.
    pub async fn upsert(
        &self,
        actor: &User,
        input: LanguageInput,
    ) -> Result<(Language, bool), LanguageServiceError> {
        require_super_admin(actor)?;

        let code = normalize_code(&input.code)?;
        let name = input
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| code.clone());

        let (language, created) = self
            .repo
            .create_if_missing(&code, &name, input.status.unwrap_or_default())
            .await
            .context("Failed to create language")?;

        if created {
            tracing::info!("Language {} added by {}", language.code, actor.email);
        }
        Ok((language, created))
    }

    /// Change the name and/or status of an existing language
    pub async fn update(
        &self,
        actor: &User,
        code: &str,
        input: LanguageInput,
    ) -> Result<Language, LanguageServiceError> {
        require_super_admin(actor)?;

        let code = normalize_code(code)?;
        let existing = self
            .repo
            .get_by_code(&code)
            .await
            .context("Failed to get language")?
            .ok_or_else(|| LanguageServiceError::NotFound(code.clone()))?;

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or(existing.name);
        let status = input.status.unwrap_or(existing.status);

        self.repo
            .update(&code, &name, status)
            .await
            .context("Failed to update language")?
            .ok_or(LanguageServiceError::NotFound(code))
    }

    /// Insert configured locales that are missing. Returns how many were added.
    pub async fn seed_defaults(&self, locales: &[LocaleConfig]) -> Result<usize, LanguageServiceError> {
        let mut created = 0;
        for locale in locales {
            let code = normalize_code(&locale.code)?;
            let (_, inserted) = self
                .repo
                .create_if_missing(&code, &locale.name, LanguageStatus::Active)
                .await
                .with_context(|| format!("Failed to seed language {}", code))?;
            if inserted {
                created += 1;
            }
        }
        if created > 0 {
            tracing::info!("Seeded {} languages", created);
        }
        Ok(created)
    }
}

fn normalize_code(raw: &str) -> Result<String, LanguageServiceError> {
    let code = raw.trim().to_lowercase();
    if code.is_empty() {
        return Err(LanguageServiceError::ValidationError(
            "Language code is required".to_string(),
        ));
    }
    Ok(code)
}

fn require_super_admin(actor: &User) -> Result<(), LanguageServiceError> {
    if actor.is_super_admin() {
        Ok(())
    } else {
        Err(LanguageServiceError::Forbidden(
            "Super-admin access required".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxLanguageRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::UserRole;

    async fn service() -> LanguageService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        LanguageService::new(SqlxLanguageRepository::boxed(pool))
    }

    fn admin() -> User {
        User::new("root@example.com".into(), "x".into(), UserRole::SuperAdmin)
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let service = service().await;
        let locales = crate::config::SiteConfig::default().locales;

        assert_eq!(service.seed_defaults(&locales).await.unwrap(), 4);
        assert_eq!(service.seed_defaults(&locales).await.unwrap(), 0);

        let codes: Vec<String> = service.list().await.unwrap().into_iter().map(|l| l.code).collect();
        assert_eq!(codes, vec!["english", "german", "french", "urdu"]);
    }

    #[tokio::test]
    async fn test_upsert_leaves_existing_untouched() {
        let service = service().await;
        let admin = admin();

        let (created, was_new) = service
            .upsert(
                &admin,
                LanguageInput {
                    code: " Spanish ".into(),
                    name: Some("Español".into()),
                    status: None,
                },
            )
            .await
            .unwrap();
        assert!(was_new);
        assert_eq!(created.code, "spanish");
        assert!(created.is_active());

        let (again, was_new) = service
            .upsert(
                &admin,
                LanguageInput {
                    code: "spanish".into(),
                    name: Some("Renamed".into()),
                    status: Some(LanguageStatus::Inactive),
                },
            )
            .await
            .unwrap();
        assert!(!was_new);
        assert_eq!(again.name, "Español");
        assert!(again.is_active());

        let empty = service.upsert(&admin, LanguageInput::default()).await;
        assert!(matches!(empty, Err(LanguageServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_update_and_scope() {
        let service = service().await;
        let admin = admin();
        service
            .seed_defaults(&crate::config::SiteConfig::default().locales)
            .await
            .unwrap();

        let updated = service
            .update(
                &admin,
                "french",
                LanguageInput {
                    status: Some(LanguageStatus::Inactive),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Français");
        assert!(!updated.is_active());

        let missing = service.update(&admin, "klingon", LanguageInput::default()).await;
        assert!(matches!(missing, Err(LanguageServiceError::NotFound(_))));

        let mut editor = User::new("e@example.com".into(), "x".into(), UserRole::User);
        editor.assigned_languages = vec!["urdu".into(), "german".into()];
        let mine: Vec<String> = service.mine(&editor).await.unwrap().into_iter().map(|l| l.code).collect();
        assert_eq!(mine, vec!["german", "urdu"]);

        let denied = service.upsert(&editor, LanguageInput { code: "x".into(), ..Default::default() }).await;
        assert!(matches!(denied, Err(LanguageServiceError::Forbidden(_))));
    }
}
