//! Services layer - Business logic
//!
//! This module contains all business logic services for ClinicLane.
//! Services are responsible for:
//! - Enforcing the article and language scope of the acting user
//! - Coordinating between repositories and cache
//! - Handling validation and error cases

pub mod article;
pub mod image;
pub mod import;
pub mod language;
pub mod localization;
pub mod markdown;
pub mod page;
pub mod password;
pub mod user;

pub use article::{generate_slug, ArticleService, ArticleServiceError};
pub use image::{ImageService, ImageServiceError};
pub use import::{ImportError, ImportMode, ImportOptions, ImportResult, ImportService};
pub use language::{LanguageService, LanguageServiceError};
pub use localization::{filter_by_language, localize, resolve_locale, LOCALE_COOKIE};
pub use markdown::{extract_headings, strip_markdown, MarkdownRenderer};
pub use page::{PageService, PageServiceError};
pub use password::{hash_password, verify_password};
pub use user::{
    ArticleAssignment, ChangePasswordInput, LoginInput, RegisterInput, UserService,
    UserServiceError,
};
