//! Data models
//!
//! Database entities and the input types accepted by services and the API.

mod article;
mod image;
mod language;
mod page_content;
mod session;
mod user;

pub use article::{
    Article, CreateArticleInput, ListParams, PagedResult, Translation, TranslationInput,
    UpdateArticleInput, DEFAULT_LANGUAGE,
};
pub use image::Image;
pub use language::{Language, LanguageInput, LanguageStatus};
pub use page_content::{CreatePageInput, PageContent, UpdatePageInput};
pub use session::Session;
pub use user::{CreateUserInput, User, UserRole};
