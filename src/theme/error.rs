//! Theme engine error types

use thiserror::Error;

/// Theme-specific errors
#[derive(Debug, Error)]
pub enum ThemeError {
    /// Template parsing or rendering error
    #[error("Template error: {0}")]
    TemplateError(String),
}
