//! Theme engine
//!
//! Renders the public site with Tera.
//! - Built-in templates are compiled into the binary
//! - An optional theme directory overrides any of them by file name
//! - Standard variables (site name, base URL, year, ...) are injected on
//!   every render

use crate::services::markdown::html_escape;
use anyhow::{Context, Result};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::ThemeError;

/// Templates shipped with the binary
const BUILTIN_TEMPLATES: [(&str, &str); 6] = [
    ("base.html", include_str!("templates/base.html")),
    ("index.html", include_str!("templates/index.html")),
    ("article.html", include_str!("templates/article.html")),
    ("page.html", include_str!("templates/page.html")),
    ("not_found.html", include_str!("templates/not_found.html")),
    ("sitemap.xml", include_str!("templates/sitemap.xml")),
];

/// Theme engine for rendering templates
pub struct ThemeEngine {
    tera: Tera,
}

impl ThemeEngine {
    /// Built-in templates only
    pub fn builtin() -> Result<Self> {
        Self::new(None)
    }

    /// Built-in templates, overridden by any `.html`/`.xml` file found under
    /// `override_path` (matched by relative path)
    pub fn new(override_path: Option<&Path>) -> Result<Self> {
        let mut templates: Vec<(String, String)> = BUILTIN_TEMPLATES
            .iter()
            .map(|(name, content)| (name.to_string(), content.to_string()))
            .collect();

        if let Some(path) = override_path {
            if path.is_dir() {
                let mut overrides = Vec::new();
                collect_templates_from_dir(path, path, &mut overrides)?;
                for (name, content) in overrides {
                    tracing::debug!("Theme override for {}", name);
                    match templates.iter_mut().find(|(existing, _)| *existing == name) {
                        Some(slot) => slot.1 = content,
                        None => templates.push((name, content)),
                    }
                }
            } else {
                tracing::warn!("Theme path {:?} is not a directory, using built-in templates", path);
            }
        }

        let mut tera = Tera::default();
        // Leaves `/` alone so URLs in attributes stay readable
        tera.set_escape_fn(html_escape);
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(format!("Failed to add templates: {}", e)))?;

        Ok(Self { tera })
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            let mut error_msg = format!("Failed to render '{}': {}", template, e);
            let mut source = e.source();
            while let Some(s) = source {
                error_msg.push_str(&format!("\n  Caused by: {}", s));
                source = s.source();
            }
            ThemeError::TemplateError(error_msg).into()
        })
    }

    /// Render with the standard variables merged into `context`
    pub fn render_with_standard_vars(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String> {
        let mut full_context = context.clone();
        full_context.insert("site_name", &standard_vars.site_name);
        full_context.insert("base_url", &standard_vars.base_url);
        full_context.insert("request_path", &standard_vars.request_path);
        full_context.insert("language", &standard_vars.language);
        full_context.insert("html_lang", &standard_vars.html_lang());
        full_context.insert("year", &standard_vars.year);
        self.render(template, &full_context)
    }

    /// Render a template, falling back to a bare error page.
    ///
    /// Always yields HTML.
    pub fn render_with_fallback(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> String {
        match self.render_with_standard_vars(template, context, standard_vars) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to render template '{}': {}", template, e);
                simple_error_page(template, &e.to_string())
            }
        }
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }
}

/// Collect templates from a directory, named by their path relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path
            .extension()
            .map_or(false, |ext| ext == "html" || ext == "xml")
        {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;
            templates.push((template_name, content));
        }
    }
    Ok(())
}

/// Last-resort page when a template fails
fn simple_error_page(template: &str, error: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Template Error</title>
</head>
<body>
    <h1>Template Error</h1>
    <p>Failed to render template: <code>{}</code></p>
    <pre>{}</pre>
</body>
</html>"#,
        html_escape(template),
        html_escape(error)
    )
}

/// Variables every public template can use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardTemplateVars {
    pub site_name: String,
    /// Absolute site root without trailing slash
    pub base_url: String,
    pub request_path: String,
    /// Resolved locale code, e.g. `german`
    pub language: String,
    /// Current year (for copyright)
    pub year: i32,
}

impl StandardTemplateVars {
    pub fn new(
        site_name: impl Into<String>,
        base_url: &str,
        request_path: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            site_name: site_name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            request_path: request_path.into(),
            language: language.into(),
            year: chrono::Utc::now().year(),
        }
    }

    /// BCP 47 tag for the `<html lang>` attribute
    pub fn html_lang(&self) -> &'static str {
        hreflang(&self.language)
    }
}

/// BCP 47 tag for a locale code; unknown codes map to `en`
pub fn hreflang(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "german" => "de",
        "french" => "fr",
        "urdu" => "ur",
        "spanish" => "es",
        "arabic" => "ar",
        _ => "en",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars() -> StandardTemplateVars {
        StandardTemplateVars::new("ClinicLane", "https://cliniclane.test/", "/aspirin", "german")
    }

    #[test]
    fn test_builtin_templates_load() {
        let engine = ThemeEngine::builtin().unwrap();
        for (name, _) in BUILTIN_TEMPLATES {
            assert!(engine.has_template(name), "missing {}", name);
        }
    }

    #[test]
    fn test_not_found_page_escapes_path() {
        let engine = ThemeEngine::builtin().unwrap();
        let mut v = vars();
        v.request_path = "/<script>".into();
        let html = engine
            .render_with_standard_vars("not_found.html", &TeraContext::new(), &v)
            .unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains(r#"<html lang="de">"#));
        assert!(html.contains(r#"href="https://cliniclane.test/""#));
    }

    #[test]
    fn test_page_template() {
        let engine = ThemeEngine::builtin().unwrap();
        let mut ctx = TeraContext::new();
        ctx.insert(
            "page",
            &serde_json::json!({"title": "About", "content_html": "<p>Hi</p>"}),
        );
        ctx.insert("canonical", "https://cliniclane.test/about");
        let html = engine.render_with_standard_vars("page.html", &ctx, &vars()).unwrap();
        assert!(html.contains("<title>About | ClinicLane</title>"));
        assert!(html.contains("<p>Hi</p>"));
    }

    #[test]
    fn test_override_directory_replaces_template() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("not_found.html"), "custom 404 for {{ request_path }}").unwrap();

        let engine = ThemeEngine::new(Some(dir.path())).unwrap();
        let html = engine
            .render_with_standard_vars("not_found.html", &TeraContext::new(), &vars())
            .unwrap();
        assert_eq!(html, "custom 404 for /aspirin");
        assert!(engine.has_template("article.html"));
    }

    #[test]
    fn test_fallback_on_render_error() {
        let engine = ThemeEngine::builtin().unwrap();
        let html = engine.render_with_fallback("missing.html", &TeraContext::new(), &vars());
        assert!(html.contains("Template Error"));
        assert!(html.contains("missing.html"));
    }

    #[test]
    fn test_hreflang() {
        assert_eq!(hreflang("German"), "de");
        assert_eq!(hreflang("urdu"), "ur");
        assert_eq!(hreflang("english"), "en");
        assert_eq!(hreflang("klingon"), "en");
    }
}
