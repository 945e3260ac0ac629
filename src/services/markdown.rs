//! Markdown rendering service
//!
//! Converts article and page bodies to HTML with pulldown-cmark, highlighting
//! fenced code with syntect. Also derives the plain-text and heading views
//! used by export and the article page.
//!
//! # Example
//!
//! ```
//! use cliniclane::services::markdown::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new();
//! let html = renderer.render("# Aspirin\n\nTake **with** water.");
//! assert!(html.contains("<h1>"));
//! assert!(html.contains("<strong>"));
//! ```

use once_cell::sync::Lazy;
use pulldown_cmark::{html, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::sync::Arc;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

const DEFAULT_THEME: &str = "base16-ocean.dark";

static MARKUP_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*_~`>#-]+").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());

/// A thread-safe Markdown renderer with syntax highlighting.
///
/// Tables, strikethrough, task lists and smart punctuation are enabled.
/// Inline HTML (including MDX component tags) passes through untouched.
#[derive(Clone)]
pub struct MarkdownRenderer {
    syntax_set: Arc<SyntaxSet>,
    theme_set: Arc<ThemeSet>,
    theme_name: String,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MarkdownRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownRenderer")
            .field("theme_name", &self.theme_name)
            .finish()
    }
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_THEME)
    }

    /// Use a specific syntect theme, falling back to `base16-ocean.dark`
    /// when the name is unknown.
    pub fn with_theme(theme_name: &str) -> Self {
        let theme_set = ThemeSet::load_defaults();
        let theme_name = if theme_set.themes.contains_key(theme_name) {
            theme_name.to_string()
        } else {
            DEFAULT_THEME.to_string()
        };

        Self {
            syntax_set: Arc::new(SyntaxSet::load_defaults_newlines()),
            theme_set: Arc::new(theme_set),
            theme_name,
        }
    }

    /// Render Markdown to HTML
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, parser_options());
        let events = self.highlight_code_blocks(parser);

        let mut output = String::new();
        html::push_html(&mut output, events.into_iter());
        output
    }

    /// Replace fenced and indented code blocks with pre-rendered HTML
    fn highlight_code_blocks<'a>(&self, parser: Parser<'a>) -> Vec<Event<'a>> {
        let mut events = Vec::new();
        let mut code: Option<(Option<String>, String)> = None;

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.trim().is_empty() => {
                            Some(lang.trim().to_string())
                        }
                        _ => None,
                    };
                    code = Some((lang, String::new()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, body)) = code.take() {
                        let html = match lang {
                            Some(lang) => self.highlight(&body, &lang),
                            None => format!("<pre><code>{}</code></pre>", html_escape(&body)),
                        };
                        events.push(Event::Html(html.into()));
                    }
                }
                Event::Text(text) if code.is_some() => {
                    if let Some((_, body)) = code.as_mut() {
                        body.push_str(&text);
                    }
                }
                other => events.push(other),
            }
        }

        events
    }

    fn highlight(&self, code: &str, lang: &str) -> String {
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang));

        let highlighted = syntax.and_then(|syntax| {
            let theme = self.theme_set.themes.get(&self.theme_name)?;
            highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok()
        });

        highlighted.unwrap_or_else(|| {
            format!(
                "<pre><code class=\"language-{}\">{}</code></pre>",
                html_escape(lang),
                html_escape(code)
            )
        })
    }
}

/// Text of every level-1 heading, in document order
pub fn extract_headings(markdown: &str) -> Vec<String> {
    let mut headings = Vec::new();
    let mut current: Option<String> = None;

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Start(Tag::Heading { level: HeadingLevel::H1, .. }) => {
                current = Some(String::new());
            }
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => {
                if let Some(text) = current.take() {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        headings.push(text);
                    }
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            _ => {}
        }
    }

    headings
}

/// Plain-text approximation of a Markdown body.
///
/// Drops emphasis, heading, quote, code and rule markers, unescapes
/// brackets and squeezes blank lines.
pub fn strip_markdown(markdown: &str) -> String {
    let text = MARKUP_RUNS.replace_all(markdown, "");
    let text = text.replace("\\[", "[").replace("\\]", "]");
    let text = text.replace("\r\n", "\n");
    BLANK_LINES.replace_all(&text, "\n").trim().to_string()
}

/// Escapes HTML special characters in a string.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_fallback() {
        assert_eq!(MarkdownRenderer::new().theme_name, "base16-ocean.dark");
        assert_eq!(MarkdownRenderer::with_theme("InspiredGitHub").theme_name, "InspiredGitHub");
        assert_eq!(MarkdownRenderer::with_theme("nope").theme_name, "base16-ocean.dark");
    }

    #[test]
    fn test_render_basic_blocks() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("# Uses\n\n- Pain\n- Fever\n\n~~old~~ text");
        assert!(html.contains("<h1>Uses</h1>"));
        assert!(html.contains("<li>Pain</li>"));
        assert!(html.contains("<del>old</del>"));
    }

    #[test]
    fn test_render_table_and_tasks() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("| Name | Price |\n| --- | --- |\n| Disprin | 10 |\n\n- [x] done");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>Disprin</td>"));
        assert!(html.contains("type=\"checkbox\""));
    }

    #[test]
    fn test_smart_punctuation() {
        let html = MarkdownRenderer::new().render("\"quoted\" -- dash");
        assert!(html.contains('\u{201c}'));
        assert!(html.contains('\u{2013}'));
    }

    #[test]
    fn test_code_block_highlighting() {
        let renderer = MarkdownRenderer::new();

        let highlighted = renderer.render("```rust\nfn main() {}\n```");
        assert!(highlighted.contains("<pre style="));

        let unknown = renderer.render("```dosage\n<1g>\n```");
        assert!(unknown.contains("class=\"language-dosage\""));
        assert!(unknown.contains("&lt;1g&gt;"));

        let plain = renderer.render("    indented <code>");
        assert!(plain.contains("<pre><code>indented &lt;code&gt;"));
    }

    #[test]
    fn test_inline_html_passes_through() {
        let html = MarkdownRenderer::new().render("<Callout type=\"warning\">Careful</Callout>");
        assert!(html.contains("<Callout type=\"warning\">"));
    }

    #[test]
    fn test_extract_headings() {
        let md = "Intro\n\n# Uses\n\ntext\n\n## Detail\n\n# Side `Effects`\n\n#\n";
        assert_eq!(extract_headings(md), vec!["Uses", "Side Effects"]);
        assert!(extract_headings("no headings here").is_empty());
    }

    #[test]
    fn test_strip_markdown() {
        let md = "# Uses\n\n\n- **Pain** relief\n> quoted\n\\[1\\] note";
        assert_eq!(strip_markdown(md), "Uses\n Pain relief\n quoted\n[1] note");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;");
    }
}
