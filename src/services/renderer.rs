//! HTML rendering and syntax highlighting.
//!
//! Pages are composed with `format!`; every value that did not come out of the
//! highlighter is escaped with [`escape_html`].

use syntect::{
    highlighting::ThemeSet,
    html::highlighted_html_for_string,
    parsing::{SyntaxReference, SyntaxSet},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown highlighting style `{0}`")]
    UnknownStyle(String),
    #[error("highlighting failed: {0}")]
    Highlight(#[from] syntect::Error),
}

/// Produces the HTML served for pastes and the index page.
pub trait Renderer: Send + Sync {
    /// Highlight `content` as `syntax` using theme `style`, returning markup.
    fn highlight(&self, content: &str, syntax: &str, style: &str) -> Result<String, RenderError>;

    /// Page showing already-safe markup with a link to the raw object.
    fn render_text_view(&self, markup: &str, download_url: &str) -> Result<Vec<u8>, RenderError>;

    /// Page offering an uploaded file for download.
    fn render_file_view(
        &self,
        filename: &str,
        download_url: &str,
        viewable_in_browser: bool,
    ) -> Result<Vec<u8>, RenderError>;

    /// Upload form.
    fn render_index(&self) -> Result<Vec<u8>, RenderError>;
}

/// Branding links shared by every page.
#[derive(Debug, Clone, Default)]
pub struct PageLinks {
    pub logo_url: String,
    pub index_url: String,
    pub favicon_url: String,
}

/// [`Renderer`] backed by syntect's bundled syntaxes and themes.
pub struct HtmlRenderer {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
    links: PageLinks,
}

impl HtmlRenderer {
    /// Load bundled syntaxes and themes; fails if `style` is not a known theme.
    pub fn new(links: PageLinks, style: &str) -> Result<Self, RenderError> {
        let renderer = Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
            links,
        };
        if !renderer.themes.themes.contains_key(style) {
            return Err(RenderError::UnknownStyle(style.to_string()));
        }
        Ok(renderer)
    }

    /// Names offered in the index page's syntax selector, sorted.
    pub fn syntax_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .syntaxes
            .syntaxes()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        names.sort_unstable_by_key(|n| n.to_ascii_lowercase());
        names.dedup();
        names
    }

    fn find_syntax(&self, name: &str) -> &SyntaxReference {
        self.syntaxes
            .find_syntax_by_name(name)
            .or_else(|| self.syntaxes.find_syntax_by_token(name))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }

    fn page(&self, title: &str, body: &str) -> Vec<u8> {
        let logo = if self.links.logo_url.is_empty() {
            String::new()
        } else {
            format!(
                r#"<img class="logo" src="{}" alt="logo">"#,
                escape_html(&self.links.logo_url)
            )
        };
        let favicon = if self.links.favicon_url.is_empty() {
            String::new()
        } else {
            format!(
                r#"<link rel="icon" href="{}">"#,
                escape_html(&self.links.favicon_url)
            )
        };
        format!(
            concat!(
                "<!DOCTYPE html>\n",
                r#"<html lang="en"><head><meta charset="utf-8">"#,
                r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#,
                "<title>{title}</title>{favicon}",
                "<style>body{{font-family:sans-serif;margin:1rem}}pre{{padding:.5rem;overflow:auto}}",
                "header{{margin-bottom:1rem}}.logo{{height:2rem;vertical-align:middle}}</style>",
                "</head><body>",
                r#"<header><a href="{index}">{logo}paste</a></header>"#,
                "<main>{body}</main></body></html>\n"
            ),
            title = escape_html(title),
            favicon = favicon,
            index = escape_html(&self.links.index_url),
            logo = logo,
            body = body,
        )
        .into_bytes()
    }
}

impl Renderer for HtmlRenderer {
    fn highlight(&self, content: &str, syntax: &str, style: &str) -> Result<String, RenderError> {
        let theme = self
            .themes
            .themes
            .get(style)
            .ok_or_else(|| RenderError::UnknownStyle(style.to_string()))?;
        let syntax = self.find_syntax(syntax);
        tracing::debug!("highlighting {} bytes as {}", content.len(), syntax.name);
        Ok(highlighted_html_for_string(
            content,
            &self.syntaxes,
            syntax,
            theme,
        )?)
    }

    fn render_text_view(&self, markup: &str, download_url: &str) -> Result<Vec<u8>, RenderError> {
        let body = format!(
            r#"<nav><a href="{}">raw</a></nav><div class="paste">{}</div>"#,
            escape_html(download_url),
            wrap_pre(markup)
        );
        Ok(self.page("paste", &body))
    }

    fn render_file_view(
        &self,
        filename: &str,
        download_url: &str,
        viewable_in_browser: bool,
    ) -> Result<Vec<u8>, RenderError> {
        let url = escape_html(download_url);
        let view = if viewable_in_browser {
            format!(r#" <a href="{}">view</a>"#, url)
        } else {
            String::new()
        };
        let body = format!(
            r#"<p class="file">{name}</p><p><a href="{url}" download="{name}">download</a>{view}</p>"#,
            name = escape_html(filename),
            url = url,
            view = view,
        );
        Ok(self.page(filename, &body))
    }

    fn render_index(&self) -> Result<Vec<u8>, RenderError> {
        let options: String = self
            .syntax_names()
            .into_iter()
            .map(|name| {
                let name = escape_html(name);
                format!(r#"<option value="{name}">{name}</option>"#)
            })
            .collect();
        let body = format!(
            concat!(
                r#"<form method="post" action="/" enctype="multipart/form-data">"#,
                r#"<p><textarea name="content" rows="20" cols="100"></textarea></p>"#,
                r#"<p><label>syntax <select name="syntax">"#,
                r#"<option value="plaintext" selected>plaintext</option>{options}</select></label></p>"#,
                r#"<p><label>or a file <input type="file" name="file"></label></p>"#,
                r#"<p><button type="submit">paste</button></p>"#,
                "</form>"
            ),
            options = options
        );
        tracing::debug!("rendered index with {} syntaxes", self.syntaxes.syntaxes().len());
        Ok(self.page("paste", &body))
    }
}

/// Highlighter output is already a `<pre>`; anything else gets wrapped in one.
fn wrap_pre(markup: &str) -> String {
    if markup.starts_with("<pre") {
        markup.to_string()
    } else {
        format!("<pre>{}</pre>", markup)
    }
}

/// Escape text for inclusion in HTML element content or quoted attributes.
pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
