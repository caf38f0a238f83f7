//! Plain-text helpers for HTML bodies and feed snippets.

use std::sync::LazyLock;

use regex::Regex;

static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|svg|head)\b[^>]*>.*?</(script|style|noscript|svg|head)>")
        .expect("valid block regex")
});

/// Wrap width handed to the renderer; lines are re-joined afterwards.
const RENDER_WIDTH: usize = 120;

/// Strip HTML tags from a short snippet, returning trimmed plain text.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.trim().to_string()
}

/// Reduce a full HTML page to readable text: drop non-content blocks, render
/// the rest with `html2text` (tags, entities, lists) and collapse whitespace.
///
/// Falls back to [`strip_html`] if the document cannot be rendered.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let without_blocks = BLOCK_RE.replace_all(html, " ");
    let rendered = html2text::from_read(without_blocks.as_bytes(), RENDER_WIDTH)
        .unwrap_or_else(|e| {
            tracing::debug!(error = %e, "html render failed, stripping tags instead");
            strip_html(&without_blocks)
        });
    rendered.split_whitespace().collect::<Vec<_>>().join(" ")
}
