//! Plain-text excerpts of rich bodies for cards and slides.

use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_EXCERPT_MAX: usize = 160;

static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strip tags, collapse whitespace and cap the text at `max` characters.
///
/// Tags are removed before measuring, so a cut never lands inside markup.
/// When the text is cut, the tail is trimmed and a single `…` appended.
pub fn excerpt(html: &str, max: usize) -> String {
    let stripped = TAGS.replace_all(html, "");
    let text = WHITESPACE.replace_all(&stripped, " ");
    let text = text.trim();

    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
    }
}
