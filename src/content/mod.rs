//! Preparation of externally authored news bodies for display.
//!
//! The transforms here are pure and infallible:
//!
//! | Transform | Module | Input | Output |
//! |-----------|--------|-------|--------|
//! | Excerpt | [`excerpt`] | any markup | plain text, length-capped |
//! | Media absolutization | [`media`] | raw markup / cover path | absolute URLs |
//! | Sanitization | [`sanitize`] | raw markup | [`SafeHtml`] |
//! | Date display | [`date`] | ISO-8601 string | `"2025 оны 5-р сарын 6"` |
//!
//! [`prepare_body`] chains them in the only order that is safe: plain-text
//! conversion, then absolutization, then sanitization. A body can reach a
//! renderer only as a [`SafeHtml`], and the only way to get one is through
//! the sanitizer.

pub mod date;
pub mod excerpt;
pub mod media;
pub mod sanitize;

pub use date::format_date_mn;
pub use excerpt::{excerpt, DEFAULT_EXCERPT_MAX};
pub use media::{absolutize_media, absolutize_url, DEFAULT_MEDIA_PREFIXES};
pub use sanitize::{sanitize, SafeHtml};

use once_cell::sync::Lazy;
use regex::Regex;

static LOOKS_LIKE_HTML: Lazy<Regex> = Lazy::new(|| Regex::new(r"<\w+[\s>]").expect("valid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").expect("valid regex"));

/// Escape the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Turn a plain-text body into paragraphs.
///
/// Blank lines separate paragraphs; a single newline becomes `<br>`.
pub fn plain_text_to_html(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    BLANK_LINES
        .split(trimmed)
        .map(|para| format!("<p>{}</p>", escape_html(para).replace('\n', "<br>")))
        .collect()
}

/// Full body pipeline: plain text to markup, absolute media URLs, sanitize.
pub fn prepare_body(raw: Option<&str>, backend_origin: &str, media_prefixes: &[String]) -> SafeHtml {
    let raw = match raw {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return SafeHtml::default(),
    };
    let html = if LOOKS_LIKE_HTML.is_match(raw) {
        raw.to_string()
    } else {
        plain_text_to_html(raw)
    };
    let html = absolutize_media(&html, backend_origin, media_prefixes);
    sanitize(&html)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes() -> Vec<String> {
        DEFAULT_MEDIA_PREFIXES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plain_text_to_html() {
        assert_eq!(plain_text_to_html("   "), "");
        assert_eq!(plain_text_to_html("one"), "<p>one</p>");
        assert_eq!(
            plain_text_to_html("line a\nline b\n\nsecond <para>"),
            "<p>line a<br>line b</p><p>second &lt;para&gt;</p>"
        );
    }

    #[test]
    fn test_prepare_body_empty() {
        assert_eq!(prepare_body(None, "http://b", &prefixes()).as_str(), "");
        assert_eq!(prepare_body(Some("  \n"), "http://b", &prefixes()).as_str(), "");
    }

    #[test]
    fn test_prepare_body_plain_text() {
        let out = prepare_body(Some("Hello\n\nWorld"), "http://b", &prefixes());
        assert_eq!(out.as_str(), "<p>Hello</p><p>World</p>");
    }

    #[test]
    fn test_prepare_body_absolutizes_before_sanitizing() {
        let raw = r#"<p>Cows</p><img src="/media/uploads/cow.jpg" alt="cow"><script>steal()</script>"#;
        let out = prepare_body(Some(raw), "http://localhost:8000", &prefixes());
        assert!(out.as_str().contains(r#"src="http://localhost:8000/media/uploads/cow.jpg""#));
        assert!(out.as_str().contains("<p>Cows</p>"));
        assert!(!out.as_str().contains("<script"));
        assert!(!out.as_str().contains("steal"));
    }
}
