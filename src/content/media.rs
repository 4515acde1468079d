//! Rewriting of backend-relative media paths into absolute URLs.
//!
//! Uploaded files live on the backend origin (`{origin}/media/...`), not on
//! the site that renders them, so root-relative paths in editor output and
//! cover fields have to be anchored before display.

use regex::{Captures, Regex};
use tracing::warn;

pub const DEFAULT_MEDIA_PREFIXES: &[&str] = &["/media/", "/ckeditor5/"];

/// Prefix every `src`/`href`/`poster` value starting with a media prefix
/// with `backend_origin`.
///
/// Works on the raw text: the markup has not been sanitized yet and is not
/// parsed here. Attribute names match in any case, with or without quotes
/// and with spaces around `=`. Absolute URLs never match a root-relative
/// prefix, so applying this twice changes nothing.
pub fn absolutize_media(html: &str, backend_origin: &str, prefixes: &[String]) -> String {
    let origin = backend_origin.trim_end_matches('/');
    let alternatives: Vec<String> = prefixes
        .iter()
        .filter(|p| p.starts_with('/'))
        .map(|p| regex::escape(p))
        .collect();
    if alternatives.is_empty() {
        return html.to_string();
    }

    let pattern = format!(
        r#"(?i)(\b(?:src|href|poster)\s*=\s*["']?)({})"#,
        alternatives.join("|")
    );
    let attr_url = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!(error = %e, "Media prefix pattern rejected; leaving markup as is");
            return html.to_string();
        }
    };
    attr_url
        .replace_all(html, |caps: &Captures| format!("{}{}{}", &caps[1], origin, &caps[2]))
        .into_owned()
}

/// Absolutize a single cover URL.
///
/// `http://` and `https://` pass through; anything else is joined onto the
/// backend origin. Missing or blank input yields `None`.
pub fn absolutize_url(url: Option<&str>, backend_origin: &str) -> Option<String> {
    let url = url.map(str::trim).filter(|u| !u.is_empty())?;
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(url.to_string());
    }
    let origin = backend_origin.trim_end_matches('/');
    if url.starts_with('/') {
        Some(format!("{origin}{url}"))
    } else {
        Some(format!("{origin}/{url}"))
    }
}
