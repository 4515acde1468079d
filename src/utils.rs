//! Small helpers shared by the library and the binary.
//!
//! - Log-friendly truncation of long payloads
//! - Page-number extraction from continuation URLs
//! - Output directory validation

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Truncate a string for logging purposes.
///
/// Long strings are cut after `max` characters and get an ellipsis plus the
/// number of bytes left out. Cuts always land on a character boundary.
///
/// # Arguments
///
/// * `s` - The text to shorten
/// * `max` - Maximum number of characters kept
///
/// # Returns
///
/// `s` unchanged when it fits, otherwise the first `max` characters followed
/// by `…(+N bytes)`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Read the `page` query parameter from a continuation URL.
///
/// The backend hands out either absolute or root-relative URLs, so relative
/// input is resolved against a dummy origin first. Anything that is not a
/// positive integer yields `None`.
///
/// # Arguments
///
/// * `raw` - A `next`/`previous` URL from a list response
///
/// # Returns
///
/// The page number, or `None` when the URL has no usable `page` parameter.
pub fn page_from_url(raw: &str) -> Option<u32> {
    let dummy = Url::parse("http://x.local/").ok()?;
    let url = dummy.join(raw).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse::<u32>().ok())
        .filter(|p| *p > 0)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Arguments
///
/// * `path` - Directory the feed will be written under
///
/// # Returns
///
/// `Ok(())` when the directory accepts new files, or the I/O error that
/// prevented creating it or writing into it.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
