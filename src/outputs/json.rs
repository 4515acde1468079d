//! JSON output of the prepared carousel feed.
//!
//! One file per local date; a later run on the same day replaces it.

use crate::models::CarouselSlide;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// The document written to `news.json`.
#[derive(Debug, Clone, Serialize)]
pub struct FeedDocument {
    pub local_date: String,
    pub generated_at: String,
    pub total_count: Option<u64>,
    pub slides: Vec<CarouselSlide>,
}

impl FeedDocument {
    pub fn new(slides: Vec<CarouselSlide>, total_count: Option<u64>, now: DateTime<Local>) -> Self {
        Self {
            local_date: now.date_naive().to_string(),
            generated_at: now.to_rfc3339(),
            total_count,
            slides,
        }
    }
}

/// Write `feed` to `{json_output_dir}/{local_date}/news.json`.
///
/// Creates the dated directory when missing and replaces any file an
/// earlier run wrote on the same day.
///
/// # Arguments
///
/// * `feed` - The prepared slides to serialize
/// * `json_output_dir` - Base directory for JSON output
///
/// # Returns
///
/// The path of the written file, or an error if serialization, directory
/// creation or the write fails.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_feed(
    feed: &FeedDocument,
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(feed)?;

    let dir = PathBuf::from(json_output_dir).join(&feed.local_date);
    info!(dir = %dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&dir).await {
        error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = dir.join("news.json");
    fs::write(&path, json).await?;
    info!(path = %path.display(), slides = feed.slides.len(), "Wrote news feed");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn slide(id: u64) -> CarouselSlide {
        CarouselSlide {
            id,
            title: format!("News {id}"),
            excerpt: "Short".to_string(),
            date_text: "2025 оны 5-р сарын 6".to_string(),
            date_time: Some("2025-05-06T08:00:00Z".to_string()),
            image: "/news/placeholder.jpg".to_string(),
            href: Some(format!("/news/news-{id}")),
            tag: None,
            modal: None,
        }
    }

    #[test]
    fn test_feed_document_date() {
        let now = Local.with_ymd_and_hms(2025, 5, 6, 9, 30, 0).unwrap();
        let doc = FeedDocument::new(vec![slide(1)], Some(7), now);
        assert_eq!(doc.local_date, "2025-05-06");
        assert!(doc.generated_at.starts_with("2025-05-06T09:30:00"));
    }

    #[tokio::test]
    async fn test_write_feed() {
        let dir = std::env::temp_dir().join(format!("dairy_news_json_{}", std::process::id()));
        let now = Local.with_ymd_and_hms(2025, 5, 6, 9, 30, 0).unwrap();
        let doc = FeedDocument::new(vec![slide(1), slide(2)], Some(2), now);

        let path = write_feed(&doc, &dir.to_string_lossy()).await.unwrap();
        assert_eq!(path, dir.join("2025-05-06").join("news.json"));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["total_count"], 2);
        assert_eq!(written["slides"][1]["href"], "/news/news-2");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
