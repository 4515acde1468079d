//! Runtime settings for the news pipeline.
//!
//! Settings come from three layers, later ones winning:
//! 1. Built-in defaults ([`Settings::default`])
//! 2. An optional YAML file
//! 3. The `NEWS_API_URL` environment variable or `--api-url` flag
//!
//! # Example file
//!
//! ```yaml
//! api_base_url: https://admin.dairyboard.mn/api
//! page_size: 10
//! carousel:
//!   autoplay_ms: 8000
//! ```

use crate::carousel::CarouselConfig;
use crate::content::{DEFAULT_EXCERPT_MAX, DEFAULT_MEDIA_PREFIXES};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

static TRAILING_API: Lazy<Regex> = Lazy::new(|| Regex::new(r"/api/?$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    pub page_size: u32,
    pub list_stale_secs: u64,
    pub detail_stale_secs: u64,
    pub cache_gc_secs: u64,
    pub excerpt_max: usize,
    pub media_prefixes: Vec<String>,
    pub placeholder_image: String,
    pub slide_tag: Option<String>,
    pub carousel: CarouselConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: 5,
            list_stale_secs: 30,
            detail_stale_secs: 60,
            cache_gc_secs: 300,
            excerpt_max: DEFAULT_EXCERPT_MAX,
            media_prefixes: DEFAULT_MEDIA_PREFIXES.iter().map(|s| s.to_string()).collect(),
            placeholder_image: "/news/placeholder.jpg".to_string(),
            slide_tag: Some("Мэдээ".to_string()),
            carousel: CarouselConfig::default(),
        }
    }
}

impl Settings {
    /// Parse settings from YAML; missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Defaults, then the optional file, then an explicit base URL override.
    #[instrument(level = "info", skip_all)]
    pub async fn load(
        path: Option<&str>,
        api_url_override: Option<&str>,
    ) -> Result<Self, Box<dyn Error>> {
        let mut settings = match path {
            Some(path) => {
                let yaml = tokio::fs::read_to_string(path).await?;
                info!(path, "Loaded settings file");
                Self::from_yaml(&yaml)?
            }
            None => Self::default(),
        };
        if let Some(url) = api_url_override.map(str::trim).filter(|u| !u.is_empty()) {
            settings.api_base_url = url.to_string();
        }
        info!(api_base_url = %settings.api_base_url, "Resolved settings");
        Ok(settings)
    }

    /// Origin serving uploaded media: the base URL without a trailing `/api`.
    pub fn backend_origin(&self) -> String {
        backend_origin(&self.api_base_url)
    }

    pub fn list_stale_time(&self) -> Duration {
        Duration::from_secs(self.list_stale_secs)
    }

    pub fn detail_stale_time(&self) -> Duration {
        Duration::from_secs(self.detail_stale_secs)
    }

    pub fn cache_gc_time(&self) -> Duration {
        Duration::from_secs(self.cache_gc_secs)
    }
}

/// Strip a trailing `/api` or `/api/` segment from a base URL.
pub fn backend_origin(api_base_url: &str) -> String {
    TRAILING_API.replace(api_base_url, "").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.api_base_url, "http://localhost:8000/api");
        assert_eq!(settings.list_stale_time(), Duration::from_secs(30));
        assert_eq!(settings.detail_stale_time(), Duration::from_secs(60));
        assert_eq!(settings.excerpt_max, 160);
        assert_eq!(settings.backend_origin(), "http://localhost:8000");
    }

    #[test]
    fn test_backend_origin_variants() {
        assert_eq!(backend_origin("https://admin.dairyboard.mn/api"), "https://admin.dairyboard.mn");
        assert_eq!(backend_origin("https://admin.dairyboard.mn/api/"), "https://admin.dairyboard.mn");
        assert_eq!(backend_origin("https://admin.dairyboard.mn/v2"), "https://admin.dairyboard.mn/v2");
        assert_eq!(backend_origin("https://api.example.com/apis"), "https://api.example.com/apis");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "api_base_url: https://admin.dairyboard.mn/api\npage_size: 10\ncarousel:\n  autoplay_ms: 8000\n";
        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.carousel.autoplay_ms, 8000);
        assert_eq!(settings.carousel.drag_offset_px, 60.0);
        assert_eq!(settings.list_stale_secs, 30);
        assert_eq!(settings.placeholder_image, "/news/placeholder.jpg");
    }

    #[tokio::test]
    async fn test_load_override_wins() {
        let settings = Settings::load(None, Some("https://x.mn/api/")).await.unwrap();
        assert_eq!(settings.api_base_url, "https://x.mn/api/");
        assert_eq!(settings.backend_origin(), "https://x.mn");

        let settings = Settings::load(None, Some("   ")).await.unwrap();
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
    }
}
