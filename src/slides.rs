//! Projection of news records into what the carousel and dialog render.

use crate::config::Settings;
use crate::content::{absolutize_url, excerpt, format_date_mn, prepare_body, sanitize, SafeHtml};
use crate::error::FetchError;
use crate::models::{CarouselSlide, ModalPayload, NewsItem};

/// Everything the projection needs from [`Settings`], resolved once.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideOptions {
    pub backend_origin: String,
    pub media_prefixes: Vec<String>,
    pub excerpt_max: usize,
    pub placeholder_image: String,
    pub tag: Option<String>,
}

impl SlideOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            backend_origin: settings.backend_origin(),
            media_prefixes: settings.media_prefixes.clone(),
            excerpt_max: settings.excerpt_max,
            placeholder_image: settings.placeholder_image.clone(),
            tag: settings.slide_tag.clone().filter(|t| !t.trim().is_empty()),
        }
    }
}

/// Dialog content for one item. The body goes through the full pipeline;
/// a missing cover shows the placeholder image, as on the slide.
pub fn modal_payload(item: &NewsItem, options: &SlideOptions) -> ModalPayload {
    let image = absolutize_url(item.cover.as_deref(), &options.backend_origin)
        .unwrap_or_else(|| options.placeholder_image.clone());
    ModalPayload {
        title: item.title.clone(),
        date_text: format_date_mn(item.published_at.as_deref()),
        date_time: item.published_at.clone(),
        image: Some(image),
        body: prepare_body(Some(&item.body), &options.backend_origin, &options.media_prefixes),
    }
}

pub fn slide_from_news(item: &NewsItem, options: &SlideOptions) -> CarouselSlide {
    let modal = modal_payload(item, options);
    CarouselSlide {
        id: item.id,
        title: item.title.clone(),
        excerpt: excerpt(&item.body, options.excerpt_max),
        date_text: modal.date_text.clone(),
        date_time: modal.date_time.clone(),
        image: modal
            .image
            .clone()
            .unwrap_or_else(|| options.placeholder_image.clone()),
        href: (!item.slug.is_empty()).then(|| format!("/news/{}", item.slug)),
        tag: options.tag.clone(),
        modal: Some(modal),
    }
}

pub fn slides_from_news(items: &[NewsItem], options: &SlideOptions) -> Vec<CarouselSlide> {
    items.iter().map(|item| slide_from_news(item, options)).collect()
}

/// Content for a dialog whose detail fetch failed. Never blank.
pub fn fallback_payload(err: &FetchError) -> ModalPayload {
    let (title, message) = if err.is_not_found() {
        ("Мэдээ олдсонгүй", "Уучлаарай, энэ мэдээ устгагдсан эсвэл нийтлэгдээгүй байна.")
    } else {
        ("Мэдээг ачаалж чадсангүй", "Түр хүлээгээд дахин оролдоно уу.")
    };
    ModalPayload {
        title: title.to_string(),
        date_text: String::new(),
        date_time: None,
        image: None,
        body: fallback_body(message),
    }
}

fn fallback_body(message: &str) -> SafeHtml {
    sanitize(&format!("<p>{}</p>", crate::content::escape_html(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testdata::item;

    fn options() -> SlideOptions {
        SlideOptions::from_settings(&Settings::default())
    }

    fn news(id: u64) -> NewsItem {
        serde_json::from_value(item(id)).unwrap()
    }

    #[test]
    fn test_slide_projection() {
        let mut news = news(3);
        news.body = r#"<p>Fresh <b>milk</b></p><img src="/media/a.jpg">
<script>x()</script>"#.to_string();
        let slide = slide_from_news(&news, &options());

        assert_eq!(slide.id, 3);
        assert_eq!(slide.title, "News 3");
        assert_eq!(slide.excerpt, "Fresh milk x()");
        assert_eq!(slide.date_text, "2025 оны 5-р сарын 6");
        assert_eq!(slide.date_time.as_deref(), Some("2025-05-06T08:00:00Z"));
        assert_eq!(slide.image, "http://localhost:8000/media/covers/3.jpg");
        assert_eq!(slide.href.as_deref(), Some("/news/news-3"));
        assert_eq!(slide.tag.as_deref(), Some("Мэдээ"));

        let body = slide.modal.unwrap().body;
        assert!(body.as_str().contains(r#"src="http://localhost:8000/media/a.jpg""#));
        assert!(!body.as_str().contains("script"));
    }

    #[test]
    fn test_missing_cover_uses_placeholder() {
        let mut news = news(1);
        news.cover = None;
        news.published_at = None;
        let slide = slide_from_news(&news, &options());
        assert_eq!(slide.image, "/news/placeholder.jpg");
        assert_eq!(slide.date_text, "");
        assert_eq!(slide.modal.unwrap().image.as_deref(), Some("/news/placeholder.jpg"));
    }

    #[test]
    fn test_absolute_cover_kept() {
        let mut news = news(1);
        news.cover = Some("https://cdn.example.com/c.png".to_string());
        assert_eq!(slide_from_news(&news, &options()).image, "https://cdn.example.com/c.png");
    }

    #[test]
    fn test_blank_tag_dropped() {
        let settings = Settings {
            slide_tag: Some("  ".to_string()),
            ..Settings::default()
        };
        let slide = slide_from_news(&news(1), &SlideOptions::from_settings(&settings));
        assert!(slide.tag.is_none());
    }

    #[test]
    fn test_fallback_payload_is_never_blank() {
        let not_found = fallback_payload(&FetchError::NotFound { id: 9 });
        assert_eq!(not_found.title, "Мэдээ олдсонгүй");
        assert!(not_found.body.as_str().starts_with("<p>"));

        let failed = fallback_payload(&FetchError::Status { status: 500 });
        assert_eq!(failed.title, "Мэдээг ачаалж чадсангүй");
        assert!(!failed.body.is_empty());
    }
}
