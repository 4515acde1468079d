//! Data models for news records and their derived, render-ready projections.
//!
//! - [`NewsItem`]: one record as served by the backend
//! - [`Page`]: one canonical list result, whatever shape the server sent
//! - [`ListParams`] / [`ListKey`]: query parameters and the cache key they map to
//! - [`ModalPayload`] / [`CarouselSlide`]: read-only projections consumed by
//!   the carousel and dialog
//!
//! Wire names are snake_case (`is_published`, `published_at`), matching the
//! backend's serializer.

use crate::content::SafeHtml;
use serde::{Deserialize, Serialize};

/// A single news record.
///
/// `body` is rich text written in an external editor and must be treated as
/// untrusted. Render it only through [`crate::content::prepare_body`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewsItem {
    pub id: u64,
    pub title: String,
    /// Stable key for de-duplication, modal addressing and list keys.
    pub slug: String,
    #[serde(default)]
    pub body: String,
    /// Absolute URL, or a path relative to the backend origin.
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub author: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One list result in canonical form.
///
/// `next` and `previous` are opaque continuation URLs carrying a `page`
/// query parameter, or `None` at either end.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Page {
            count: 0,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }
}

/// Query parameters for the list endpoint. Absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl ListParams {
    /// Query pairs in a stable order, skipping anything unset or blank.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(ordering) = self.ordering.as_deref().filter(|s| !s.is_empty()) {
            query.push(("ordering", ordering.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            query.push(("search", search.to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            query.push(("page_size", page_size.to_string()));
        }
        query
    }
}

/// Identity of one logical feed: everything in [`ListParams`] except `page`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListKey {
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page_size: Option<u32>,
}

impl ListKey {
    pub fn params_for_page(&self, page: u32) -> ListParams {
        ListParams {
            page: Some(page),
            page_size: self.page_size,
            search: self.search.clone(),
            ordering: self.ordering.clone(),
        }
    }
}

/// Content shown in the news dialog. The body is already sanitized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalPayload {
    pub title: String,
    pub date_text: String,
    pub date_time: Option<String>,
    pub image: Option<String>,
    pub body: SafeHtml,
}

/// A read-only projection of a news item for the carousel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarouselSlide {
    pub id: u64,
    pub title: String,
    pub excerpt: String,
    pub date_text: String,
    pub date_time: Option<String>,
    pub image: String,
    pub href: Option<String>,
    pub tag: Option<String>,
    pub modal: Option<ModalPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_item_deserialization() {
        let json = r#"{
            "id": 7,
            "title": "Milk prices",
            "slug": "milk-prices",
            "body": "<p>Up again</p>",
            "cover": "/media/covers/a.jpg",
            "is_published": true,
            "published_at": null,
            "author": null,
            "created_at": "2025-05-06T08:00:00Z",
            "updated_at": "2025-05-06T08:00:00Z"
        }"#;

        let item: NewsItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, 7);
        assert_eq!(item.slug, "milk-prices");
        assert_eq!(item.cover.as_deref(), Some("/media/covers/a.jpg"));
        assert!(item.is_published);
        assert!(item.published_at.is_none());
    }

    #[test]
    fn test_news_item_minimal_fields() {
        let json = r#"{"id": 1, "title": "T", "slug": "t"}"#;
        let item: NewsItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.body, "");
        assert!(item.cover.is_none());
        assert!(!item.is_published);
    }

    #[test]
    fn test_list_params_omit_absent() {
        let params = ListParams::default();
        assert!(params.to_query().is_empty());

        let params = ListParams {
            page: Some(2),
            page_size: None,
            search: Some(String::new()),
            ordering: Some("-published_at".to_string()),
        };
        assert_eq!(
            params.to_query(),
            vec![
                ("ordering", "-published_at".to_string()),
                ("page", "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_list_key_params_for_page() {
        let key = ListKey {
            search: Some("cheese".to_string()),
            ordering: None,
            page_size: Some(5),
        };
        let params = key.params_for_page(3);
        assert_eq!(params.page, Some(3));
        assert_eq!(params.page_size, Some(5));
        assert_eq!(params.search.as_deref(), Some("cheese"));
    }
}
