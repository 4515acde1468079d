//! Typed access to the backend's news endpoints.
//!
//! - `GET {base}/news/?ordering=..&search=..&page=..&page_size=..` -> [`Page<NewsItem>`]
//! - `GET {base}/news/{id}/` -> [`NewsItem`]
//!
//! Errors propagate unchanged; the repository never retries.

use crate::error::Result;
use crate::http::{HttpClient, Transport};
use crate::models::{ListParams, NewsItem, Page};
use crate::normalize::{into_news_page, normalize};
use tracing::{debug, info, instrument};

#[derive(Debug)]
pub struct NewsRepository<T> {
    client: HttpClient<T>,
}

impl<T: Transport> NewsRepository<T> {
    pub fn new(client: HttpClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &HttpClient<T> {
        &self.client
    }

    /// Fetch one page of the list endpoint and normalize whatever came back.
    #[instrument(level = "info", skip_all, fields(page = ?params.page, search = ?params.search, ordering = ?params.ordering))]
    pub async fn list(&self, params: &ListParams) -> Result<Page<NewsItem>> {
        let query = params.to_query();
        let raw = self.client.get_json("/news/", &query, None).await?;
        let page = into_news_page(normalize(raw));
        info!(
            count = page.count,
            returned = page.results.len(),
            has_next = page.next.is_some(),
            "Listed news"
        );
        Ok(page)
    }

    /// Fetch one item. A 404 surfaces as [`crate::error::FetchError::NotFound`].
    #[instrument(level = "info", skip_all, fields(id = id))]
    pub async fn get_by_id(&self, id: u64) -> Result<NewsItem> {
        let path = format!("/news/{id}/");
        let raw = self.client.get_json(&path, &[], Some(id)).await?;
        let item: NewsItem = serde_json::from_value(raw)?;
        debug!(slug = %item.slug, "Fetched news item");
        Ok(item)
    }
}

#[cfg(test)]
pub(crate) mod testdata {
    use serde_json::{json, Value};

    pub fn item(id: u64) -> Value {
        json!({
            "id": id,
            "title": format!("News {id}"),
            "slug": format!("news-{id}"),
            "body": format!("<p>Body of item {id}</p>"),
            "cover": format!("/media/covers/{id}.jpg"),
            "is_published": true,
            "published_at": "2025-05-06T08:00:00Z",
            "author": null,
            "created_at": "2025-05-06T08:00:00Z",
            "updated_at": "2025-05-06T08:00:00Z"
        })
    }

    pub fn items(ids: std::ops::RangeInclusive<u64>) -> Vec<Value> {
        ids.map(item).collect()
    }
}
