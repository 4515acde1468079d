//! Thin, configured HTTP layer over the news backend.
//!
//! The network is reached through the [`Transport`] trait so the rest of the
//! pipeline never depends on a concrete client:
//! - [`Transport`]: send a GET and hand back status plus body text
//! - [`ReqwestTransport`]: production implementation (cookies kept, JSON accepted)
//! - [`HttpClient`]: joins paths onto the base URL, maps statuses, parses JSON

use crate::error::{FetchError, Result};
use crate::utils::truncate_for_log;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Raw response as seen by the client: status code and undecoded body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Anything that can perform a GET request against an absolute URL.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// `reqwest`-backed transport.
///
/// Cookies are persisted across requests (the backend relies on session
/// cookies) and every request declares `Accept: application/json`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, query: &[(&'static str, String)]) -> Result<RawResponse> {
        let resp = self.client.get(url).query(query).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(RawResponse { status, body })
    }
}

/// Base-URL-aware JSON client over a [`Transport`].
pub struct HttpClient<T> {
    transport: T,
    base_url: String,
}

impl<T> fmt::Debug for HttpClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl<T: Transport> HttpClient<T> {
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `path` is joined onto the base URL, e.g. `/news/` -> `{base}/news/`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` and parse the body as JSON.
    ///
    /// A 404 becomes [`FetchError::NotFound`] only when the caller supplies
    /// the id being looked up; otherwise it is a plain status error.
    #[instrument(level = "info", skip_all, fields(path = %path))]
    pub async fn get_json(
        &self,
        path: &str,
        query: &[(&'static str, String)],
        not_found_id: Option<u64>,
    ) -> Result<Value> {
        let url = self.url_for(path);
        let t0 = Instant::now();
        let resp = match self.transport.get(&url, query).await {
            Ok(resp) => resp,
            Err(e) => {
                error!(%url, elapsed_ms = t0.elapsed().as_millis() as u64, error = %e, "Request failed");
                return Err(e);
            }
        };

        match (resp.status, not_found_id) {
            (200..=299, _) => {}
            (404, Some(id)) => {
                debug!(%url, id, "Backend reported not found");
                return Err(FetchError::NotFound { id });
            }
            (status, _) => {
                error!(%url, status, body = %truncate_for_log(&resp.body, 200), "Unexpected status");
                return Err(FetchError::Status { status });
            }
        }

        let value = serde_json::from_str::<Value>(&resp.body).map_err(|e| {
            error!(%url, error = %e, body = %truncate_for_log(&resp.body, 200), "Response is not JSON");
            FetchError::from(e)
        })?;
        info!(
            %url,
            status = resp.status,
            bytes = resp.body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Request completed"
        );
        Ok(value)
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeTransport;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_for_joins_cleanly() {
        let client = HttpClient::new(FakeTransport::new(|_| FakeTransport::json(200, json!([]))), "http://localhost:8000/api/");
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(client.url_for("/news/"), "http://localhost:8000/api/news/");
        assert_eq!(client.url_for("news/3/"), "http://localhost:8000/api/news/3/");
    }

    #[tokio::test]
    async fn test_get_json_ok() {
        let transport = FakeTransport::new(|_| FakeTransport::json(200, json!({"ok": true})));
        let client = HttpClient::new(transport.clone(), "http://api");
        let value = client
            .get_json("/news/", &[("page", "1".to_string())], None)
            .await
            .unwrap();
        assert_eq!(value, json!({"ok": true}));
        let calls = transport.calls();
        assert_eq!(calls[0].url, "http://api/news/");
        assert_eq!(calls[0].param("page"), Some("1"));
    }

    #[tokio::test]
    async fn test_get_json_status_mapping() {
        let transport = FakeTransport::new(|_| FakeTransport::json(404, json!({"detail": "Not found."})));
        let client = HttpClient::new(transport, "http://api");
        let err = client.get_json("/news/9/", &[], Some(9)).await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound { id: 9 }));

        let err = client.get_json("/news/", &[], None).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404 }));

        let transport = FakeTransport::new(|_| FakeTransport::json(503, json!({})));
        let client = HttpClient::new(transport, "http://api");
        let err = client.get_json("/news/", &[], None).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn test_get_json_decode_error() {
        let transport = FakeTransport::new(|_| {
            Ok(RawResponse {
                status: 200,
                body: "<html>gateway</html>".to_string(),
            })
        });
        let client = HttpClient::new(transport, "http://api");
        let err = client.get_json("/news/", &[], None).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_network_error_propagates() {
        let transport = FakeTransport::new(|_| {
            Err(FetchError::network(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))
        });
        let client = HttpClient::new(transport, "http://api");
        let err = client.get_json("/news/", &[], None).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
