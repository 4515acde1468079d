//! Error taxonomy for talking to the news backend.
//!
//! Everything that can fail on the way from the network to a typed
//! [`crate::models::NewsItem`] ends up as a [`FetchError`]. The error is
//! `Clone` because a single coalesced request may be awaited by several
//! callers, and each of them receives its own copy of the outcome.

use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// The request never produced a response (DNS, connect, TLS, body read).
    #[error("network error: {0}")]
    Network(Arc<dyn std::error::Error + Send + Sync>),

    /// The response body was not valid JSON, or a detail object did not
    /// have the shape of a news item.
    #[error("decode error: {0}")]
    Decode(Arc<serde_json::Error>),

    /// Detail lookup for an id the backend does not know.
    #[error("news item {id} not found")]
    NotFound { id: u64 },

    /// Any other non-success status code.
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },
}

impl FetchError {
    pub fn network<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FetchError::Network(Arc::new(err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::network(err)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_from_serde() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let fetch: FetchError = err.into();
        assert!(matches!(fetch, FetchError::Decode(_)));
        assert!(fetch.to_string().starts_with("decode error"));
    }

    #[test]
    fn test_not_found_is_distinct() {
        let err = FetchError::NotFound { id: 42 };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "news item 42 not found");
        assert!(!FetchError::Status { status: 500 }.is_not_found());
    }

    #[test]
    fn test_clone_shares_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = FetchError::network(io);
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
        assert!(copy.to_string().contains("refused"));
    }
}
