//! Normalization of list responses into one canonical [`Page`].
//!
//! The list endpoint answers either with a bare JSON array (unpaginated
//! deployments) or with a `{count, next, previous, results}` envelope.
//! [`normalize`] turns any JSON value into a [`Page`] and never fails; odd
//! shapes degrade to an empty page so callers can render an empty state.

use crate::models::{NewsItem, Page};
use crate::utils::truncate_for_log;
use serde_json::Value;
use tracing::warn;

/// Shapes the list endpoint is known to produce.
enum ListShape {
    Bare(Vec<Value>),
    Envelope(serde_json::Map<String, Value>),
    Unknown,
}

impl ListShape {
    fn classify(value: Value) -> Self {
        match value {
            Value::Array(items) => ListShape::Bare(items),
            Value::Object(map) if map.contains_key("results") => ListShape::Envelope(map),
            _ => ListShape::Unknown,
        }
    }
}

/// Convert an arbitrary list response into a canonical page. Total.
pub fn normalize(value: Value) -> Page<Value> {
    match ListShape::classify(value) {
        ListShape::Bare(results) => Page {
            count: results.len() as u64,
            next: None,
            previous: None,
            results,
        },
        ListShape::Envelope(mut map) => {
            let results = match map.remove("results") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            let count = map
                .get("count")
                .and_then(Value::as_u64)
                .unwrap_or(results.len() as u64);
            Page {
                count,
                next: string_or_none(map.get("next")),
                previous: string_or_none(map.get("previous")),
                results,
            }
        }
        ListShape::Unknown => Page::empty(),
    }
}

fn string_or_none(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Decode the loose results of a normalized page into [`NewsItem`]s.
///
/// Entries that do not look like a news item are dropped with a warning;
/// the server-reported `count` and continuation tokens are kept as-is.
pub fn into_news_page(page: Page<Value>) -> Page<NewsItem> {
    let results = page
        .results
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<NewsItem>(raw.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(
                    error = %e,
                    entry = %truncate_for_log(&raw.to_string(), 200),
                    "Skipping malformed news entry"
                );
                None
            }
        })
        .collect();

    Page {
        count: page.count,
        next: page.next,
        previous: page.previous,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_array_is_single_final_page() {
        let page = normalize(json!([{"a": 1}, {"b": 2}, {"c": 3}]));
        assert_eq!(page.count, 3);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
        assert_eq!(page.results, vec![json!({"a": 1}), json!({"b": 2}), json!({"c": 3})]);
    }

    #[test]
    fn test_envelope_fields_preserved() {
        let page = normalize(json!({
            "results": [{"a": 1}],
            "count": 5,
            "next": "http://x/?page=2",
            "previous": null
        }));
        assert_eq!(page.count, 5);
        assert_eq!(page.next.as_deref(), Some("http://x/?page=2"));
        assert_eq!(page.previous, None);
        assert_eq!(page.results, vec![json!({"a": 1})]);
    }

    #[test]
    fn test_envelope_defaults() {
        let page = normalize(json!({
            "results": [{"a": 1}, {"b": 2}],
            "count": "many",
            "next": 17,
            "previous": ["x"]
        }));
        assert_eq!(page.count, 2);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);

        let page = normalize(json!({"results": "nope", "count": 9}));
        assert!(page.results.is_empty());
        assert_eq!(page.count, 9);
    }

    #[test]
    fn test_unknown_shapes_become_empty() {
        for input in [
            json!(null),
            json!("text"),
            json!(42),
            json!(true),
            json!({}),
            json!({"items": [1, 2]}),
        ] {
            let page = normalize(input.clone());
            assert_eq!(page, Page::empty(), "input: {input}");
        }
    }

    #[test]
    fn test_into_news_page_skips_malformed() {
        let page = normalize(json!({
            "count": 3,
            "next": null,
            "previous": null,
            "results": [
                {"id": 1, "title": "One", "slug": "one", "body": ""},
                {"title": "missing id"},
                {"id": 3, "title": "Three", "slug": "three", "body": ""}
            ]
        }));
        let typed = into_news_page(page);
        assert_eq!(typed.count, 3);
        let slugs: Vec<&str> = typed.results.iter().map(|n| n.slug.as_str()).collect();
        assert_eq!(slugs, vec!["one", "three"]);
    }
}
