//! # Dairy News
//!
//! Ingestion and safe-rendering pipeline for the dairy council's news feed.
//!
//! ## Pipeline
//!
//! 1. **Transport**: [`http::HttpClient`] issues `GET`s against the backend
//!    and classifies failures into [`error::FetchError`]
//! 2. **Normalization**: [`normalize`] turns bare arrays, paginated envelopes
//!    and anything else into one canonical [`models::Page`]
//! 3. **Repository**: [`repository::NewsRepository`] exposes `list` and
//!    `get_by_id`
//! 4. **Queries**: [`store`] layers caching, request coalescing,
//!    stale-while-revalidate and stale-response discard on top
//! 5. **Content**: [`content`] excerpts, absolutizes and sanitizes bodies;
//!    [`slides`] projects items into carousel slides and dialog payloads
//! 6. **Presentation state**: [`carousel`] and [`dialog`] are the
//!    event-driven state machines the page renders from
//!
//! The `dairy_news` binary drives the same pipeline from the command line.

pub mod cache;
pub mod carousel;
pub mod cli;
pub mod config;
pub mod content;
pub mod dialog;
pub mod error;
pub mod http;
pub mod models;
pub mod normalize;
pub mod outputs;
pub mod repository;
pub mod slides;
pub mod store;
pub mod utils;
