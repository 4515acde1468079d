//! # Dairy News
//!
//! Command-line driver for the news pipeline: fetches the feed (or one item)
//! from the backend, prepares it for display and emits JSON.
//!
//! ## Usage
//!
//! ```sh
//! dairy_news --api-url https://admin.dairyboard.mn/api -j ./json --pages 2
//! dairy_news --id 42
//! ```
//!
//! ## Modes
//!
//! 1. **Feed**: load up to `--pages` pages through the infinite feed,
//!    project the items into carousel slides, then print them or write
//!    `{json_output_dir}/{date}/news.json`
//! 2. **Detail** (`--id`): fetch one item and print its dialog payload with
//!    the body sanitized

use chrono::Local;
use clap::Parser;
use dairy_news::cli::Cli;
use dairy_news::config::Settings;
use dairy_news::http::{HttpClient, ReqwestTransport};
use dairy_news::models::ListKey;
use dairy_news::outputs::json::{write_feed, FeedDocument};
use dairy_news::repository::NewsRepository;
use dairy_news::slides::{modal_payload, slides_from_news, SlideOptions};
use dairy_news::store::{InfiniteQuery, NewsStore};
use dairy_news::utils::ensure_writable_dir;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("dairy_news starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = Settings::load(args.config.as_deref(), args.api_url.as_deref()).await?;
    let client = HttpClient::new(ReqwestTransport::new()?, settings.api_base_url.clone());
    let store = NewsStore::new(NewsRepository::new(client), &settings);
    let options = SlideOptions::from_settings(&settings);

    if let Some(id) = args.id {
        return show_detail(&store, id, &options).await;
    }

    // Early check: ensure JSON output dir is writable
    if let Some(dir) = args.json_output_dir.as_deref() {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let key = ListKey {
        search: args.search.clone().filter(|s| !s.trim().is_empty()),
        ordering: Some(args.ordering.clone()),
        page_size: Some(args.page_size.unwrap_or(settings.page_size)),
    };
    let feed = InfiniteQuery::new(store.clone(), key);

    let mut state = feed.load().await;
    while state.error.is_none() && state.has_next_page && state.pages_loaded < args.pages as usize {
        let loaded = state.pages_loaded;
        state = feed.fetch_next_page().await;
        if state.pages_loaded == loaded {
            break;
        }
    }

    if let Some(err) = &state.error {
        if state.items.is_empty() {
            error!(error = %err, "Feed could not be loaded");
            return Err(err.clone().into());
        }
        warn!(error = %err, loaded = state.items.len(), "Feed partially loaded; keeping what arrived");
    }

    let slides = slides_from_news(&state.items, &options);
    info!(
        slides = slides.len(),
        pages = state.pages_loaded,
        total = ?state.total_count,
        has_next_page = state.has_next_page,
        "Prepared carousel slides"
    );
    let document = FeedDocument::new(slides, state.total_count, Local::now());

    match args.json_output_dir.as_deref() {
        Some(dir) => {
            write_feed(&document, dir).await?;
        }
        None => println!("{}", serde_json::to_string_pretty(&document)?),
    }

    let elapsed = start_time.elapsed();
    info!(elapsed_ms = elapsed.as_millis() as u64, "dairy_news finished");

    Ok(())
}

#[instrument(level = "info", skip(store, options))]
async fn show_detail(
    store: &NewsStore<ReqwestTransport>,
    id: u64,
    options: &SlideOptions,
) -> Result<(), Box<dyn Error>> {
    match store.detail(id).await {
        Ok(item) => {
            let payload = modal_payload(&item, options);
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            error!(id, "News item not found");
            Err(e.into())
        }
        Err(e) => {
            error!(id, error = %e, "Failed to fetch news item");
            Err(e.into())
        }
    }
}
