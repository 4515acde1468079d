//! Command-line interface definitions for Dairy News.
//!
//! Every option can also be supplied through an environment variable.

use clap::Parser;

/// Command-line arguments for the `dairy_news` binary.
///
/// # Examples
///
/// ```sh
/// # Print the first two pages of the feed as carousel slides
/// dairy_news --api-url https://admin.dairyboard.mn/api --pages 2
///
/// # Write today's feed to ./json/2025-05-06/news.json
/// dairy_news -j ./json
///
/// # Show one item as it would appear in the dialog
/// dairy_news --id 42
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Backend API base URL; overrides the config file
    #[arg(long, env = "NEWS_API_URL")]
    pub api_url: Option<String>,

    /// Optional path to config.yaml file
    #[arg(short, long, env = "NEWS_CONFIG")]
    pub config: Option<String>,

    /// Full-text search term
    #[arg(short, long)]
    pub search: Option<String>,

    /// Ordering expression passed to the list endpoint
    #[arg(long, default_value = "-published_at")]
    pub ordering: String,

    /// Number of feed pages to load
    #[arg(short, long, default_value_t = 1)]
    pub pages: u32,

    /// Items per page; defaults to the configured page size
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Fetch a single item and print its dialog payload
    #[arg(long)]
    pub id: Option<u64>,

    /// Output directory for the JSON feed file; prints to stdout when absent
    #[arg(short, long, env = "NEWS_JSON_OUTPUT_DIR")]
    pub json_output_dir: Option<String>,
}
