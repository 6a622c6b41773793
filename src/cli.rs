//! Command-line interface definitions.
//!
//! All arguments can be provided via command-line flags or environment variables.

use clap::{ArgGroup, CommandFactory, Parser};

/// Command-line arguments for the scraper.
///
/// # Examples
///
/// ```sh
/// # Scrape a Google News feed, no generative fallback
/// awful_news_scraper --feed-url "https://news.google.com/rss?hl=ko&gl=KR&ceid=KR:ko" -j ./json
///
/// # Scrape a prepared list of items, with Gemini as fallback
/// GEMINI_API_KEY=... awful_news_scraper --input items.json -j ./json
///
/// # Use an OpenAI-compatible server configured for awful_aj
/// awful_news_scraper --input items.json -j ./json -c ~/.config/aj/config.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(group(ArgGroup::new("candidates").required(true).args(["feed_url", "input"])))]
pub struct Cli {
    /// RSS feed to read candidate items from
    #[arg(long, env = "FEED_URL")]
    pub feed_url: Option<String>,

    /// JSON file holding an array of candidate items
    #[arg(short, long, env = "SCRAPER_INPUT")]
    pub input: Option<String>,

    /// Category label applied to items read from the feed
    #[arg(long, env = "SCRAPER_CATEGORY", default_value = "general")]
    pub category: String,

    /// Process at most this many candidates
    #[arg(long, env = "SCRAPER_LIMIT")]
    pub limit: Option<usize>,

    /// Output directory for the JSON file
    #[arg(short, long, env = "JSON_OUTPUT_DIR")]
    pub json_output_dir: String,

    /// Gemini API key; enables the Gemini generative fallback
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model used for the generative fallback
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.0-flash-lite")]
    pub gemini_model: String,

    /// Optional path to an awful_aj config.yaml (OpenAI-compatible fallback)
    #[arg(short, long, env = "AJ_CONFIG")]
    pub config: Option<String>,

    /// awful_aj template used with --config
    #[arg(long, env = "AJ_TEMPLATE", default_value = "article_extractor")]
    pub template: String,

    /// Retries for a failed generative call; timeouts are never retried
    #[arg(long, env = "LLM_RETRIES", default_value_t = 2)]
    pub llm_retries: usize,

    /// Pause between articles, in milliseconds
    #[arg(long, env = "SCRAPER_DELAY_MS", default_value_t = 500)]
    pub delay_ms: u64,
}
