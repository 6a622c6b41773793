//! # Awful News Scraper
//!
//! Reads candidate articles from an aggregator RSS feed (or a JSON file),
//! resolves each redirect link to the publisher URL, extracts the article
//! text, and writes the successful subset as JSON.
//!
//! ## Usage
//!
//! ```sh
//! awful_news_scraper --feed-url "https://news.google.com/rss?hl=ko&gl=KR&ceid=KR:ko" -j ./json
//! ```

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use awful_news_scraper::api::{AwfulJadeGenerator, GeminiGenerator, Generator, RetryGenerate};
use awful_news_scraper::config::ScraperConfig;
use awful_news_scraper::feed::fetch_feed;
use awful_news_scraper::http::ReqwestClient;
use awful_news_scraper::models::CandidateItem;
use awful_news_scraper::outputs::json;
use awful_news_scraper::scraper::BatchScraper;
use awful_news_scraper::utils::ensure_writable_dir;

mod cli;

use cli::Cli;

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
    info!("awful_news_scraper starting up");

    let args = Cli::parse();
    debug!(?args.feed_url, ?args.input, %args.json_output_dir, "Parsed CLI arguments");

    // Early check: ensure JSON output dir is writable
    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let config = ScraperConfig::default().with_delay(Duration::from_millis(args.delay_ms));
    let http = ReqwestClient::new()?;

    // ---- Candidates ----
    let mut items = load_candidates(&args, &http).await?;
    if let Some(limit) = args.limit {
        items.truncate(limit);
    }
    info!(count = items.len(), "Loaded candidate items");

    // ---- Generative fallback ----
    let generator = build_generator(&args).await;
    if generator.is_none() {
        warn!("No generative backend configured - AI fallback disabled");
    }

    // ---- Scrape ----
    let scraper = BatchScraper::new(&http, generator.as_ref(), &config);
    let scraped = scraper.scrape_all(&items).await;

    // ---- Output ----
    match json::write_scraped(&scraped, &args.json_output_dir).await {
        Ok(path) => info!(path = %path.display(), "Wrote output"),
        Err(e) => {
            error!(error = %e, "Failed to write JSON output");
            return Err(e);
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        scraped = scraped.len(),
        dropped = items.len() - scraped.len(),
        "Execution complete"
    );

    Ok(())
}

/// Candidates from `--feed-url` or `--input`, whichever was given.
async fn load_candidates(args: &Cli, http: &ReqwestClient) -> Result<Vec<CandidateItem>, Box<dyn Error>> {
    if let Some(feed_url) = &args.feed_url {
        return fetch_feed(http, feed_url, &args.category).await;
    }

    let path = args.input.as_deref().ok_or("either --feed-url or --input is required")?;
    let raw = tokio::fs::read_to_string(path).await?;
    let items: Vec<CandidateItem> = serde_json::from_str(&raw)?;
    Ok(items)
}

/// Gemini when a key is present, else awful_aj when a config is given.
///
/// A backend that fails to initialize disables the fallback rather than the run.
async fn build_generator(args: &Cli) -> Option<RetryGenerate<Generator>> {
    let backend = if let Some(key) = args.gemini_api_key.as_deref().filter(|k| !k.is_empty()) {
        let client = reqwest::Client::new();
        Generator::Gemini(GeminiGenerator::new(
            client,
            key.to_string(),
            args.gemini_model.clone(),
        ))
    } else if let Some(config_path) = &args.config {
        match AwfulJadeGenerator::load(config_path, &args.template).await {
            Ok(g) => Generator::AwfulJade(g),
            Err(e) => {
                warn!(%config_path, error = %e, "Failed to load awful_aj backend");
                return None;
            }
        }
    } else {
        return None;
    };

    Some(RetryGenerate::new(backend, args.llm_retries, Duration::from_secs(1)))
}
