//! Runtime configuration for the scraping pipeline.
//!
//! Protocol constants live here as `const`s; everything an operator may want
//! to tune is collected in [`ScraperConfig`], whose `Default` matches the
//! production behaviour.

use std::time::Duration;

/// Shortest article text worth emitting.
pub const MIN_CONTENT_CHARS: usize = 100;
/// Article text is truncated to this many chars before the marker is appended.
pub const MAX_CONTENT_CHARS: usize = 3000;
/// Appended to truncated article text.
pub const ELLIPSIS: &str = "…";

/// Host serving the aggregator's redirect links and article pages.
pub const AGGREGATOR_HOST: &str = "news.google.com";
/// The aggregator's static asset host; never a publisher.
pub const STATIC_ASSET_HOST: &str = "gstatic.com";

/// Short UA accepted by the aggregator's article page.
pub const AGGREGATOR_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
/// Full desktop Chrome UA used for publisher fetches.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const BROWSER_ACCEPT_LANGUAGE: &str = "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7";

/// Tunables for one pipeline run.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Scheme and host of the aggregator, e.g. `https://news.google.com`.
    pub aggregator_base: String,
    /// Timeout for fetching the per-article signing parameters.
    pub signing_timeout: Duration,
    /// Timeout for the batch-execute exchange.
    pub exchange_timeout: Duration,
    /// Timeout for fetching the publisher's article page.
    pub article_timeout: Duration,
    /// Pause after every item, successful or not.
    pub inter_item_delay: Duration,
    /// Raw HTML shorter than this never reaches the generative fallback.
    pub fallback_min_html_chars: usize,
    /// How much raw HTML the generative fallback is shown.
    pub fallback_html_window: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            aggregator_base: format!("https://{AGGREGATOR_HOST}"),
            signing_timeout: Duration::from_secs(10),
            exchange_timeout: Duration::from_secs(15),
            article_timeout: Duration::from_secs(15),
            inter_item_delay: Duration::from_millis(500),
            fallback_min_html_chars: 500,
            fallback_html_window: 15_000,
        }
    }
}

impl ScraperConfig {
    /// Same configuration with a different inter-item pause.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.inter_item_delay = delay;
        self
    }
}
