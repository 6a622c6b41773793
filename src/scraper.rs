//! Batch scraping: resolve, fetch and extract every candidate in order.
//!
//! Items are processed one at a time with a fixed pause after each, to stay
//! under the anti-automation radar of publisher sites. A failure at any stage
//! drops that item only; [`BatchScraper::scrape_all`] itself never fails.

use futures::stream::{self, StreamExt};
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::api::TextGenerator;
use crate::config::ScraperConfig;
use crate::extractor::ContentExtractor;
use crate::http::{BROWSER_HEADERS, HttpClient};
use crate::models::{CandidateItem, ScrapedItem};
use crate::resolver::UrlResolver;

/// Sequential resolve → fetch → extract pipeline over a list of candidates.
#[derive(Debug)]
pub struct BatchScraper<'a, H, G> {
    http: &'a H,
    resolver: UrlResolver<'a, H>,
    extractor: ContentExtractor<'a, G>,
    config: &'a ScraperConfig,
}

impl<'a, H, G> BatchScraper<'a, H, G>
where
    H: HttpClient,
    G: TextGenerator,
{
    pub fn new(http: &'a H, generator: Option<&'a G>, config: &'a ScraperConfig) -> Self {
        Self {
            http,
            resolver: UrlResolver::new(http, config),
            extractor: ContentExtractor::new(generator, config),
            config,
        }
    }

    /// Scrape every item in input order, keeping only those with usable content.
    #[instrument(level = "info", skip_all, fields(count = items.len()))]
    pub async fn scrape_all(&self, items: &[CandidateItem]) -> Vec<ScrapedItem> {
        let t0 = Instant::now();
        info!(count = items.len(), "Scraping articles");

        let results: Vec<ScrapedItem> = stream::iter(items.iter().enumerate())
            .then(|(index, item)| async move {
                let content = self.scrape_article(&item.link).await;
                let scraped = ScrapedItem::new(item.clone(), content);
                if scraped.is_none() {
                    warn!(index, title = %item.title, link = %item.link, "Dropping article without content");
                }

                sleep(self.config.inter_item_delay).await;
                scraped
            })
            .filter_map(|opt| std::future::ready(opt))
            .collect()
            .await;

        info!(
            scraped = results.len(),
            total = items.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Scraped articles"
        );
        results
    }

    /// Article text behind `link`, or `""` if any stage failed.
    #[instrument(level = "info", skip_all, fields(%link))]
    pub async fn scrape_article(&self, link: &str) -> String {
        let resolved = self.resolver.resolve(link).await;
        debug!(%resolved, "Scraping");

        let html = match self
            .http
            .get_text(&resolved, BROWSER_HEADERS, self.config.article_timeout)
            .await
        {
            Ok(html) => html,
            Err(e) => {
                warn!(url = %resolved, stage = "fetch", error = %e, "Failed to fetch article");
                return String::new();
            }
        };

        self.extractor.extract(&html, &resolved).await
    }
}
