//! # Awful News Scraper
//!
//! Resolves news-aggregator redirect links to the publisher's real URL and
//! extracts clean, length-bounded article text for downstream summarization.
//!
//! ## Architecture
//!
//! ```text
//! BatchScraper ─► UrlResolver ─► legacy decode | signed exchange | pass-through
//!              ─► HTTP fetch
//!              ─► ContentExtractor ─► Readability | generative fallback
//!              ─► Vec<ScrapedItem>
//! ```
//!
//! Network access goes through [`http::HttpClient`] and model access through
//! [`api::TextGenerator`], so every stage can be driven offline.

pub mod api;
pub mod config;
pub mod extractor;
pub mod feed;
pub mod http;
pub mod models;
pub mod outputs;
pub mod resolver;
pub mod scraper;
pub mod utils;

pub use extractor::ContentExtractor;
pub use models::{CandidateItem, ScrapedItem, SigningParams};
pub use resolver::UrlResolver;
pub use scraper::BatchScraper;
