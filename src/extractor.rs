//! Article text extraction: reader-mode heuristic first, generative model second.
//!
//! 1. **Heuristic**: Readability (via `dom_smoothie`) strips navigation, ads,
//!    scripts and other boilerplate, anchored to the resolved URL.
//! 2. **Generative fallback**: only when the heuristic yields under
//!    `MIN_CONTENT_CHARS`, a generator is configured, and the raw HTML is long
//!    enough to be worth a model call.
//!
//! Whichever tier wins, the text goes through the same length gate: too short
//! becomes `""`, too long is cut to `MAX_CONTENT_CHARS` plus [`ELLIPSIS`].

use dom_smoothie::{Config, Readability};
use tracing::{debug, instrument, warn};

use crate::api::TextGenerator;
use crate::config::{ELLIPSIS, MAX_CONTENT_CHARS, MIN_CONTENT_CHARS, ScraperConfig};

/// Reply the model is told to send when the page has no article.
pub const NO_CONTENT_SENTINEL: &str = "NO_CONTENT";

const EXTRACTION_INSTRUCTIONS: &str = "Extract only the body text of the news article from the HTML below.
Leave out ads, menus, footers, related-article lists and any other page furniture; return the article text only, as plain text.
If there is no article body, return \"NO_CONTENT\".

HTML:
";

/// Extracts readable article text from raw HTML.
#[derive(Debug)]
pub struct ContentExtractor<'a, G> {
    generator: Option<&'a G>,
    config: &'a ScraperConfig,
}

impl<'a, G: TextGenerator> ContentExtractor<'a, G> {
    /// `generator` is `None` when no generative backend is configured; the
    /// fallback tier is then skipped.
    pub fn new(generator: Option<&'a G>, config: &'a ScraperConfig) -> Self {
        Self { generator, config }
    }

    /// Article text for `html`, or `""` when neither tier produced enough.
    ///
    /// The result is always either empty or between `MIN_CONTENT_CHARS` and
    /// `MAX_CONTENT_CHARS` chars plus the ellipsis.
    #[instrument(level = "debug", skip_all, fields(url = %resolved_url))]
    pub async fn extract(&self, html: &str, resolved_url: &str) -> String {
        let mut content = readability_text(html, resolved_url);

        if char_len(&content) < MIN_CONTENT_CHARS {
            debug!(
                heuristic_chars = char_len(&content),
                "Readability insufficient; trying generative fallback"
            );
            if let Some(text) = self.generative_text(html).await {
                debug!(chars = char_len(&text), "Generative fallback extracted content");
                content = text;
            }
        }

        let finalized = finalize_content(&content);
        if finalized.is_empty() {
            warn!(url = %resolved_url, stage = "length-gate", "Content extraction failed");
        }
        finalized
    }

    /// Ask the generator for the article body, if the fallback is allowed.
    async fn generative_text(&self, html: &str) -> Option<String> {
        let Some(generator) = self.generator else {
            debug!("Generative fallback skipped: no generator configured");
            return None;
        };

        let html_chars = char_len(html);
        if html_chars < self.config.fallback_min_html_chars {
            debug!(html_chars, "Generative fallback skipped: HTML too short");
            return None;
        }

        let prompt = build_prompt(html, self.config.fallback_html_window);
        match generator.generate(&prompt).await {
            Ok(reply) => {
                let text = reply.trim();
                if text == NO_CONTENT_SENTINEL || char_len(text) < MIN_CONTENT_CHARS {
                    warn!(stage = "generative", "Model returned no or insufficient content");
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Err(e) => {
                warn!(stage = "generative", error = %e, "Generative extraction failed");
                None
            }
        }
    }
}

/// Readability's plain text for `html`, trimmed; empty if it found nothing.
fn readability_text(html: &str, url: &str) -> String {
    // An unusable base URL should not cost us the article.
    let reader = Readability::new(html, Some(url), Some(reader_config()))
        .or_else(|_| Readability::new(html, None, Some(reader_config())));
    let mut reader = match reader {
        Ok(reader) => reader,
        Err(e) => {
            debug!(error = ?e, stage = "heuristic", "Readability could not load document");
            return String::new();
        }
    };

    match reader.parse() {
        Ok(article) => {
            let text: String = article.text_content.into();
            text.trim().to_string()
        }
        Err(e) => {
            debug!(error = ?e, stage = "heuristic", "Readability found no article");
            String::new()
        }
    }
}

fn reader_config() -> Config {
    Config {
        max_elements_to_parse: 9000,
        ..Default::default()
    }
}

/// Instruction prompt followed by at most `window` chars of `html`.
fn build_prompt(html: &str, window: usize) -> String {
    let mut prompt = String::from(EXTRACTION_INSTRUCTIONS);
    prompt.extend(html.chars().take(window));
    prompt
}

/// Apply the output length gate.
///
/// Under `MIN_CONTENT_CHARS` yields `""`; over `MAX_CONTENT_CHARS` keeps the
/// first `MAX_CONTENT_CHARS` chars and appends [`ELLIPSIS`].
pub fn finalize_content(content: &str) -> String {
    let len = char_len(content);
    if len < MIN_CONTENT_CHARS {
        return String::new();
    }
    if len > MAX_CONTENT_CHARS {
        let mut truncated: String = content.chars().take(MAX_CONTENT_CHARS).collect();
        truncated.push_str(ELLIPSIS);
        return truncated;
    }
    content.to_string()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
