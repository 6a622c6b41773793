//! Data models flowing through the resolution and extraction pipeline.
//!
//! - [`CandidateItem`]: an article link handed to us by the feed source
//! - [`ScrapedItem`]: a candidate plus its extracted, length-bounded text
//! - [`SigningParams`]: the per-article signature/timestamp pair used by the
//!   aggregator's signed redirect scheme
//!
//! Field names serialize as camelCase so the JSON output matches what the
//! downstream summarizer already consumes.

use serde::{Deserialize, Serialize};

use crate::config::{ELLIPSIS, MAX_CONTENT_CHARS, MIN_CONTENT_CHARS};

/// A news item as produced by the feed collaborator.
///
/// The core only reads `link`; the other fields are carried through to the
/// output untouched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateItem {
    /// Headline as published in the feed.
    pub title: String,
    /// Link to the article, usually an aggregator redirect URL.
    pub link: String,
    /// Publisher name.
    pub source: String,
    /// Category label assigned by the caller.
    pub category: String,
    /// Publication time exactly as the feed reported it.
    pub publish_time: String,
}

/// A candidate whose article text was successfully extracted.
///
/// Can only be built through [`ScrapedItem::new`], which rejects content
/// outside the accepted length window. Deserialization goes through the same
/// check, and the fields are read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", try_from = "RawScrapedItem")]
pub struct ScrapedItem {
    #[serde(flatten)]
    item: CandidateItem,
    /// Clean article text, at most `MAX_CONTENT_CHARS` plus the ellipsis marker.
    content: String,
}

/// Unchecked wire shape of [`ScrapedItem`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScrapedItem {
    #[serde(flatten)]
    item: CandidateItem,
    content: String,
}

impl TryFrom<RawScrapedItem> for ScrapedItem {
    type Error = String;

    fn try_from(raw: RawScrapedItem) -> Result<Self, Self::Error> {
        let len = raw.content.chars().count();
        ScrapedItem::new(raw.item, raw.content)
            .ok_or_else(|| format!("content length {len} is outside the accepted range"))
    }
}

impl ScrapedItem {
    /// Pair a candidate with its extracted text.
    ///
    /// Returns `None` when `content` is shorter than the minimum or longer
    /// than a truncated extraction can be.
    pub fn new(item: CandidateItem, content: String) -> Option<Self> {
        if !content_within_bounds(&content) {
            return None;
        }
        Some(Self { item, content })
    }

    /// The candidate this text was extracted for.
    pub fn item(&self) -> &CandidateItem {
        &self.item
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_parts(self) -> (CandidateItem, String) {
        (self.item, self.content)
    }
}

/// `true` when `content` satisfies the output length invariant.
pub fn content_within_bounds(content: &str) -> bool {
    let len = content.chars().count();
    let max = MAX_CONTENT_CHARS + ELLIPSIS.chars().count();
    (MIN_CONTENT_CHARS..=max).contains(&len)
}

/// Signature and timestamp scraped from the aggregator's article page.
///
/// Scoped to a single resolution attempt and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningParams {
    pub signature: String,
    pub timestamp: String,
}
