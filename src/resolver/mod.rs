//! Turns aggregator redirect links into publisher URLs.
//!
//! Resolution is a left-to-right strategy chain that stops at the first hit:
//!
//! | Tier | Module | Cost |
//! |------|--------|------|
//! | Legacy decode | [`legacy`] | none, offline |
//! | Signed exchange | [`signed`] | two aggregator requests |
//! | Pass-through | - | returns the redirect link unchanged |
//!
//! [`UrlResolver::resolve`] is total: it never errors, and links that do not
//! point at the aggregator skip the chain entirely.

pub mod legacy;
pub mod signed;

use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{AGGREGATOR_HOST, ScraperConfig};
use crate::http::HttpClient;
use legacy::decode_legacy;
use signed::{SignedRequestResolver, host_matches};

/// Which tier produced a resolution. Used for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedBy {
    /// Not an aggregator link; returned as given.
    Direct,
    Legacy,
    Signed,
    /// Every tier failed; the redirect link is returned as given.
    Passthrough,
}

/// Orchestrates the resolution tiers over a shared HTTP client.
#[derive(Debug)]
pub struct UrlResolver<'a, H> {
    signed: SignedRequestResolver<'a, H>,
}

impl<'a, H: HttpClient> UrlResolver<'a, H> {
    pub fn new(http: &'a H, config: &'a ScraperConfig) -> Self {
        Self {
            signed: SignedRequestResolver::new(http, config),
        }
    }

    /// Resolve `url` to the best URL available. Never fails.
    pub async fn resolve(&self, url: &str) -> String {
        self.resolve_with_tier(url).await.0
    }

    /// Like [`resolve`](Self::resolve), also reporting which tier answered.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn resolve_with_tier(&self, url: &str) -> (String, ResolvedBy) {
        let Some(article_id) = aggregator_article_id(url) else {
            return (url.to_string(), ResolvedBy::Direct);
        };

        if let Some(decoded) = decode_legacy(&article_id) {
            debug!(%decoded, "Resolved via legacy decode");
            return (decoded, ResolvedBy::Legacy);
        }

        debug!("Legacy decode failed; trying signed exchange");
        if let Some(decoded) = self.signed.resolve_signed(&article_id).await {
            debug!(%decoded, "Resolved via signed exchange");
            return (decoded, ResolvedBy::Signed);
        }

        warn!(%url, stage = "resolve", "Could not resolve aggregator link; using it as-is");
        (url.to_string(), ResolvedBy::Passthrough)
    }
}

/// The `<articleId>` of an aggregator `.../articles/<articleId>?...` link.
///
/// `None` for non-aggregator URLs, unparsable input, or a missing id.
fn aggregator_article_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !parsed.host_str().is_some_and(|h| host_matches(h, AGGREGATOR_HOST)) {
        return None;
    }

    let path = parsed.path();
    let start = path.find("/articles/")? + "/articles/".len();
    let id = &path[start..];
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeHttp;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn legacy_id(url: &str) -> String {
        let mut blob = vec![0x08, 0x13, 0x22, url.len() as u8];
        blob.extend_from_slice(url.as_bytes());
        blob.extend_from_slice(&[0xd2, 0x01, 0x00]);
        URL_SAFE_NO_PAD.encode(blob)
    }

    #[test]
    fn test_aggregator_article_id() {
        assert_eq!(
            aggregator_article_id("https://news.google.com/rss/articles/CBMiabc?oc=5").as_deref(),
            Some("CBMiabc")
        );
        assert_eq!(
            aggregator_article_id("https://news.google.com/articles/XYZ").as_deref(),
            Some("XYZ")
        );
        assert_eq!(aggregator_article_id("https://news.google.com/rss/articles/"), None);
        assert_eq!(aggregator_article_id("https://news.google.com/home"), None);
        assert_eq!(aggregator_article_id("https://example.com/rss/articles/abc"), None);
        assert_eq!(aggregator_article_id("not a url"), None);
    }

    #[tokio::test]
    async fn test_non_aggregator_url_is_untouched() {
        let cfg = ScraperConfig::default();
        let http = FakeHttp::new();
        let resolver = UrlResolver::new(&http, &cfg);

        let (url, tier) = resolver.resolve_with_tier("https://example.com/story").await;
        assert_eq!(url, "https://example.com/story");
        assert_eq!(tier, ResolvedBy::Direct);
        assert!(http.calls().is_empty());
    }

    #[tokio::test]
    async fn test_legacy_identifier_needs_no_network() {
        let cfg = ScraperConfig::default();
        let http = FakeHttp::new();
        let resolver = UrlResolver::new(&http, &cfg);

        let link = format!(
            "https://news.google.com/rss/articles/{}?oc=5",
            legacy_id("https://example.com/a")
        );
        let (url, tier) = resolver.resolve_with_tier(&link).await;
        assert_eq!(url, "https://example.com/a");
        assert_eq!(tier, ResolvedBy::Legacy);
        assert!(http.calls().is_empty());
    }

    #[tokio::test]
    async fn test_signed_identifier_uses_exchange() {
        let cfg = ScraperConfig::default();
        let http = FakeHttp::new()
            .on_get(
                "https://news.google.com/rss/articles/AU_yqLsigned",
                r#"<c-wiz><div data-n-a-sg="S" data-n-a-ts="T"></div></c-wiz>"#,
            )
            .on_post(
                "https://news.google.com/_/DotsSplashUi/data/batchexecute",
                r#")]}'
[["wrb.fr","Fbv4je","[\"garturlres\",\"https://publisher.example/article/42\",1]"]]"#,
            );
        let resolver = UrlResolver::new(&http, &cfg);

        let (url, tier) = resolver
            .resolve_with_tier("https://news.google.com/rss/articles/AU_yqLsigned?oc=5")
            .await;
        assert_eq!(url, "https://publisher.example/article/42");
        assert_eq!(tier, ResolvedBy::Signed);
    }

    #[tokio::test]
    async fn test_unresolvable_identifier_passes_through() {
        let cfg = ScraperConfig::default();
        let http = FakeHttp::new();
        let resolver = UrlResolver::new(&http, &cfg);

        let link = "https://news.google.com/rss/articles/AU_yqLmissing?oc=5";
        let (url, tier) = resolver.resolve_with_tier(link).await;
        assert_eq!(url, link);
        assert_eq!(tier, ResolvedBy::Passthrough);
    }

    #[tokio::test]
    async fn test_resolve_is_total() {
        let cfg = ScraperConfig::default();
        let http = FakeHttp::new();
        let resolver = UrlResolver::new(&http, &cfg);

        for input in [
            "",
            "garbage",
            "news.google.com/rss/articles/abc",
            "https://news.google.com/rss/articles/%%%",
            "https://news.google.com/rss/articles/!!!!",
            "ftp://news.google.com/rss/articles/abc",
        ] {
            assert_eq!(resolver.resolve(input).await, input);
        }
    }
}
