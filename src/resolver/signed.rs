//! Resolver for the aggregator's signed redirect scheme.
//!
//! Newer identifiers cannot be decoded offline. Instead:
//!
//! 1. GET the aggregator's article page and read the signature/timestamp pair
//!    from the `c-wiz > div` container (`data-n-a-sg`, `data-n-a-ts`).
//! 2. POST them to the internal `batchexecute` RPC, which answers with an
//!    escaped JSON blob that contains the publisher URL.
//!
//! Both steps fail closed: any error becomes `None` so the caller can fall
//! through to the next strategy.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{Html, Selector};
use std::error::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{AGGREGATOR_HOST, STATIC_ASSET_HOST, ScraperConfig};
use crate::http::{AGGREGATOR_HEADERS, FORM_HEADERS, HttpClient};
use crate::models::SigningParams;

/// RPC id of the URL-lookup procedure.
const RPC_ID: &str = "Fbv4je";
/// Path of the batch-execute endpoint relative to the aggregator base.
const BATCH_EXECUTE_PATH: &str = "/_/DotsSplashUi/data/batchexecute";

static DOUBLE_ESCAPED_CODEPOINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\\\u([0-9a-fA-F]{4})").unwrap());
static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[a-zA-Z0-9\-._~:/?#\[\]@!$&'()*+,;=%]+").unwrap());

/// Looks up publisher URLs through the aggregator's signed RPC.
#[derive(Debug)]
pub struct SignedRequestResolver<'a, H> {
    http: &'a H,
    config: &'a ScraperConfig,
}

impl<'a, H: HttpClient> SignedRequestResolver<'a, H> {
    pub fn new(http: &'a H, config: &'a ScraperConfig) -> Self {
        Self { http, config }
    }

    /// Run both protocol steps for `article_id`.
    #[instrument(level = "debug", skip_all, fields(%article_id))]
    pub async fn resolve_signed(&self, article_id: &str) -> Option<String> {
        let params = self.fetch_signing_params(article_id).await?;
        self.exchange_for_url(article_id, &params.signature, &params.timestamp)
            .await
    }

    /// Step 1: scrape the signing pair from the aggregator's article page.
    pub async fn fetch_signing_params(&self, article_id: &str) -> Option<SigningParams> {
        let url = format!("{}/rss/articles/{}", self.config.aggregator_base, article_id);
        let html = match self
            .http
            .get_text(&url, AGGREGATOR_HEADERS, self.config.signing_timeout)
            .await
        {
            Ok(html) => html,
            Err(e) => {
                warn!(%url, stage = "signing-params", error = %e, "Failed to fetch article page");
                return None;
            }
        };

        let params = parse_signing_params(&html);
        if params.is_none() {
            warn!(%url, stage = "signing-params", "Article page exposes no signing params");
        }
        params
    }

    /// Step 2: trade the signing pair for the publisher URL.
    pub async fn exchange_for_url(
        &self,
        article_id: &str,
        signature: &str,
        timestamp: &str,
    ) -> Option<String> {
        let endpoint = format!("{}{}", self.config.aggregator_base, BATCH_EXECUTE_PATH);
        let body = match build_exchange_body(article_id, signature, timestamp) {
            Ok(body) => body,
            Err(e) => {
                warn!(stage = "batch-execute", error = %e, "Failed to build request payload");
                return None;
            }
        };

        let response = match self
            .http
            .post_form(&endpoint, body, FORM_HEADERS, self.config.exchange_timeout)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(url = %endpoint, stage = "batch-execute", error = %e, "Exchange request failed");
                return None;
            }
        };

        let found = first_publisher_url(&unescape_response(&response));
        match &found {
            Some(url) => debug!(%url, "batch-execute returned publisher URL"),
            None => warn!(stage = "batch-execute", "No publisher URL in exchange response"),
        }
        found
    }
}

/// Pull `data-n-a-sg` / `data-n-a-ts` off the first `c-wiz > div`.
fn parse_signing_params(html: &str) -> Option<SigningParams> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("c-wiz > div").ok()?;
    let div = document.select(&selector).next()?;

    let signature = div.value().attr("data-n-a-sg")?;
    let timestamp = div.value().attr("data-n-a-ts")?;
    if signature.is_empty() || timestamp.is_empty() {
        return None;
    }
    Some(SigningParams {
        signature: signature.to_string(),
        timestamp: timestamp.to_string(),
    })
}

/// Form body for the batch-execute call: `f.req=<url-encoded JSON>`.
///
/// The inner array is an opaque protocol message; its literals (including the
/// `"KR:ko"` locale) are sent verbatim.
fn build_exchange_body(
    article_id: &str,
    signature: &str,
    timestamp: &str,
) -> Result<String, Box<dyn Error>> {
    let inner = format!(
        r#"["garturlreq",[["X","X",["X","X"],null,null,1,1,"KR:ko",null,1,null,null,null,null,null,0,1],"X","X",1,[1,1,1],1,1,null,0,0,null,0],"{article_id}",{timestamp},"{signature}"]"#
    );
    let payload = serde_json::to_string(&serde_json::json!([[[RPC_ID, inner]]]))?;
    Ok(format!("f.req={}", urlencoding::encode(&payload)))
}

/// Undo the escaping layered on the batch-execute response.
fn unescape_response(raw: &str) -> String {
    DOUBLE_ESCAPED_CODEPOINT
        .replace_all(raw, |caps: &Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .replace("\\\"", "\"")
        .replace("\\/", "/")
}

/// First URL in `text` that belongs to neither the aggregator nor its asset host.
fn first_publisher_url(text: &str) -> Option<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|candidate| {
            Url::parse(candidate)
                .ok()
                .and_then(|u| u.host_str().map(str::to_owned))
                .is_some_and(|host| {
                    !host_matches(&host, AGGREGATOR_HOST) && !host_matches(&host, STATIC_ASSET_HOST)
                })
        })
        .map(str::to_string)
}

/// `true` if `host` is `domain` or one of its subdomains.
pub(crate) fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}
