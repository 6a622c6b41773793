//! RSS intake: turns an aggregator feed into [`CandidateItem`]s.
//!
//! Aggregator items look like:
//!
//! ```xml
//! <item>
//!   <title>Headline - Publisher</title>
//!   <link>https://news.google.com/rss/articles/CBMi...?oc=5</link>
//!   <pubDate>Sat, 17 Oct 2026 09:00:00 GMT</pubDate>
//!   <source url="https://publisher.example">Publisher</source>
//! </item>
//! ```

use quick_xml::de::from_str;
use serde::Deserialize;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

use crate::http::{BROWSER_HEADERS, HttpClient};
use crate::models::CandidateItem;

const FEED_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    source: Option<Source>,
}

#[derive(Debug, Deserialize)]
struct Source {
    #[serde(rename = "$text")]
    name: Option<String>,
}

/// Parse an RSS 2.0 document, stamping every item with `category`.
///
/// Items without a link are skipped. A missing `<source>` falls back to the
/// link's host.
pub fn parse_feed(xml: &str, category: &str) -> Result<Vec<CandidateItem>, Box<dyn Error>> {
    let rss: Rss = from_str(xml)?;
    let mut out = Vec::with_capacity(rss.channel.items.len());

    for it in rss.channel.items {
        let Some(link) = it.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()) else {
            debug!(title = ?it.title, "Skipping feed item without link");
            continue;
        };
        let source = it
            .source
            .and_then(|s| s.name)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| host_of(&link))
            .unwrap_or_default();

        out.push(CandidateItem {
            title: it.title.unwrap_or_default().trim().to_string(),
            link,
            source,
            category: category.to_string(),
            publish_time: it.pub_date.unwrap_or_default().trim().to_string(),
        });
    }

    Ok(out)
}

/// GET `url` and parse it with [`parse_feed`].
#[instrument(level = "info", skip(http))]
pub async fn fetch_feed<H: HttpClient>(
    http: &H,
    url: &str,
    category: &str,
) -> Result<Vec<CandidateItem>, Box<dyn Error>> {
    let xml = http.get_text(url, BROWSER_HEADERS, FEED_TIMEOUT).await?;
    let items = parse_feed(&xml, category)?;
    info!(count = items.len(), "Parsed feed items");
    Ok(items)
}

fn host_of(link: &str) -> Option<String> {
    Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeHttp;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <generator>NFE/5.0</generator>
    <title>Top stories - Google News</title>
    <link>https://news.google.com/?hl=ko&amp;gl=KR&amp;ceid=KR:ko</link>
    <item>
      <title>Council approves budget - Example Daily</title>
      <link>https://news.google.com/rss/articles/CBMiabc?oc=5</link>
      <guid isPermaLink="false">CBMiabc</guid>
      <pubDate>Sat, 17 Oct 2026 09:00:00 GMT</pubDate>
      <description>&lt;a href="x"&gt;Council&lt;/a&gt;</description>
      <source url="https://daily.example">Example Daily</source>
    </item>
    <item>
      <title>No link here</title>
    </item>
    <item>
      <title>Direct story</title>
      <link>https://publisher.example/story/7</link>
      <pubDate>Sat, 17 Oct 2026 10:30:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed() {
        let items = parse_feed(FEED, "top").unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].title, "Council approves budget - Example Daily");
        assert_eq!(items[0].link, "https://news.google.com/rss/articles/CBMiabc?oc=5");
        assert_eq!(items[0].source, "Example Daily");
        assert_eq!(items[0].category, "top");
        assert_eq!(items[0].publish_time, "Sat, 17 Oct 2026 09:00:00 GMT");

        assert_eq!(items[1].source, "publisher.example");
    }

    #[test]
    fn test_parse_empty_channel() {
        let xml = r#"<rss version="2.0"><channel><title>Empty</title></channel></rss>"#;
        assert!(parse_feed(xml, "top").unwrap().is_empty());
    }

    #[test]
    fn test_parse_invalid_feed() {
        assert!(parse_feed("<html><body>not a feed</body></html>", "top").is_err());
    }

    #[tokio::test]
    async fn test_fetch_feed() {
        let http = FakeHttp::new().on_get("https://news.google.com/rss", FEED);
        let items = fetch_feed(&http, "https://news.google.com/rss", "top").await.unwrap();
        assert_eq!(items.len(), 2);

        let missing = fetch_feed(&http, "https://news.google.com/other", "top").await;
        assert!(missing.is_err());
    }
}
