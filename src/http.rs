//! HTTP seam used by the resolver, the feed reader and the batch scraper.
//!
//! Everything that touches the network goes through [`HttpClient`], so the
//! pipeline can be exercised offline with a scripted client. [`ReqwestClient`]
//! is the production implementation.

use reqwest::Client;
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::config::{
    AGGREGATOR_USER_AGENT, BROWSER_ACCEPT, BROWSER_ACCEPT_LANGUAGE, BROWSER_USER_AGENT,
};

/// A request header as a `(name, value)` pair.
pub type Header = (&'static str, &'static str);

/// Headers sent to the aggregator's own pages.
pub const AGGREGATOR_HEADERS: &[Header] = &[("User-Agent", AGGREGATOR_USER_AGENT)];

/// Headers sent with the batch-execute form post.
pub const FORM_HEADERS: &[Header] = &[(
    "Content-Type",
    "application/x-www-form-urlencoded;charset=UTF-8",
)];

/// Headers that make a publisher fetch look like a desktop browser.
pub const BROWSER_HEADERS: &[Header] = &[
    ("User-Agent", BROWSER_USER_AGENT),
    ("Accept", BROWSER_ACCEPT),
    ("Accept-Language", BROWSER_ACCEPT_LANGUAGE),
];

/// Minimal HTTP capability the pipeline depends on.
///
/// Implementations must return `Err` for transport failures, timeouts and
/// non-2xx responses. They are reused sequentially across items and must not
/// carry per-request state between calls.
pub trait HttpClient {
    /// GET `url` and return the response body as text.
    async fn get_text(
        &self,
        url: &str,
        headers: &[Header],
        timeout: Duration,
    ) -> Result<String, Box<dyn Error>>;

    /// POST an already url-encoded form `body` to `url` and return the response body.
    async fn post_form(
        &self,
        url: &str,
        body: String,
        headers: &[Header],
        timeout: Duration,
    ) -> Result<String, Box<dyn Error>>;
}

/// [`HttpClient`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn get_text(
        &self,
        url: &str,
        headers: &[Header],
        timeout: Duration,
    ) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let mut req = self.client.get(url).timeout(timeout);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "GET returned non-success status");
            return Err(format!("GET {url} failed with status {status}").into());
        }

        let body = resp.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "GET complete"
        );
        Ok(body)
    }

    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn post_form(
        &self,
        url: &str,
        body: String,
        headers: &[Header],
        timeout: Duration,
    ) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let mut req = self.client.post(url).timeout(timeout).body(body);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "POST returned non-success status");
            return Err(format!("POST {url} failed with status {status}").into());
        }

        let text = resp.text().await?;
        debug!(
            bytes = text.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "POST complete"
        );
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted [`HttpClient`] for offline tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// One recorded request.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Call {
        pub method: &'static str,
        pub url: String,
        pub body: Option<String>,
        pub timeout: Duration,
        pub headers: Vec<Header>,
    }

    /// Answers GETs and POSTs from canned bodies; unknown URLs fail.
    #[derive(Debug, Default)]
    pub struct FakeHttp {
        gets: HashMap<String, String>,
        posts: HashMap<String, String>,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeHttp {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on_get(mut self, url: &str, body: &str) -> Self {
            self.gets.insert(url.to_string(), body.to_string());
            self
        }

        pub fn on_post(mut self, url: &str, body: &str) -> Self {
            self.posts.insert(url.to_string(), body.to_string());
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl HttpClient for FakeHttp {
        async fn get_text(
            &self,
            url: &str,
            headers: &[Header],
            timeout: Duration,
        ) -> Result<String, Box<dyn Error>> {
            self.record(Call {
                method: "GET",
                url: url.to_string(),
                body: None,
                timeout,
                headers: headers.to_vec(),
            });
            self.gets
                .get(url)
                .cloned()
                .ok_or_else(|| format!("no route for GET {url}").into())
        }

        async fn post_form(
            &self,
            url: &str,
            body: String,
            headers: &[Header],
            timeout: Duration,
        ) -> Result<String, Box<dyn Error>> {
            self.record(Call {
                method: "POST",
                url: url.to_string(),
                body: Some(body),
                timeout,
                headers: headers.to_vec(),
            });
            self.posts
                .get(url)
                .cloned()
                .ok_or_else(|| format!("no route for POST {url}").into())
        }
    }
}
