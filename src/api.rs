//! Generative-text capability with exponential backoff retry logic.
//!
//! The extractor only needs "prompt in, text out". This module provides that
//! contract and the backends behind it:
//!
//! - [`TextGenerator`]: core trait defining async text generation
//! - [`GeminiGenerator`]: Google's Generative Language REST API
//! - [`AwfulJadeGenerator`]: any OpenAI-compatible server via `awful_aj`
//! - [`Generator`]: one concrete type over both backends
//! - [`RetryGenerate`]: decorator that adds retry logic to any `TextGenerator`
//!
//! # Retry Strategy
//!
//! - Retry budget set by the caller
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//! - Timeouts are never retried: the per-call timeout bounds each item

use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use rand::{Rng, rng};
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::io;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::utils::truncate_for_log;

/// Trait for async text generation.
///
/// Implementors take a complete prompt and return the model's reply as plain
/// text. Tests substitute scripted implementations.
pub trait TextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`TextGenerator`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryGenerate<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryGenerate<T>
where
    T: TextGenerator,
{
    /// Wrap `inner`, retrying up to `max_retries` times after the first failure.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryGenerate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryGenerate")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> TextGenerator for RetryGenerate<T>
where
    T: TextGenerator,
{
    #[instrument(level = "info", skip_all)]
    async fn generate(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.generate(prompt).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if is_timeout(e.as_ref()) {
                        warn!(
                            attempt,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            error = %e,
                            "generate() timed out; not retrying"
                        );
                        return Err(e);
                    }

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "generate() exhausted retries"
                        );
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "generate() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// `true` when `err`, or anything in its source chain, is a timeout.
pub fn is_timeout(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<reqwest::Error>().is_some_and(reqwest::Error::is_timeout) {
            return true;
        }
        if e.downcast_ref::<io::Error>().is_some_and(|io| io.kind() == io::ErrorKind::TimedOut) {
            return true;
        }
        if e.is::<tokio::time::error::Elapsed>() {
            return true;
        }
        current = e.source();
    }
    false
}

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini backend over the `generateContent` REST call.
#[derive(Clone)]
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
    timeout: StdDuration,
}

impl fmt::Debug for GeminiGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiGenerator")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

impl GeminiGenerator {
    pub fn new(client: Client, api_key: String, model: String) -> Self {
        info!(%model, "Generative fallback initialized (Gemini)");
        Self {
            client,
            api_key,
            model,
            timeout: StdDuration::from_secs(60),
        }
    }

    fn request_body(prompt: &str) -> Result<String, serde_json::Error> {
        serde_json::to_string(&serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        }))
    }

    /// Concatenated text parts of the first candidate.
    fn response_text(body: &str) -> Result<String, Box<dyn Error>> {
        let parsed: GeminiResponse = serde_json::from_str(body)?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .ok_or("Gemini response had no candidates")?;
        Ok(text)
    }
}

impl TextGenerator for GeminiGenerator {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let url = format!("{}/{}:generateContent", GEMINI_ENDPOINT, self.model);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .body(Self::request_body(prompt)?)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            warn!(
                %status,
                elapsed_ms = t0.elapsed().as_millis() as u64,
                body_preview = %truncate_for_log(&body, 300),
                "Gemini call failed"
            );
            return Err(format!("Gemini returned status {status}").into());
        }
        Self::response_text(&body)
    }
}

/// OpenAI-compatible backend via `awful_aj`, using a loaded config and chat template.
#[derive(Debug)]
pub struct AwfulJadeGenerator {
    config: AwfulJadeConfig,
    template: ChatTemplate,
}

impl AwfulJadeGenerator {
    pub fn new(config: AwfulJadeConfig, template: ChatTemplate) -> Self {
        Self { config, template }
    }

    /// Load `config.yaml` from `config_path` and the named template from the
    /// `awful_aj` config directory.
    pub async fn load(config_path: &str, template_name: &str) -> Result<Self, Box<dyn Error>> {
        let config = awful_aj::config::load_config(config_path)
            .map_err(|e| format!("failed to load config {config_path}: {e:?}"))?;
        let template = awful_aj::template::load_template(template_name).await?;
        info!(config_path, template_name, "Generative fallback initialized (awful_aj)");
        Ok(Self::new(config, template))
    }
}

impl TextGenerator for AwfulJadeGenerator {
    #[instrument(level = "info", skip_all)]
    async fn generate(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(&self.config, prompt.to_string(), &self.template, None, None).await;
        if let Err(e) = &res {
            warn!(elapsed_ms = t0.elapsed().as_millis() as u64, error = %e, "API call failed");
        }
        res
    }
}

/// The configured generative backend.
#[derive(Debug)]
pub enum Generator {
    Gemini(GeminiGenerator),
    AwfulJade(AwfulJadeGenerator),
}

impl TextGenerator for Generator {
    async fn generate(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
        match self {
            Generator::Gemini(g) => g.generate(prompt).await,
            Generator::AwfulJade(g) => g.generate(prompt).await,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedGenerator;
    use super::*;

    #[tokio::test]
    async fn test_retry_recovers_after_failures() {
        let inner = ScriptedGenerator::new(vec![
            Err("rate limited".to_string()),
            Err("rate limited".to_string()),
            Ok("article body".to_string()),
        ]);
        let api = RetryGenerate::new(inner, 2, StdDuration::from_millis(1));
        assert_eq!(api.generate("prompt").await.unwrap(), "article body");
        assert_eq!(api.inner.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_budget() {
        let inner = ScriptedGenerator::new(vec![
            Err("boom".to_string()),
            Err("boom".to_string()),
            Ok("too late".to_string()),
        ]);
        let api = RetryGenerate::new(inner, 1, StdDuration::from_millis(1));
        let err = api.generate("prompt").await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(api.inner.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_retries_calls_once() {
        let inner = ScriptedGenerator::new(vec![Err("down".to_string())]);
        let api = RetryGenerate::new(inner, 0, StdDuration::from_millis(1));
        assert!(api.generate("prompt").await.is_err());
        assert_eq!(api.inner.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_not_retried() {
        let inner = ScriptedGenerator::timing_out(1, vec![Ok("would have worked".to_string())]);
        let api = RetryGenerate::new(inner, 2, StdDuration::from_millis(1));
        let err = api.generate("prompt").await.unwrap_err();
        assert!(is_timeout(err.as_ref()));
        assert_eq!(api.inner.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_is_timeout_recognizes_timeout_errors() {
        let elapsed = tokio::time::timeout(StdDuration::from_millis(1), std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(is_timeout(&elapsed));

        let io_timeout = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert!(is_timeout(&io_timeout));

        let plain: Box<dyn Error> = "boom".into();
        assert!(!is_timeout(plain.as_ref()));
    }

    #[test]
    fn test_gemini_request_body() {
        let body = GeminiGenerator::request_body("extract \"this\"").unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "extract \"this\"");
    }

    #[test]
    fn test_gemini_response_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"world"}],"role":"model"}}]}"#;
        assert_eq!(GeminiGenerator::response_text(body).unwrap(), "Hello, world");
    }

    #[test]
    fn test_gemini_response_without_candidates() {
        assert!(GeminiGenerator::response_text(r#"{"candidates":[]}"#).is_err());
        assert!(GeminiGenerator::response_text(r#"{"promptFeedback":{}}"#).is_err());
        assert!(GeminiGenerator::response_text("not json").is_err());
    }

    #[test]
    fn test_gemini_debug_hides_key() {
        let g = GeminiGenerator::new(
            Client::new(),
            "secret-key".to_string(),
            "gemini-2.0-flash-lite".to_string(),
        );
        let dbg = format!("{g:?}");
        assert!(dbg.contains("gemini-2.0-flash-lite"));
        assert!(!dbg.contains("secret-key"));
    }
}
