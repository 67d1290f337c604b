//! Quote summarization through an OpenAI-compatible chat API.
//!
//! The [`Summarize`] trait is the seam between the pipeline and the LLM.
//! [`ChatSummarizer`] is the production implementation; [`RetrySummarize`]
//! decorates any implementation with exponential backoff and jitter for
//! transient failures. Every failure surfaces as
//! [`IngestError::EnrichmentDegraded`] and is absorbed by the caller, which
//! falls back to the extracted content; summarization can never abort the
//! pipeline.

use std::time::Duration;

use async_trait::async_trait;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::error::IngestError;

/// Request timeout for one summarization call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Condense text into a bounded number of sentences.
#[async_trait]
pub trait Summarize: Send + Sync {
    async fn summarize(&self, text: &str, max_sentences: usize) -> Result<String, IngestError>;
}

/// Summarizer backed by an OpenAI-compatible `chat/completions` endpoint.
pub struct ChatSummarizer {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl ChatSummarizer {
    pub fn new(base_url: &str, api_key: Option<&str>, model: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.map(String::from),
            model: model.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

fn degraded(reason: String) -> IngestError {
    IngestError::EnrichmentDegraded {
        stage: "summarization",
        reason,
    }
}

#[async_trait]
impl Summarize for ChatSummarizer {
    #[instrument(level = "debug", skip_all)]
    async fn summarize(&self, text: &str, max_sentences: usize) -> Result<String, IngestError> {
        let instruction = format!(
            "Condense the following news text into at most {max_sentences} sentences. \
             Reply with the summary only."
        );
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &instruction,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.2,
        };

        let mut call = self.http.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let response = call.send().await.map_err(|e| {
            if e.is_timeout() {
                degraded("request timed out".to_string())
            } else {
                degraded(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = if status.as_u16() == 429 {
                format!("quota exhausted: {body}")
            } else {
                format!("status {status}: {body}")
            };
            return Err(degraded(reason));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| degraded(format!("malformed response: {e}")))?;

        let summary = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(degraded("empty completion".to_string()));
        }

        debug!(bytes = summary.len(), "Summarization succeeded");
        Ok(summary.to_string())
    }
}

/// Decorator that adds exponential backoff retry to any [`Summarize`]
/// implementation.
///
/// The delay between retries is
/// `min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)`.
pub struct RetrySummarize<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetrySummarize<T>
where
    T: Summarize,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

#[async_trait]
impl<T> Summarize for RetrySummarize<T>
where
    T: Summarize,
{
    async fn summarize(&self, text: &str, max_sentences: usize) -> Result<String, IngestError> {
        let mut attempt = 0usize;

        loop {
            match self.inner.summarize(text, max_sentences).await {
                Ok(summary) => return Ok(summary),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1u32 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "Summarize attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
