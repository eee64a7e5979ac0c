//! Model API client with exponential-backoff retry.
//!
//! [`AskAsync`] is the text-in/text-out seam the classifier depends on;
//! [`ChatClient`] implements it against an OpenAI-compatible
//! chat-completions endpoint with deterministic sampling, and [`RetryAsk`]
//! decorates any implementation with bounded exponential backoff plus
//! jitter.

use std::time::{Duration, Instant};

use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};

/// Async text-to-text model interaction.
pub trait AskAsync {
    type Response;

    async fn ask(&self, text: &str) -> Result<Self::Response>;
}

/// Adds retry with exponential backoff and jitter to any [`AskAsync`].
///
/// Delay per retry: `min(base_delay * 2^(attempt-1), max_delay)` plus
/// 0-250 ms of jitter.
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: AskAsync> RetryAsk<T> {
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<T: AskAsync> AskAsync for RetryAsk<T> {
    type Response = T::Response;

    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response> {
        let t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms = t0.elapsed().as_millis() as u64,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(attempt, max = self.max_retries, ?delay, error = %e, "ask() failed; backing off");
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
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
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// OpenAI-compatible chat-completions client.
///
/// Sends a single user message with `temperature: 0.0` and returns the first
/// choice's content. Every failure mode maps to
/// [`HarvestError::Classification`]; the caller decides what that means for
/// the batch.
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| HarvestError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

impl AskAsync for ChatClient {
    type Response = String;

    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, text: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: text,
            }],
            temperature: 0.0,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| HarvestError::Classification(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(HarvestError::Classification(format!(
                "unexpected status {} from {}",
                resp.status(),
                self.endpoint
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| HarvestError::Classification(format!("malformed response: {e}")))?;

        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| HarvestError::Classification("response contained no choices".into()))?;
        debug!(bytes = answer.len(), "model answered");
        Ok(answer)
    }
}
