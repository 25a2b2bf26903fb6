//! Article summarization providers.
//!
//! Defines the [`Summarizer`] trait and the implementations built from the
//! `[summarizer]` config section:
//! - **[`ChatCompletionSummarizer`]**: an OpenAI-compatible chat-completions
//!   endpoint, either as a single JSON response or as a server-sent-events
//!   stream of deltas.
//! - **[`ExcerptSummarizer`]**: a deterministic local summary taken from the
//!   first body line. Never fails.
//! - **[`FallbackSummarizer`]**: tries each provider in order and finishes
//!   with the excerpt summary, so the chain as a whole never fails.
//!
//! The import engine still treats a summarizer error as a per-file soft
//! failure, so custom implementations are free to return errors.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::{SummarizerConfig, SummaryProviderConfig};

const SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes articles concisely.";
const EXCERPT_CHARS: usize = 200;

/// Produces a short summary of a markdown document.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Provider label used in logs.
    fn name(&self) -> &str;

    async fn summarize(&self, markdown: &str) -> Result<String>;
}

fn user_prompt(markdown: &str) -> String {
    format!(
        "Summarize the following markdown article in 2-3 sentences, \
         focusing on the main content and key points:\n\n{}",
        markdown
    )
}

// ============ Chat completions ============

/// Summarizer backed by an OpenAI-compatible `chat/completions` endpoint.
pub struct ChatCompletionSummarizer {
    name: String,
    timeout: Duration,
    url: String,
    model: String,
    api_key: Option<String>,
    stream: bool,
    client: reqwest::Client,
}

impl ChatCompletionSummarizer {
    pub fn new(
        provider: &SummaryProviderConfig,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: provider.name.clone(),
            timeout,
            url: provider.url.clone(),
            model: provider.model.clone(),
            api_key,
            stream: provider.stream,
            client,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Summarizer for ChatCompletionSummarizer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn summarize(&self, markdown: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt(markdown) },
            ],
            "stream": self.stream,
        });

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("{} API error {}: {}", self.name, status, body_text);
        }

        let summary = if self.stream {
            parse_stream_body(&response.text().await?)
        } else {
            let json: serde_json::Value = response.json().await?;
            parse_completion_response(&json)?
        };

        let summary = summary.trim();
        if summary.is_empty() {
            bail!("{} returned no content", self.name);
        }
        Ok(summary.to_string())
    }
}

/// Extract `choices[0].message.content` from a non-streaming response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid completion response: missing choices[0].message.content"))
}

/// Concatenate `choices[0].delta.content` fragments from an SSE body.
///
/// Lines may carry a `data: ` prefix; `[DONE]` ends the stream. Chunks that
/// are not valid JSON are skipped.
fn parse_stream_body(body: &str) -> String {
    let mut summary = String::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let payload = line.strip_prefix("data:").map(str::trim_start).unwrap_or(line);
        if payload == "[DONE]" {
            break;
        }
        let chunk: serde_json::Value = match serde_json::from_str(payload) {
            Ok(v) => v,
            Err(_) => {
                tracing::debug!(chunk = payload, "skipping malformed stream chunk");
                continue;
            }
        };
        if let Some(fragment) = chunk
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("delta"))
            .and_then(|d| d.get("content"))
            .and_then(|c| c.as_str())
        {
            summary.push_str(fragment);
        }
    }
    summary
}

// ============ Excerpt ============

/// Local summary: the first line that is neither blank nor a heading.
pub struct ExcerptSummarizer;

impl ExcerptSummarizer {
    pub fn excerpt(markdown: &str) -> String {
        markdown
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                let head: String = line.chars().take(EXCERPT_CHARS).collect();
                format!("This is an auto-generated summary: {}...", head)
            })
            .unwrap_or_else(|| "No summary available.".to_string())
    }
}

#[async_trait]
impl Summarizer for ExcerptSummarizer {
    fn name(&self) -> &str {
        "excerpt"
    }

    async fn summarize(&self, markdown: &str) -> Result<String> {
        Ok(Self::excerpt(markdown))
    }
}

// ============ Fallback chain ============

/// Tries each provider in order, ending with [`ExcerptSummarizer`].
pub struct FallbackSummarizer {
    providers: Vec<Box<dyn Summarizer>>,
}

impl FallbackSummarizer {
    pub fn new(providers: Vec<Box<dyn Summarizer>>) -> Self {
        Self { providers }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl Summarizer for FallbackSummarizer {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn summarize(&self, markdown: &str) -> Result<String> {
        for provider in &self.providers {
            match provider.summarize(markdown).await {
                Ok(summary) => return Ok(summary),
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "summarizer failed, trying next");
                }
            }
        }
        Ok(ExcerptSummarizer::excerpt(markdown))
    }
}

/// Build the provider chain described by `config`.
///
/// Providers whose `api_key_env` variable is unset are left out with a
/// warning rather than failing every request.
pub fn build_summarizer(config: &SummarizerConfig) -> Result<FallbackSummarizer> {
    let mut providers: Vec<Box<dyn Summarizer>> = Vec::new();

    for provider in &config.providers {
        let api_key = match &provider.api_key_env {
            Some(var) => match std::env::var(var) {
                Ok(key) if !key.is_empty() => Some(key),
                _ => {
                    tracing::warn!(provider = %provider.name, env = %var, "api key not set, provider disabled");
                    continue;
                }
            },
            None => None,
        };
        let timeout = Duration::from_secs(provider.timeout_secs_or(config.timeout_secs));
        providers.push(Box::new(ChatCompletionSummarizer::new(
            provider, api_key, timeout,
        )?));
    }

    Ok(FallbackSummarizer::new(providers))
}
