//! Completion capability boundary.
//!
//! The [`CompletionClient`] trait decouples candidate generation from the
//! actual model backend. Tests use scripted clients that replay canned
//! replies without any network access.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

/// Abstraction over text-completion backends.
pub trait CompletionClient {
    /// Send one prompt and return the model's text reply.
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Resolve the API credential, read once at startup and threaded through
/// [`OpenAiCompletions::new`]. Absence is a fatal precondition: no attempt
/// may start without it.
pub fn require_api_key(value: Option<String>) -> Result<String> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(anyhow!(
            "OPENAI_API_KEY is not set (required to call the completion API)"
        )),
    }
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Blocking client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiCompletions {
    http: reqwest::blocking::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl OpenAiCompletions {
    /// Build a client with an explicit credential and per-request timeout.
    pub fn new(api_base: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl CompletionClient for OpenAiCompletions {
    #[instrument(skip_all, fields(model = %self.model, prompt_bytes = prompt.len()))]
    fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0,
        });

        info!(url = %url, "requesting completion");
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .context("send completion request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(status = %status, "completion request failed");
            return Err(anyhow!(
                "completion request failed with status {status}: {}",
                truncate(&body, 2_000)
            ));
        }

        let parsed: ChatResponse = response.json().context("parse completion response")?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("completion response contained no choices"))?;
        debug!(reply_bytes = reply.len(), "completion received");
        Ok(reply)
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
