//! Anthropic API completion adapter.
//!
//! Speaks the Messages API directly via HTTP. Requires an API key (from
//! config or the `ANTHROPIC_API_KEY` env var). The request timeout lives
//! here, on the client; the pipeline never retries a failed call.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::models::{CompletionConfig, TokenUsage};
use crate::domain::ports::{Completion, CompletionService};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Configuration for the Anthropic completion adapter.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key (required)
    pub api_key: String,

    /// Model to use
    pub model: String,

    /// Base URL for the API (for testing/proxies)
    pub base_url: Option<String>,

    /// Maximum tokens per completion
    pub max_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl AnthropicConfig {
    /// Build from the completion section of the app config plus the
    /// `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env(completion: &CompletionConfig) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set")?;
        Ok(Self {
            api_key,
            model: completion.model.clone(),
            base_url: None,
            max_tokens: completion.max_tokens,
            timeout_secs: completion.timeout_secs,
        })
    }
}

/// Completion service backed by the Anthropic Messages API.
pub struct AnthropicCompletion {
    client: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicCompletion {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/v1/messages")
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [RequestMessage<'a>; 1],
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<UsageBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct UsageBlock {
    input_tokens: u64,
    output_tokens: u64,
}

#[async_trait]
impl CompletionService for AnthropicCompletion {
    async fn complete(&self, system: &str, user: &str) -> Result<Completion> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system,
            messages: [RequestMessage {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("Completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Completion API returned {status}: {body}"));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("Failed to decode completion response")?;

        let text = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(anyhow!("Completion response contained no text"));
        }

        let mut completion = Completion::new(text);
        if let Some(usage) = parsed.usage {
            completion =
                completion.with_usage(TokenUsage::new(usage.input_tokens, usage.output_tokens));
        }
        Ok(completion)
    }
}
