//! Anthropic Client
//!
//! Messages API client. There is no JSON response mode, so `json_mode`
//! tightens the system prompt instead.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::llm_client::{truncate_for_log, ChatRequest, LlmClient};

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

const JSON_ONLY_SUFFIX: &str =
    "\n\nIMPORTANT: Respond with a single valid JSON object only. No markdown code blocks, no explanations.";

#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl AnthropicClient {
    /// Create a client; the model comes from `ANTHROPIC_MODEL` when set
    pub fn new(api_key: String) -> Self {
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::with_model(api_key, &model)
    }

    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.to_string(),
        }
    }

    fn request_body(&self, request: &ChatRequest<'_>) -> serde_json::Value {
        let system = if request.json_mode {
            format!("{}{}", request.system_prompt, JSON_ONLY_SUFFIX)
        } else {
            request.system_prompt.to_string()
        };
        let messages: Vec<_> = request
            .turns
            .iter()
            .map(|turn| json!({"role": turn.role, "content": &turn.content}))
            .collect();

        json!({
            "model": &self.model,
            "max_tokens": MAX_TOKENS,
            "system": system,
            "messages": messages
        })
    }
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.request_body(&request))
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(anyhow!("Anthropic API error {}: {}", status, text));
        }
        tracing::debug!("Anthropic raw response: {}", truncate_for_log(&text, 1000));

        let parsed: MessagesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse Anthropic response: {}", e))?;
        let joined: String = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect();
        if joined.is_empty() {
            return Err(anyhow!("Empty response from Anthropic"));
        }
        Ok(joined)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "Anthropic"
    }
}
