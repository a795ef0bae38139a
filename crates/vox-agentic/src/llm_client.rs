//! LLM Client Trait
//!
//! Unified interface for the chat backends (Anthropic, OpenAI) used by the
//! assistant and by the result classifier.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of a conversation sent to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A fully described completion request
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub system_prompt: &'a str,
    pub turns: &'a [ChatTurn],
    /// Ask the provider for a bare JSON object
    pub json_mode: bool,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run a completion and return the raw text of the first choice
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String>;

    /// Get the model name for logging
    fn model_name(&self) -> &str;

    /// Get the provider name for logging
    fn provider_name(&self) -> &str;

    /// Single-shot system + user prompt
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let turns = [ChatTurn::user(user_prompt)];
        self.complete(ChatRequest {
            system_prompt,
            turns: &turns,
            json_mode: false,
        })
        .await
    }

    /// Single-shot prompt expecting a JSON object back
    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let turns = [ChatTurn::user(user_prompt)];
        self.complete(ChatRequest {
            system_prompt,
            turns: &turns,
            json_mode: true,
        })
        .await
    }

    /// Multi-turn conversation
    async fn converse(&self, system_prompt: &str, turns: &[ChatTurn]) -> Result<String> {
        self.complete(ChatRequest {
            system_prompt,
            turns,
            json_mode: false,
        })
        .await
    }
}

/// Shorten model output for log lines without splitting a UTF-8 character.
pub fn truncate_for_log(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
