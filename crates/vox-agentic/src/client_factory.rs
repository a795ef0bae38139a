//! Client Factory
//!
//! Builds the session's shared `LlmClient` handle from the environment.

use anyhow::{anyhow, Result};
use std::sync::Arc;

use crate::anthropic_client::AnthropicClient;
use crate::backend::AgentBackend;
use crate::llm_client::LlmClient;
use crate::openai_client::OpenAiClient;

/// Create a client for an explicit backend, reading its key from the
/// variable named by `AgentBackend::api_key_var`
pub fn create_llm_client_for(backend: AgentBackend) -> Result<Arc<dyn LlmClient>> {
    let var = backend.api_key_var();
    let api_key =
        std::env::var(var).map_err(|_| anyhow!("{} environment variable not set", var))?;
    let client = client_with_key(backend, api_key)?;
    tracing::info!(
        "LLM client: {} ({})",
        client.provider_name(),
        client.model_name()
    );
    Ok(client)
}

fn client_with_key(backend: AgentBackend, api_key: String) -> Result<Arc<dyn LlmClient>> {
    if api_key.trim().is_empty() {
        return Err(anyhow!("{} is empty", backend.api_key_var()));
    }
    Ok(match backend {
        AgentBackend::Anthropic => Arc::new(AnthropicClient::new(api_key)),
        AgentBackend::OpenAi => {
            let client = OpenAiClient::new(api_key);
            match std::env::var("OPENAI_BASE_URL") {
                Ok(url) => Arc::new(client.with_base_url(&url)),
                Err(_) => Arc::new(client),
            }
        }
    })
}
