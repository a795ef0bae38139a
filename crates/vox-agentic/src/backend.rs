//! Backend Selection
//!
//! Which LLM provider the session talks to, chosen via `AGENT_BACKEND`.

use std::str::FromStr;
use thiserror::Error;

/// LLM backend provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentBackend {
    /// Anthropic Claude (default)
    #[default]
    Anthropic,
    /// OpenAI GPT
    OpenAi,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown AGENT_BACKEND '{0}' (valid values: anthropic, claude, openai, gpt)")]
pub struct ParseBackendError(pub String);

impl AgentBackend {
    pub fn name(&self) -> &'static str {
        match self {
            AgentBackend::Anthropic => "Anthropic",
            AgentBackend::OpenAi => "OpenAI",
        }
    }

    /// Environment variable holding the credential for this provider
    pub fn api_key_var(&self) -> &'static str {
        match self {
            AgentBackend::Anthropic => "ANTHROPIC_API_KEY",
            AgentBackend::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl FromStr for AgentBackend {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(AgentBackend::Anthropic),
            "openai" | "gpt" => Ok(AgentBackend::OpenAi),
            other => Err(ParseBackendError(other.to_string())),
        }
    }
}

impl std::fmt::Display for AgentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(
            "claude".parse::<AgentBackend>().unwrap(),
            AgentBackend::Anthropic
        );
        assert_eq!(" GPT ".parse::<AgentBackend>().unwrap(), AgentBackend::OpenAi);
        let err = "llama".parse::<AgentBackend>().unwrap_err();
        assert!(err.to_string().contains("llama"));
    }

    #[test]
    fn test_api_key_var() {
        assert_eq!(AgentBackend::OpenAi.api_key_var(), "OPENAI_API_KEY");
        assert_eq!(AgentBackend::default().api_key_var(), "ANTHROPIC_API_KEY");
    }
}
