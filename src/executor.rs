//! Agent executor
//!
//! The executor is the external agent that actually performs an intent
//! on-chain. It receives the serialized intent and answers with an opaque
//! output string which the widget later interprets.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;
use vox_agentic::llm_client::truncate_for_log;

/// Raw executor outcome, always a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorOutput {
    pub output: String,
}

impl ExecutorOutput {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }

    /// Read an executor response body.
    ///
    /// `{"output": "..."}` yields the string, any other `output` value is
    /// stringified, and a body without `output` is stringified whole.
    pub fn from_json(body: JsonValue) -> Self {
        let output = match body.get("output") {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Null) => String::new(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        };
        Self { output }
    }
}

#[async_trait]
pub trait IntentExecutor: Send + Sync {
    /// Run one serialized intent. Called at most once per intent occurrence.
    async fn invoke(&self, serialized_intent: &str) -> Result<ExecutorOutput>;

    fn name(&self) -> &str;
}

/// Executor reached over HTTP: `POST {"input": "<intent json>"}`
pub struct HttpAgentExecutor {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpAgentExecutor {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Client-side request timeout, on top of the dispatcher's own deadline
    pub fn with_timeout(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build executor HTTP client")?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl IntentExecutor for HttpAgentExecutor {
    async fn invoke(&self, serialized_intent: &str) -> Result<ExecutorOutput> {
        info!(endpoint = %self.endpoint, "Invoking agent executor");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({ "input": serialized_intent }))
            .send()
            .await
            .context("Failed to send request to agent executor")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read agent executor response")?;

        if !status.is_success() {
            return Err(anyhow!("Agent executor error ({}): {}", status, text));
        }

        debug!("Executor response: {}", truncate_for_log(&text, 1000));

        // Plain-text bodies are taken as the output itself
        Ok(match serde_json::from_str::<JsonValue>(&text) {
            Ok(body @ JsonValue::Object(_)) => ExecutorOutput::from_json(body),
            _ => ExecutorOutput::new(text),
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Stand-in used when no `EXECUTOR_URL` is configured; every call fails
pub struct UnconfiguredExecutor;

#[async_trait]
impl IntentExecutor for UnconfiguredExecutor {
    async fn invoke(&self, _serialized_intent: &str) -> Result<ExecutorOutput> {
        Err(anyhow!("no executor configured (set EXECUTOR_URL)"))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_string() {
        let out = ExecutorOutput::from_json(json!({"output": "Transaction successful"}));
        assert_eq!(out.output, "Transaction successful");
    }

    #[test]
    fn test_structured_output_is_stringified() {
        let out = ExecutorOutput::from_json(json!({"output": {"status": "success", "USDC": "1"}}));
        let back: JsonValue = serde_json::from_str(&out.output).unwrap();
        assert_eq!(back["USDC"], "1");
    }

    #[test]
    fn test_missing_output_key() {
        let out = ExecutorOutput::from_json(json!({"result": "ok"}));
        assert_eq!(out.output, r#"{"result":"ok"}"#);

        let out = ExecutorOutput::from_json(json!({"output": null}));
        assert!(out.output.is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_executor_fails() {
        let err = UnconfiguredExecutor.invoke("{}").await.unwrap_err();
        assert!(err.to_string().contains("EXECUTOR_URL"));
    }
}
