//! Intent Assistant
//!
//! Text-chat stand-in for the realtime voice model: keeps the conversation
//! history and asks the LLM for the next assistant reply. Replies may embed
//! an intent JSON object, which the transcript extractor picks up.

use anyhow::Result;
use std::sync::Arc;

use crate::llm_client::{ChatTurn, LlmClient};

/// Default behaviour prompt for the assistant
pub const ASSISTANT_INSTRUCTIONS: &str = r#"You help users move crypto assets: bridging between networks, transferring to an address or ENS name, swapping tokens, and checking wallet balances.

Keep answers short. Ask only for what is missing:
- bridge: amount, asset, source network, destination network
- transfer: amount, asset, receiver address or ENS name, chain
- swap: amount, token to sell, token to buy, chain
- balance: nothing

Once everything is known, reply with exactly one JSON object describing the request and no other text. Amounts are strings. Shapes:
{"intent": "bridge", "amount": "<amount>", "asset": "<asset>", "fromNetwork": "<network>", "toNetwork": "<network>"}
{"intent": "transfer", "amount": "<amount>", "asset": "<asset>", "receiverAddress": "<address or ENS>", "chain": "<chain>"}
{"intent": "swap", "amount": "<amount>", "fromToken": "<token>", "toToken": "<token>", "chain": "<chain>"}
{"intent": "balance"}

Never write the word "json" or use code fences. Never ask for private keys. Answer in the language the user speaks."#;

pub struct IntentAssistant {
    client: Arc<dyn LlmClient>,
    instructions: String,
    history: Vec<ChatTurn>,
}

impl IntentAssistant {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self::with_instructions(client, ASSISTANT_INSTRUCTIONS)
    }

    pub fn with_instructions(client: Arc<dyn LlmClient>, instructions: &str) -> Self {
        Self {
            client,
            instructions: instructions.to_string(),
            history: Vec::new(),
        }
    }

    /// Send a user message and return the assistant's full reply.
    ///
    /// The user turn is dropped again if the model call fails, so a retry
    /// does not duplicate it.
    pub async fn respond(&mut self, user_text: &str) -> Result<String> {
        self.history.push(ChatTurn::user(user_text));
        match self.client.converse(&self.instructions, &self.history).await {
            Ok(reply) => {
                self.history.push(ChatTurn::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{ChatRequest, ChatRole};
    use async_trait::async_trait;

    struct EchoClient {
        fail: bool,
    }

    #[async_trait]
    impl LlmClient for EchoClient {
        async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
            if self.fail {
                anyhow::bail!("offline");
            }
            Ok(format!("turns={}", request.turns.len()))
        }

        fn model_name(&self) -> &str {
            "echo"
        }

        fn provider_name(&self) -> &str {
            "test"
        }
    }

    #[tokio::test]
    async fn test_history_accumulates() {
        let mut assistant = IntentAssistant::new(Arc::new(EchoClient { fail: false }));
        assert_eq!(assistant.respond("hi").await.unwrap(), "turns=1");
        assert_eq!(assistant.respond("bridge 10 USDC").await.unwrap(), "turns=3");
        assert_eq!(assistant.history().len(), 4);
        assert_eq!(assistant.history()[1].role, ChatRole::Assistant);
        assistant.reset();
        assert!(assistant.history().is_empty());
    }

    #[tokio::test]
    async fn test_failed_call_rolls_back_turn() {
        let mut assistant = IntentAssistant::new(Arc::new(EchoClient { fail: true }));
        assert!(assistant.respond("hello").await.is_err());
        assert!(assistant.history().is_empty());
    }

    struct PromptEcho;

    #[async_trait]
    impl LlmClient for PromptEcho {
        async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
            Ok(request.system_prompt.to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }

        fn provider_name(&self) -> &str {
            "test"
        }
    }

    #[tokio::test]
    async fn test_custom_instructions_reach_model() {
        let mut assistant =
            IntentAssistant::with_instructions(Arc::new(PromptEcho), "Only bridges today.");
        assert_eq!(assistant.respond("hi").await.unwrap(), "Only bridges today.");

        let mut assistant = IntentAssistant::new(Arc::new(PromptEcho));
        assert_eq!(assistant.respond("hi").await.unwrap(), ASSISTANT_INSTRUCTIONS);
    }

    #[test]
    fn test_instructions_describe_every_intent() {
        for tag in ["bridge", "transfer", "swap", "balance"] {
            assert!(ASSISTANT_INSTRUCTIONS.contains(&format!("\"intent\": \"{}\"", tag)));
        }
    }
}
