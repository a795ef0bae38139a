//! Result Interpreter
//!
//! Turns whatever the executor returned into a `NormalizedResult`. This is
//! the single place that parses executor output defensively; everything
//! downstream consumes only the normalized shape.
//!
//! ## Classification order
//!
//! ```text
//! raw ──► JSON object? ──yes──► read status/balances/url directly
//!             │ no
//!             ▼
//!      classifier set? ──yes──► LLM reply ──► defensive JSON parse
//!             │ no
//!             ▼
//!      keyword / pattern rules
//! ```
//!
//! `interpret` never fails: every error collapses to
//! `NormalizedResult::failed(policy)`. Results are memoized per
//! `(policy, raw)` so the same input always yields the same output, even
//! when a language model does the classifying. The memo holds at most
//! `MEMO_CAPACITY` results and evicts the oldest first. The dispatcher gives
//! every widget its own [`ResultInterpreter::fork`], so nothing is shared
//! between intents.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use vox_intent_types::{InterpretPolicy, NormalizedResult};

use crate::heuristics::{self, ReplyShapeError};
use crate::json_text::{brace_span, strip_code_fences};
use crate::llm_client::{truncate_for_log, LlmClient};

const CLASSIFIER_SYSTEM_PROMPT: &str = "You read the output of a blockchain agent and report \
whether the requested action succeeded. Reply with one JSON object and nothing else.";

/// Classification collaborator: prompt in, (hopefully) JSON out.
#[async_trait]
pub trait ResultClassifier: Send + Sync {
    async fn classify(&self, prompt: &str) -> Result<String>;
}

/// `ResultClassifier` backed by the session's LLM client
pub struct LlmResultClassifier {
    client: Arc<dyn LlmClient>,
}

impl LlmResultClassifier {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResultClassifier for LlmResultClassifier {
    async fn classify(&self, prompt: &str) -> Result<String> {
        self.client.chat_json(CLASSIFIER_SYSTEM_PROMPT, prompt).await
    }
}

/// Reasons a raw result could not be classified. Never leaves this module
/// except through logs.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("executor result is empty")]
    EmptyResult,

    #[error("classifier call failed: {0}")]
    Classifier(#[source] anyhow::Error),

    #[error("classifier reply is not a JSON object: {0}")]
    UnparseableReply(String),

    #[error("classifier reply has the wrong shape: {0}")]
    ReplyShape(#[from] ReplyShapeError),
}

/// Prompt sent to the classifier for a raw executor result
pub fn classification_prompt(policy: InterpretPolicy, raw: &str) -> String {
    match policy {
        InterpretPolicy::Transaction => format!(
            r#"Decide whether this agent output reports a successful or a failed transaction.
A success may or may not include a transaction link; a failure never carries one.
Respond with {{"status": "success" | "fail", "txnUrl": "<explorer url>" or null}}.
Do not wrap the JSON in backticks.

Agent output:
"{raw}""#
        ),
        InterpretPolicy::Balance => format!(
            r#"Decide whether this agent output reports wallet balances.
If it does, respond with {{"status": "success", "balances": {{"<TOKEN>": "<amount>", ...}}}}.
Otherwise respond with {{"status": "fail", "balances": {{}}}}.
Do not wrap the JSON in backticks.

Agent output:
"{raw}""#
        ),
    }
}

/// Results remembered per interpreter
pub const MEMO_CAPACITY: usize = 32;

type MemoKey = (InterpretPolicy, String);

/// Insertion-ordered map of past results, oldest evicted first
#[derive(Default)]
struct Memo {
    entries: HashMap<MemoKey, NormalizedResult>,
    order: VecDeque<MemoKey>,
}

impl Memo {
    fn get(&self, key: &MemoKey) -> Option<NormalizedResult> {
        self.entries.get(key).cloned()
    }

    /// Store a result unless one is already there; returns the stored one.
    fn insert(
        &mut self,
        key: MemoKey,
        result: NormalizedResult,
        capacity: usize,
    ) -> NormalizedResult {
        if let Some(existing) = self.entries.get(&key) {
            return existing.clone();
        }
        while self.order.len() >= capacity.max(1) {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, result.clone());
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct ResultInterpreter {
    classifier: Option<Arc<dyn ResultClassifier>>,
    memo: Mutex<Memo>,
    capacity: usize,
}

impl ResultInterpreter {
    /// Interpreter using only the deterministic rules
    pub fn heuristic() -> Self {
        Self::build(None)
    }

    /// Interpreter that delegates free text to a classifier
    pub fn with_classifier(classifier: Arc<dyn ResultClassifier>) -> Self {
        Self::build(Some(classifier))
    }

    fn build(classifier: Option<Arc<dyn ResultClassifier>>) -> Self {
        Self {
            classifier,
            memo: Mutex::new(Memo::default()),
            capacity: MEMO_CAPACITY,
        }
    }

    pub fn with_memo_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Same classifier and memo size, nothing remembered yet
    pub fn fork(&self) -> Self {
        Self {
            classifier: self.classifier.clone(),
            memo: Mutex::new(Memo::default()),
            capacity: self.capacity,
        }
    }

    /// Classify a raw executor result. Never fails.
    pub async fn interpret(&self, policy: InterpretPolicy, raw: &str) -> NormalizedResult {
        let key = (policy, raw.to_string());
        if let Some(cached) = self.memo.lock().await.get(&key) {
            return cached;
        }

        let result = match self.try_interpret(policy, raw).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Result classification failed, reporting fail: {}", e);
                NormalizedResult::failed(policy)
            }
        };

        // A concurrent call may have raced us; the first stored answer wins.
        self.memo.lock().await.insert(key, result, self.capacity)
    }

    async fn try_interpret(
        &self,
        policy: InterpretPolicy,
        raw: &str,
    ) -> Result<NormalizedResult, ClassificationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ClassificationError::EmptyResult);
        }

        if let Some(structured) = structured_result(policy, trimmed) {
            tracing::debug!("Executor result is structured JSON");
            return structured;
        }

        match &self.classifier {
            Some(classifier) => {
                let reply = classifier
                    .classify(&classification_prompt(policy, trimmed))
                    .await
                    .map_err(ClassificationError::Classifier)?;
                tracing::debug!("Classifier reply: {}", truncate_for_log(&reply, 1000));
                parse_classifier_reply(policy, &reply)
            }
            None => Ok(heuristics::classify_text(policy, trimmed)),
        }
    }
}

/// Executor output that is itself a JSON object is read directly.
///
/// Returns `None` when the output is not JSON, or is a transaction object
/// without a `status` (that falls back to text classification).
fn structured_result(
    policy: InterpretPolicy,
    raw: &str,
) -> Option<Result<NormalizedResult, ClassificationError>> {
    let value: JsonValue = serde_json::from_str(strip_code_fences(raw)).ok()?;
    let object = value.as_object()?;
    match heuristics::from_json_object(policy, object) {
        Ok(result) => Some(Ok(result)),
        Err(ReplyShapeError::MissingStatus) => None,
        Err(e) => Some(Err(e.into())),
    }
}

/// Parse a classifier reply, tolerating code fences and surrounding prose.
pub fn parse_classifier_reply(
    policy: InterpretPolicy,
    reply: &str,
) -> Result<NormalizedResult, ClassificationError> {
    let unfenced = strip_code_fences(reply);
    let candidate = brace_span(unfenced)
        .ok_or_else(|| ClassificationError::UnparseableReply(unfenced.to_string()))?;
    let value: JsonValue = serde_json::from_str(candidate)
        .map_err(|e| ClassificationError::UnparseableReply(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ClassificationError::UnparseableReply(candidate.to_string()))?;
    Ok(heuristics::from_json_object(policy, object)?)
}
