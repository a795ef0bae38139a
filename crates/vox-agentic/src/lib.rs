//! LLM collaborators for the vox-intents pipeline
//!
//! This crate holds everything that reads or writes model text:
//!
//! ```text
//! assistant reply ──► transcript::extract_intent ──► ExtractedIntent
//! executor output ──► ResultInterpreter::interpret ──► NormalizedResult
//! ```
//!
//! It has no knowledge of widgets or executors; the root crate wires it up.
//!
//! ## Backend Selection
//!
//! Set `AGENT_BACKEND` environment variable:
//! - `anthropic` (default): Anthropic Claude API
//! - `openai`: OpenAI API (or any compatible server via `OPENAI_BASE_URL`)

// LLM client abstraction
pub mod anthropic_client;
pub mod backend;
pub mod client_factory;
pub mod llm_client;
pub mod openai_client;

// Pipeline stages
pub mod assistant;
pub mod heuristics;
pub mod interpreter;
pub mod json_text;
pub mod transcript;

pub use assistant::IntentAssistant;
pub use backend::AgentBackend;
pub use client_factory::create_llm_client_for;
pub use interpreter::{LlmResultClassifier, ResultClassifier, ResultInterpreter};
pub use llm_client::{ChatTurn, LlmClient};
pub use transcript::extract_intent;
