//! vox-intents
//!
//! Turns assistant transcripts into executed blockchain intents:
//!
//! ```text
//! finalized transcript ──► extract_intent ──► Dispatcher ──► IntentExecutor
//!                                                │                │
//!                                                ▼                ▼ raw output
//!                                          IntentWidget ◄── ResultInterpreter
//! ```
//!
//! The [`Conversation`] owns the transcript and one [`IntentWidget`] per intent
//! message. Widgets publish snapshots over watch channels; [`render`] turns a
//! snapshot into a text card.

pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod render;
pub mod widget;

pub use config::{ClassifierMode, SessionConfig};
pub use conversation::{Conversation, Finalized, Message, MessageId, MessageKind};
pub use dispatcher::Dispatcher;
pub use error::PipelineError;
pub use executor::{ExecutorOutput, HttpAgentExecutor, IntentExecutor, UnconfiguredExecutor};
pub use widget::{IntentWidget, Phase, WidgetId, WidgetSnapshot, WidgetView};

pub use vox_agentic::{extract_intent, ResultInterpreter};
pub use vox_intent_types::{ExtractedIntent, Intent, IntentKind, NormalizedResult, ResultStatus};

/// Strict extraction: a transcript must carry a valid, known intent.
pub fn recognize(transcript: &str) -> Result<Intent, PipelineError> {
    match extract_intent(transcript) {
        Some(ExtractedIntent::Recognized(intent)) => Ok(intent),
        Some(ExtractedIntent::Unrecognized { reason, .. }) => {
            Err(PipelineError::UnrecognizedIntent(reason))
        }
        None => Err(PipelineError::MalformedTranscript),
    }
}
