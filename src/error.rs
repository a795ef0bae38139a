//! Pipeline error taxonomy.
//!
//! None of these escape the pipeline as panics or task failures. The
//! extractor turns the first two into a plain-text or fallback render, the
//! dispatcher turns `ExecutorInvocation` into a `fail` phase, and result
//! classification failures are absorbed inside the interpreter.

use thiserror::Error;

use crate::conversation::MessageId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// No JSON object in the transcript, or it did not parse
    #[error("no intent found in transcript")]
    MalformedTranscript,

    /// JSON parsed but the discriminant or its fields are not usable
    #[error("unrecognized intent: {0}")]
    UnrecognizedIntent(String),

    /// The executor call errored, panicked or timed out
    #[error("executor invocation failed: {0}")]
    ExecutorInvocation(String),

    /// A classification task died before producing a result
    #[error("result classification failed: {0}")]
    Classification(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown message {0}")]
    UnknownMessage(MessageId),

    #[error("message {0} is not streaming")]
    NotStreaming(MessageId),
}
