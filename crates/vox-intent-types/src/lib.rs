//! Intent schema for the vox-intents pipeline
//!
//! This crate provides the data contract shared by every stage of the pipeline:
//! - `Intent` - the tagged union of supported blockchain actions
//! - `ExtractedIntent` - a validated intent or an opaque fallback payload
//! - `NormalizedResult` - the strict outcome derived from an executor result
//!
//! These types live in their own crate so the extractor, the interpreter and
//! the widget layer can share them without depending on each other.

mod intent;
mod result;
mod validation;

pub use intent::{
    BalanceIntent, BridgeIntent, ExtractedIntent, Intent, IntentKind, SwapIntent, TransferIntent,
};
pub use result::{InterpretPolicy, NormalizedResult, ResultStatus};
pub use validation::IntentValidationError;
