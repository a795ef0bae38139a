//! Transcript Extractor
//!
//! Finds the intent JSON the assistant embeds in its reply. The candidate is
//! everything from the first `{` to the last `}`; anything that fails to
//! parse means the reply was ordinary conversation.

use serde_json::Value as JsonValue;
use vox_intent_types::ExtractedIntent;

use crate::json_text::brace_span;

/// Extract an intent from a finalized assistant transcript.
///
/// `None` means "no intent detected": the transcript stays plain text.
/// Parsed JSON that is not a valid intent comes back as
/// `ExtractedIntent::Unrecognized` so it can be shown generically.
pub fn extract_intent(transcript: &str) -> Option<ExtractedIntent> {
    let candidate = brace_span(transcript)?;

    let value: JsonValue = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Transcript braces are not JSON ({}), treating as text", e);
            return None;
        }
    };

    let extracted = ExtractedIntent::from_value(value);
    match &extracted {
        ExtractedIntent::Recognized(intent) => {
            tracing::info!("Intent detected: {}", intent.summary())
        }
        ExtractedIntent::Unrecognized { reason, .. } => {
            tracing::warn!("Unrecognized intent payload: {}", reason)
        }
    }
    Some(extracted)
}
