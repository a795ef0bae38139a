//! Helpers for pulling JSON out of model-written text.

/// Span from the first `{` to the last `}` inclusive.
///
/// Returns `None` when either brace is missing or they are out of order.
pub fn brace_span(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let close = text.rfind('}')?;
    if open < close {
        Some(&text[open..=close])
    } else {
        None
    }
}

/// Remove a surrounding markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop the info string (`json`, `JSON`, ...) on the opening line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}
