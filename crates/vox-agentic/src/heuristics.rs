//! Deterministic result classification
//!
//! Keyword and pattern rules used when no language model is configured, plus
//! the shared readers for JSON-shaped results and classifier replies.

use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use vox_intent_types::{InterpretPolicy, NormalizedResult, ResultStatus};

// =============================================================================
// PATTERNS
// =============================================================================

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>()\[\]{}]+"#).unwrap());

/// Failure words that are explicitly denied: "no errors", "did not fail"
static NEGATED_FAILURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:no|without|zero|0)\s+(?:errors?|failures?|issues?|problems?)\b|\b(?:did not|didn't|never)\s+fail(?:ed)?\b",
    )
    .unwrap()
});

/// Wording that reports an unsuccessful outcome. Outweighs any success
/// wording, so "unsuccessful" never reads as success.
static FAILURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(fail(s|ed|ure)?|error(s|ed)?|insufficient|revert(s|ed)?|unable|could not|couldn't|rejected|denied|not enough|unsuccessful|timed out|aborted)\b",
    )
    .unwrap()
});

/// Negative wording that only means failure when nothing reports success
static CAUTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(cannot|can't|invalid|warning)\b").unwrap());

static SUCCESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(success|successful|successfully|succeeded|complete|completed|confirmed|sent|transferred|bridged|swapped|executed)\b",
    )
    .unwrap()
});

static BALANCE_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bbalances?\b").unwrap());

/// Splits balance text into amounts, words and separators. Amounts use
/// optional thousands grouping: `120.5`, `1,250.75`.
static BALANCE_PIECE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<amount>(?:[0-9]{1,3}(?:,[0-9]{3})+|[0-9]+)(?:\.[0-9]+)?)|(?P<word>[A-Za-z][A-Za-z0-9]*)|(?P<assign>[:=])|\S",
    )
    .unwrap()
});

/// Keys that describe the result rather than name a token
const NON_TOKEN_KEYS: &[&str] = &[
    "status", "intent", "message", "address", "wallet", "network", "chain", "balance",
    "balances", "total", "id", "error", "networkid", "result", "output",
];

/// Tickers recognized in any letter case
const KNOWN_TICKERS: &[&str] = &[
    "ETH", "WETH", "CBETH", "STETH", "WSTETH", "USDC", "USDT", "DAI", "EURC", "BTC", "WBTC",
    "CBBTC", "SOL", "MATIC", "POL", "OP", "ARB", "LINK", "UNI", "AERO", "DEGEN",
];

/// Upper-case words that are not tickers
const NON_TICKER_WORDS: &[&str] = &["TX", "OK", "URL", "API", "ENS", "NFT", "ABI", "RPC"];

fn is_token_key(key: &str) -> bool {
    !NON_TOKEN_KEYS.contains(&key.to_lowercase().as_str())
}

// =============================================================================
// FREE-TEXT CLASSIFICATION
// =============================================================================

/// Classify free text under the given policy.
pub fn classify_text(policy: InterpretPolicy, text: &str) -> NormalizedResult {
    match policy {
        InterpretPolicy::Transaction => classify_transaction_text(text),
        InterpretPolicy::Balance => classify_balance_text(text),
    }
}

/// Failure wording beats success wording. Caution wording ("cannot",
/// "invalid") only fails a result that reports no success.
fn classify_transaction_text(text: &str) -> NormalizedResult {
    let signals = NEGATED_FAILURE_RE.replace_all(text, " ");
    if FAILURE_RE.is_match(&signals) {
        return NormalizedResult::failed(InterpretPolicy::Transaction);
    }
    let reported_success = SUCCESS_RE.is_match(&signals);
    if CAUTION_RE.is_match(&signals) && !reported_success {
        return NormalizedResult::failed(InterpretPolicy::Transaction);
    }
    let url = find_transaction_url(text);
    if reported_success || url.is_some() {
        NormalizedResult::transaction_ok(url)
    } else {
        NormalizedResult::failed(InterpretPolicy::Transaction)
    }
}

fn classify_balance_text(text: &str) -> NormalizedResult {
    let signals = NEGATED_FAILURE_RE.replace_all(text, " ");
    if FAILURE_RE.is_match(&signals) {
        return NormalizedResult::failed(InterpretPolicy::Balance);
    }
    let balances = balances_from_text(text);
    if !balances.is_empty() {
        return NormalizedResult::balances_ok(balances);
    }
    if !CAUTION_RE.is_match(&signals) && BALANCE_WORD_RE.is_match(&signals) {
        NormalizedResult::balances_ok(balances)
    } else {
        NormalizedResult::failed(InterpretPolicy::Balance)
    }
}

/// Best transaction link in the text: explorer `/tx/` links win over any
/// other URL.
pub fn find_transaction_url(text: &str) -> Option<String> {
    let urls: Vec<&str> = URL_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']))
        .collect();
    urls.iter()
        .find(|u| u.contains("/tx/") || u.contains("/transaction"))
        .or_else(|| urls.first())
        .map(|u| u.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Amount(String),
    Ticker(String),
    /// "balance" between a ticker and its separator
    Filler,
    Assign,
    Other,
}

fn balance_pieces(text: &str) -> Vec<Piece> {
    BALANCE_PIECE_RE
        .captures_iter(text)
        .map(|caps| {
            if let Some(m) = caps.name("amount") {
                return if stands_alone(text, m.start(), m.end()) {
                    Piece::Amount(m.as_str().to_string())
                } else {
                    Piece::Other
                };
            }
            if let Some(m) = caps.name("word") {
                let word = m.as_str();
                if BALANCE_WORD_RE.is_match(word) {
                    return Piece::Filler;
                }
                return ticker(word).map_or(Piece::Other, Piece::Ticker);
            }
            if caps.name("assign").is_some() {
                Piece::Assign
            } else {
                Piece::Other
            }
        })
        .collect()
}

/// An amount glued to letters or to more digits (`0x1f`, `1.2.3`) is not an
/// amount.
fn stands_alone(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    let digit_at = |i: Option<usize>| {
        i.and_then(|i| bytes.get(i))
            .is_some_and(|b| b.is_ascii_digit())
    };
    let joined = |neighbour: Option<u8>, beyond: Option<usize>| match neighbour {
        Some(b) if b.is_ascii_alphanumeric() => true,
        Some(b'.' | b',') => digit_at(beyond),
        _ => false,
    };
    let before = start.checked_sub(1).and_then(|i| bytes.get(i)).copied();
    !joined(before, start.checked_sub(2)) && !joined(bytes.get(end).copied(), Some(end + 1))
}

/// Upper-cased ticker for a word that names a token
fn ticker(word: &str) -> Option<String> {
    let upper = word.to_ascii_uppercase();
    if KNOWN_TICKERS.contains(&upper.as_str()) {
        return Some(upper);
    }
    if !(2..=10).contains(&word.len())
        || NON_TICKER_WORDS.contains(&upper.as_str())
        || !is_token_key(word)
    {
        return None;
    }
    let capitals = word.chars().filter(char::is_ascii_uppercase).count();
    let lower = word.chars().filter(char::is_ascii_lowercase).count();
    (capitals >= 2 && capitals >= lower).then_some(upper)
}

/// Token balances written as `USDC: 120.5`, `ETH balance = 0.3`,
/// `120.5 USDC` or `USDC 120.5`.
fn balances_from_text(text: &str) -> BTreeMap<String, String> {
    let pieces = balance_pieces(text);
    let mut taken = vec![false; pieces.len()];
    let mut balances = BTreeMap::new();

    for (i, piece) in pieces.iter().enumerate() {
        let Piece::Ticker(token) = piece else {
            continue;
        };
        let mut j = i + 1;
        while pieces.get(j) == Some(&Piece::Filler) {
            j += 1;
        }
        if pieces.get(j) != Some(&Piece::Assign) {
            continue;
        }
        if let Some(Piece::Amount(amount)) = pieces.get(j + 1) {
            balances
                .entry(token.clone())
                .or_insert_with(|| amount.clone());
            taken[i] = true;
            taken[j + 1] = true;
        }
    }

    // Bare pairs follow whichever order the text uses first
    let ticker_first = pieces
        .iter()
        .zip(&taken)
        .filter(|(_, used)| !**used)
        .find_map(|(piece, _)| match piece {
            Piece::Ticker(_) => Some(true),
            Piece::Amount(_) => Some(false),
            _ => None,
        })
        .unwrap_or(true);
    for order in [ticker_first, !ticker_first] {
        pair_adjacent(&pieces, &mut taken, order, &mut balances);
    }
    balances
}

fn pair_adjacent(
    pieces: &[Piece],
    taken: &mut [bool],
    ticker_first: bool,
    balances: &mut BTreeMap<String, String>,
) {
    for i in 1..pieces.len() {
        if taken[i - 1] || taken[i] {
            continue;
        }
        let (token, amount) = match (&pieces[i - 1], &pieces[i], ticker_first) {
            (Piece::Ticker(token), Piece::Amount(amount), true)
            | (Piece::Amount(amount), Piece::Ticker(token), false) => (token, amount),
            _ => continue,
        };
        balances
            .entry(token.clone())
            .or_insert_with(|| amount.clone());
        taken[i - 1] = true;
        taken[i] = true;
    }
}

// =============================================================================
// JSON-SHAPED RESULTS
// =============================================================================

/// Why a JSON reply could not be turned into a result
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyShapeError {
    #[error("reply has no usable `status`")]
    MissingStatus,
    #[error("unrecognized status `{0}`")]
    UnknownStatus(String),
}

pub fn parse_status(value: &JsonValue) -> Result<ResultStatus, ReplyShapeError> {
    match value {
        JsonValue::String(s) => match s.trim().to_lowercase().as_str() {
            "success" | "succeeded" | "ok" => Ok(ResultStatus::Success),
            "fail" | "failed" | "failure" | "error" => Ok(ResultStatus::Fail),
            other => Err(ReplyShapeError::UnknownStatus(other.to_string())),
        },
        JsonValue::Bool(true) => Ok(ResultStatus::Success),
        JsonValue::Bool(false) => Ok(ResultStatus::Fail),
        _ => Err(ReplyShapeError::MissingStatus),
    }
}

/// Read a JSON object (executor output or classifier reply) under a policy.
///
/// Balance objects without `status` succeed when they carry any balances.
/// Transaction objects must carry a `status`.
pub fn from_json_object(
    policy: InterpretPolicy,
    object: &Map<String, JsonValue>,
) -> Result<NormalizedResult, ReplyShapeError> {
    match policy {
        InterpretPolicy::Balance => balance_from_object(object),
        InterpretPolicy::Transaction => transaction_from_object(object),
    }
}

fn balance_from_object(
    object: &Map<String, JsonValue>,
) -> Result<NormalizedResult, ReplyShapeError> {
    let balances = match object.get("balances") {
        Some(nested) => balances_from_value(nested),
        None => balances_from_entries(object),
    };
    let status = match object.get("status") {
        Some(value) => parse_status(value)?,
        None if balances.is_empty() => return Err(ReplyShapeError::MissingStatus),
        None => ResultStatus::Success,
    };
    Ok(match status {
        ResultStatus::Success => NormalizedResult::balances_ok(balances),
        ResultStatus::Fail => NormalizedResult::failed(InterpretPolicy::Balance),
    })
}

fn transaction_from_object(
    object: &Map<String, JsonValue>,
) -> Result<NormalizedResult, ReplyShapeError> {
    let status = parse_status(object.get("status").ok_or(ReplyShapeError::MissingStatus)?)?;
    if !status.is_success() {
        return Ok(NormalizedResult::failed(InterpretPolicy::Transaction));
    }
    let url = ["transactionUrl", "txnUrl", "txUrl", "transactionLink", "url"]
        .iter()
        .find_map(|key| object.get(*key).and_then(JsonValue::as_str))
        .map(str::trim)
        .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
        .map(str::to_string);
    Ok(NormalizedResult::transaction_ok(url))
}

fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn balances_from_entries(object: &Map<String, JsonValue>) -> BTreeMap<String, String> {
    object
        .iter()
        .filter(|(key, _)| is_token_key(key))
        .filter_map(|(key, value)| scalar_text(value).map(|v| (key.clone(), v)))
        .collect()
}

/// `balances` may be a map, a list of `{token, balance}` objects, or a list
/// of strings such as `"USDC: 120.5"`.
fn balances_from_value(value: &JsonValue) -> BTreeMap<String, String> {
    match value {
        JsonValue::Object(map) => balances_from_entries(map),
        JsonValue::Array(items) => {
            let mut balances = BTreeMap::new();
            for item in items {
                match item {
                    JsonValue::Object(entry) => {
                        let token = ["token", "asset", "symbol", "currency"]
                            .iter()
                            .find_map(|k| entry.get(*k).and_then(JsonValue::as_str));
                        let amount = ["balance", "amount", "value"]
                            .iter()
                            .find_map(|k| entry.get(*k).and_then(scalar_text));
                        match (token, amount) {
                            (Some(token), Some(amount)) => {
                                balances.insert(token.to_string(), amount);
                            }
                            _ => balances.extend(balances_from_entries(entry)),
                        }
                    }
                    JsonValue::String(s) => balances.extend(balances_from_text(s)),
                    _ => {}
                }
            }
            balances
        }
        _ => BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_success_with_explorer_link() {
        let result = classify_text(
            InterpretPolicy::Transaction,
            "Transaction successful: https://basescan.org/tx/0xabc123",
        );
        assert_eq!(
            result,
            NormalizedResult::transaction_ok(Some("https://basescan.org/tx/0xabc123".to_string()))
        );
    }

    #[test]
    fn test_failure_wording() {
        let result = classify_text(
            InterpretPolicy::Transaction,
            "Transaction failed due to insufficient gas",
        );
        assert_eq!(result, NormalizedResult::failed(InterpretPolicy::Transaction));
    }

    #[test]
    fn test_success_without_reference() {
        let result = classify_text(InterpretPolicy::Transaction, "Swap completed.");
        assert_eq!(result, NormalizedResult::transaction_ok(None));
    }

    #[test]
    fn test_unsuccessful_is_failure() {
        let result = classify_text(
            InterpretPolicy::Transaction,
            "The transfer was unsuccessful, see https://basescan.org/tx/0x1",
        );
        assert!(!result.is_success());
        assert_eq!(result.transaction_url(), None);
    }

    #[test]
    fn test_no_signal_is_failure() {
        let result = classify_text(InterpretPolicy::Transaction, "I am thinking about it");
        assert!(!result.is_success());
    }

    #[test]
    fn test_prefers_tx_link_and_trims_punctuation() {
        let text = "Docs at https://docs.base.org. Bridged! See https://sepolia.basescan.org/tx/0xdef.";
        assert_eq!(
            find_transaction_url(text).as_deref(),
            Some("https://sepolia.basescan.org/tx/0xdef")
        );
    }

    #[test]
    fn test_balance_text() {
        let result = classify_text(
            InterpretPolicy::Balance,
            "Your wallet balance: 0.3 ETH and 120.5 USDC",
        );
        let balances = result.balances().unwrap();
        assert!(result.is_success());
        assert_eq!(balances.get("ETH").map(String::as_str), Some("0.3"));
        assert_eq!(balances.get("USDC").map(String::as_str), Some("120.5"));
        assert!(!balances.contains_key("balance"));
    }

    #[test]
    fn test_balance_colon_pairs() {
        let result = classify_text(InterpretPolicy::Balance, "USDC: 120.5\nETH balance: 0.3");
        let balances = result.balances().unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances["ETH"], "0.3");
    }

    #[test]
    fn test_negated_failure_is_success() {
        let result = classify_text(
            InterpretPolicy::Transaction,
            "Successfully transferred 5 USDC to vitalik.eth with no errors. https://basescan.org/tx/0xabc",
        );
        assert_eq!(
            result,
            NormalizedResult::transaction_ok(Some("https://basescan.org/tx/0xabc".to_string()))
        );
    }

    #[test]
    fn test_caution_wording_does_not_outweigh_success() {
        let result = classify_text(
            InterpretPolicy::Transaction,
            "Bridge initiated successfully. Note: you cannot cancel it once submitted. https://basescan.org/tx/0x1",
        );
        assert!(result.is_success());
        assert_eq!(result.transaction_url(), Some("https://basescan.org/tx/0x1"));

        let result = classify_text(InterpretPolicy::Transaction, "Cannot bridge to that network");
        assert!(!result.is_success());
    }

    #[test]
    fn test_failure_beats_success_wording() {
        let result = classify_text(
            InterpretPolicy::Transaction,
            "Approval confirmed but the swap reverted: https://basescan.org/tx/0x2",
        );
        assert_eq!(result, NormalizedResult::failed(InterpretPolicy::Transaction));
    }

    #[test]
    fn test_balance_ticker_before_amount() {
        let result = classify_text(InterpretPolicy::Balance, "USDC 120.5, ETH 0.3");
        let expected: BTreeMap<String, String> = [("USDC", "120.5"), ("ETH", "0.3")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(result, NormalizedResult::balances_ok(expected));

        let result = classify_text(InterpretPolicy::Balance, "Wallet holds: ETH 0.3");
        assert!(result.is_success());
        assert_eq!(result.balances().unwrap()["ETH"], "0.3");
        assert_eq!(result.balances().unwrap().len(), 1);
    }

    #[test]
    fn test_balance_lowercase_tickers() {
        let result = classify_text(InterpretPolicy::Balance, "You have 120.5 usdc and 0.3 eth");
        assert!(result.is_success());
        let balances = result.balances().unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances["USDC"], "120.5");
        assert_eq!(balances["ETH"], "0.3");
    }

    #[test]
    fn test_balance_grouped_amounts() {
        let result = classify_text(InterpretPolicy::Balance, "USDC: 1,250.75 and 12,5 DAI");
        let balances = result.balances().unwrap();
        assert_eq!(balances["USDC"], "1,250.75");
        assert!(!balances.contains_key("DAI"));

        let result = classify_text(InterpretPolicy::Balance, "Balance check for 0x12 ETH");
        assert!(result.balances().unwrap().is_empty());
    }

    #[test]
    fn test_balance_error_text() {
        let result = classify_text(InterpretPolicy::Balance, "Error fetching wallet balance");
        assert_eq!(result, NormalizedResult::failed(InterpretPolicy::Balance));
    }

    #[test]
    fn test_balance_object_strips_status() {
        let result = from_json_object(
            InterpretPolicy::Balance,
            &object(json!({"status": "success", "USDC": "120.5", "ETH": "0.3"})),
        )
        .unwrap();
        let expected: BTreeMap<String, String> = [("USDC", "120.5"), ("ETH", "0.3")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(result, NormalizedResult::balances_ok(expected));
    }

    #[test]
    fn test_balance_reply_list_shapes() {
        let result = from_json_object(
            InterpretPolicy::Balance,
            &object(json!({
                "status": "success",
                "balances": ["USDC: 10", {"token": "ETH", "balance": 0.5}]
            })),
        )
        .unwrap();
        let balances = result.balances().unwrap();
        assert_eq!(balances["USDC"], "10");
        assert_eq!(balances["ETH"], "0.5");
    }

    #[test]
    fn test_balance_reply_fail_clears_balances() {
        let result = from_json_object(
            InterpretPolicy::Balance,
            &object(json!({"status": "fail", "balances": {"ETH": "1"}})),
        )
        .unwrap();
        assert_eq!(result, NormalizedResult::failed(InterpretPolicy::Balance));
    }

    #[test]
    fn test_transaction_reply_requires_status() {
        let err = from_json_object(
            InterpretPolicy::Transaction,
            &object(json!({"txnUrl": "https://x/tx/1"})),
        )
        .unwrap_err();
        assert_eq!(err, ReplyShapeError::MissingStatus);
    }

    #[test]
    fn test_transaction_reply_url_keys() {
        let result = from_json_object(
            InterpretPolicy::Transaction,
            &object(json!({"status": "success", "txnUrl": "https://basescan.org/tx/0x9"})),
        )
        .unwrap();
        assert_eq!(result.transaction_url(), Some("https://basescan.org/tx/0x9"));

        let result = from_json_object(
            InterpretPolicy::Transaction,
            &object(json!({"status": "success", "txnUrl": "url"})),
        )
        .unwrap();
        assert_eq!(result.transaction_url(), None);
    }

    #[test]
    fn test_unknown_status() {
        assert_eq!(
            parse_status(&json!("pending")),
            Err(ReplyShapeError::UnknownStatus("pending".to_string()))
        );
        assert_eq!(parse_status(&json!(true)), Ok(ResultStatus::Success));
    }
}
