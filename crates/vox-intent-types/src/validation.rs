//! Field-level validation for intents.
//!
//! Serde guarantees presence and primitive type; this module checks the
//! values themselves so a half-filled intent is never rendered or executed.

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

use crate::intent::{BalanceIntent, Intent, IntentKind};

/// Why a JSON document could not be accepted as an `Intent`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentValidationError {
    #[error("intent payload is not a JSON object")]
    NotAnObject,

    #[error("missing `intent` discriminant")]
    MissingDiscriminant,

    #[error("`intent` discriminant is not a string")]
    DiscriminantNotString,

    #[error("unknown intent `{0}`")]
    UnknownKind(String),

    #[error("invalid {kind} intent: {reason}")]
    InvalidFields { kind: IntentKind, reason: String },

    #[error("{kind} intent field `{field}` is empty")]
    EmptyField {
        kind: IntentKind,
        field: &'static str,
    },

    #[error("{kind} intent amount `{amount}` is not a non-negative decimal")]
    InvalidAmount { kind: IntentKind, amount: String },

    #[error("{kind} intent amount `{amount}` has more than 28 significant digits")]
    AmountOutOfRange { kind: IntentKind, amount: String },
}

/// Digits with an optional fraction: no sign, exponent or grouping
static PLAIN_DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(?:\.[0-9]+)?$").unwrap());

impl Intent {
    /// Check required values for the active variant.
    pub fn validate(&self) -> Result<(), IntentValidationError> {
        let kind = self.kind();
        match self {
            Intent::Bridge(b) => {
                check_amount(kind, &b.amount)?;
                check_non_empty(kind, "asset", &b.asset)?;
                check_non_empty(kind, "fromNetwork", &b.from_network)?;
                check_non_empty(kind, "toNetwork", &b.to_network)
            }
            Intent::Transfer(t) => {
                check_amount(kind, &t.amount)?;
                check_non_empty(kind, "asset", &t.asset)?;
                check_non_empty(kind, "receiverAddress", &t.receiver_address)?;
                check_non_empty(kind, "chain", &t.chain)
            }
            Intent::Swap(s) => {
                check_amount(kind, &s.amount)?;
                check_non_empty(kind, "fromToken", &s.from_token)?;
                check_non_empty(kind, "toToken", &s.to_token)?;
                check_non_empty(kind, "chain", &s.chain)
            }
            Intent::Balance(b) => check_balance_filters(b),
        }
    }
}

fn check_non_empty(
    kind: IntentKind,
    field: &'static str,
    value: &str,
) -> Result<(), IntentValidationError> {
    if value.trim().is_empty() {
        return Err(IntentValidationError::EmptyField { kind, field });
    }
    Ok(())
}

/// Amounts are plain decimal strings that fit a `Decimal`.
fn check_amount(kind: IntentKind, amount: &str) -> Result<(), IntentValidationError> {
    let trimmed = amount.trim();
    if !PLAIN_DECIMAL_RE.is_match(trimmed) {
        return Err(IntentValidationError::InvalidAmount {
            kind,
            amount: amount.to_string(),
        });
    }
    Decimal::from_str(trimmed)
        .map(|_| ())
        .map_err(|_| IntentValidationError::AmountOutOfRange {
            kind,
            amount: amount.to_string(),
        })
}

fn check_balance_filters(b: &BalanceIntent) -> Result<(), IntentValidationError> {
    let kind = IntentKind::Balance;
    if let Some(address) = &b.address {
        check_non_empty(kind, "address", address)?;
    }
    if let Some(chain) = &b.chain {
        check_non_empty(kind, "chain", chain)?;
    }
    for token in &b.tokens {
        check_non_empty(kind, "tokens", token)?;
    }
    Ok(())
}
