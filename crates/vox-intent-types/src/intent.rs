//! Intent Types
//!
//! `Intent` is the structured form of a user's requested blockchain action.
//! The JSON discriminant is the `intent` key and field names are camelCase,
//! matching what the assistant is instructed to emit.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::result::InterpretPolicy;
use crate::validation::IntentValidationError;

/// A recognized intent. Exactly one variant is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "lowercase")]
pub enum Intent {
    /// Move an asset between networks
    Bridge(BridgeIntent),
    /// Send an asset to an address or ENS name
    Transfer(TransferIntent),
    /// Exchange one token for another on a single chain
    Swap(SwapIntent),
    /// Report wallet balances
    Balance(BalanceIntent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeIntent {
    pub amount: String,
    pub asset: String,
    pub from_network: String,
    pub to_network: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferIntent {
    pub amount: String,
    pub asset: String,
    /// Hex address or ENS name
    pub receiver_address: String,
    pub chain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapIntent {
    pub amount: String,
    pub from_token: String,
    pub to_token: String,
    pub chain: String,
}

/// Balance lookup. All fields are optional filters: `null` or a blank
/// string means no filter, and `tokens` may also be a single string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceIntent {
    #[serde(
        default,
        deserialize_with = "optional_filter",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_filter",
        skip_serializing_if = "Option::is_none"
    )]
    pub chain: Option<String>,
    #[serde(
        default,
        deserialize_with = "token_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tokens: Vec<String>,
    /// Placeholder the assistant sometimes fills in; carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
}

/// Discriminant of an `Intent`, usable without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Bridge,
    Transfer,
    Swap,
    Balance,
}

impl IntentKind {
    pub const ALL: [IntentKind; 4] = [
        IntentKind::Bridge,
        IntentKind::Transfer,
        IntentKind::Swap,
        IntentKind::Balance,
    ];

    /// Wire name of the discriminant
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Bridge => "bridge",
            IntentKind::Transfer => "transfer",
            IntentKind::Swap => "swap",
            IntentKind::Balance => "balance",
        }
    }

    /// Parse a wire discriminant; `None` for anything outside the known set
    pub fn from_wire(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == tag)
    }

    /// How executor output for this kind must be interpreted
    pub fn policy(&self) -> InterpretPolicy {
        match self {
            IntentKind::Balance => InterpretPolicy::Balance,
            IntentKind::Bridge | IntentKind::Transfer | IntentKind::Swap => {
                InterpretPolicy::Transaction
            }
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::Bridge(_) => IntentKind::Bridge,
            Intent::Transfer(_) => IntentKind::Transfer,
            Intent::Swap(_) => IntentKind::Swap,
            Intent::Balance(_) => IntentKind::Balance,
        }
    }

    pub fn policy(&self) -> InterpretPolicy {
        self.kind().policy()
    }

    /// Build a validated intent from an arbitrary JSON document.
    ///
    /// The discriminant is checked first so an unknown tag is reported as such
    /// rather than as a generic serde error.
    pub fn from_value(value: &JsonValue) -> Result<Self, IntentValidationError> {
        let object = value
            .as_object()
            .ok_or(IntentValidationError::NotAnObject)?;

        let tag = match object.get("intent") {
            Some(JsonValue::String(tag)) => tag.as_str(),
            Some(_) => return Err(IntentValidationError::DiscriminantNotString),
            None => return Err(IntentValidationError::MissingDiscriminant),
        };
        let kind = IntentKind::from_wire(tag)
            .ok_or_else(|| IntentValidationError::UnknownKind(tag.to_string()))?;

        let intent: Intent = serde_json::from_value(value.clone()).map_err(|e| {
            IntentValidationError::InvalidFields {
                kind,
                reason: e.to_string(),
            }
        })?;
        intent.validate()?;
        Ok(intent)
    }

    /// JSON form handed to the executor
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// One-line human summary, used in logs and card subtitles
    pub fn summary(&self) -> String {
        match self {
            Intent::Bridge(b) => format!(
                "bridge {} {} from {} to {}",
                b.amount, b.asset, b.from_network, b.to_network
            ),
            Intent::Transfer(t) => format!(
                "transfer {} {} to {} on {}",
                t.amount, t.asset, t.receiver_address, t.chain
            ),
            Intent::Swap(s) => format!(
                "swap {} {} to {} on {}",
                s.amount, s.from_token, s.to_token, s.chain
            ),
            Intent::Balance(b) => match (&b.address, &b.chain) {
                (Some(addr), Some(chain)) => format!("balance of {} on {}", addr, chain),
                (Some(addr), None) => format!("balance of {}", addr),
                (None, Some(chain)) => format!("balance on {}", chain),
                (None, None) => "balance".to_string(),
            },
        }
    }
}

/// Outcome of pulling an intent out of a transcript.
///
/// `Unrecognized` keeps the parsed JSON so it can still be shown verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedIntent {
    Recognized(Intent),
    Unrecognized { raw: JsonValue, reason: String },
}

impl ExtractedIntent {
    /// Classify a parsed JSON document
    pub fn from_value(value: JsonValue) -> Self {
        match Intent::from_value(&value) {
            Ok(intent) => ExtractedIntent::Recognized(intent),
            Err(e) => ExtractedIntent::Unrecognized {
                raw: value,
                reason: e.to_string(),
            },
        }
    }

    pub fn as_intent(&self) -> Option<&Intent> {
        match self {
            ExtractedIntent::Recognized(intent) => Some(intent),
            ExtractedIntent::Unrecognized { .. } => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, ExtractedIntent::Recognized(_))
    }

    /// Pretty-printed JSON, as used by the generic fallback card
    pub fn pretty_json(&self) -> String {
        let rendered = match self {
            ExtractedIntent::Recognized(intent) => serde_json::to_string_pretty(intent),
            ExtractedIntent::Unrecognized { raw, .. } => serde_json::to_string_pretty(raw),
        };
        rendered.unwrap_or_default()
    }
}

fn optional_filter<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

/// `null`, `"USDC"`, `"USDC, ETH"` or `["USDC", "ETH"]`
fn token_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tokens {
        One(String),
        Many(Vec<String>),
    }

    let tokens = match Option::<Tokens>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Tokens::One(list)) => list.split(',').map(str::to_string).collect(),
        Some(Tokens::Many(items)) => items,
    };
    Ok(tokens
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}
