//! Normalized Result Types
//!
//! `NormalizedResult` is the only shape downstream code ever sees for an
//! executor outcome. Each interpretation policy has its own variant, so a
//! balance result always carries `balances` and a transaction result always
//! carries `transactionUrl` (possibly `null`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Success or failure of an executor outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Fail,
}

impl ResultStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ResultStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Success => "success",
            ResultStatus::Fail => "fail",
        }
    }
}

/// Which extraction rules apply to a raw executor result.
///
/// Chosen from the intent kind, never guessed from the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpretPolicy {
    /// Per-token balances
    Balance,
    /// Bridge / transfer / swap: success flag plus transaction link
    Transaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedResult {
    Balance {
        status: ResultStatus,
        balances: BTreeMap<String, String>,
    },
    Transaction {
        status: ResultStatus,
        #[serde(rename = "transactionUrl")]
        transaction_url: Option<String>,
    },
}

impl NormalizedResult {
    /// The deterministic failure value for a policy
    pub fn failed(policy: InterpretPolicy) -> Self {
        match policy {
            InterpretPolicy::Balance => NormalizedResult::Balance {
                status: ResultStatus::Fail,
                balances: BTreeMap::new(),
            },
            InterpretPolicy::Transaction => NormalizedResult::Transaction {
                status: ResultStatus::Fail,
                transaction_url: None,
            },
        }
    }

    pub fn balances_ok(balances: BTreeMap<String, String>) -> Self {
        NormalizedResult::Balance {
            status: ResultStatus::Success,
            balances,
        }
    }

    pub fn transaction_ok(transaction_url: Option<String>) -> Self {
        NormalizedResult::Transaction {
            status: ResultStatus::Success,
            transaction_url,
        }
    }

    pub fn status(&self) -> ResultStatus {
        match self {
            NormalizedResult::Balance { status, .. } => *status,
            NormalizedResult::Transaction { status, .. } => *status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }

    pub fn policy(&self) -> InterpretPolicy {
        match self {
            NormalizedResult::Balance { .. } => InterpretPolicy::Balance,
            NormalizedResult::Transaction { .. } => InterpretPolicy::Transaction,
        }
    }

    pub fn balances(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            NormalizedResult::Balance { balances, .. } => Some(balances),
            NormalizedResult::Transaction { .. } => None,
        }
    }

    pub fn transaction_url(&self) -> Option<&str> {
        match self {
            NormalizedResult::Transaction {
                transaction_url, ..
            } => transaction_url.as_deref(),
            NormalizedResult::Balance { .. } => None,
        }
    }
}
