//! Intent status controller
//!
//! Synchronous state machine behind one widget. It decides which raw results
//! are worth interpreting and which interpreted results may be applied; the
//! actor in `widget::mod` drives it and does the async work.

use serde::Serialize;
use tracing::debug;
use vox_intent_types::{InterpretPolicy, NormalizedResult};

/// Widget lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Never dispatched (generic fallback widgets)
    Pending,
    /// Waiting for an executor result
    Processing,
    Success,
    Fail,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Success | Phase::Fail)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pending => "pending",
            Phase::Processing => "processing",
            Phase::Success => "success",
            Phase::Fail => "fail",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted raw result, tagged with its arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub seq: u64,
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct IntentStatusController {
    policy: InterpretPolicy,
    phase: Phase,
    last_seen_raw: Option<String>,
    normalized: Option<NormalizedResult>,
    next_seq: u64,
    applied_seq: Option<u64>,
    failure: Option<String>,
}

impl IntentStatusController {
    /// New controller in `processing`
    pub fn new(policy: InterpretPolicy) -> Self {
        Self {
            policy,
            phase: Phase::Processing,
            last_seen_raw: None,
            normalized: None,
            next_seq: 0,
            applied_seq: None,
            failure: None,
        }
    }

    /// Filter a raw result.
    ///
    /// Returns `None` for empty, absent or repeated input; in that case
    /// nothing about the controller changes.
    pub fn accept(&mut self, raw: Option<&str>) -> Option<Delivery> {
        let raw = match raw {
            Some(r) if !r.trim().is_empty() => r,
            _ => {
                debug!("Ignoring empty executor result");
                return None;
            }
        };

        if self.last_seen_raw.as_deref() == Some(raw) {
            debug!("Ignoring repeated executor result");
            return None;
        }

        self.last_seen_raw = Some(raw.to_string());
        Some(Delivery {
            seq: self.take_seq(),
            raw: raw.to_string(),
        })
    }

    /// Adopt an interpreted result unless a later delivery already won.
    pub fn apply(&mut self, seq: u64, normalized: NormalizedResult) -> bool {
        if self.applied_seq.is_some_and(|applied| seq < applied) {
            debug!(seq, "Discarding stale classification");
            return false;
        }

        self.phase = if normalized.is_success() {
            Phase::Success
        } else {
            Phase::Fail
        };
        self.normalized = Some(normalized);
        self.applied_seq = Some(seq);
        self.failure = None;
        true
    }

    /// The executor call itself failed: fail with no payload.
    pub fn fail_invocation(&mut self, reason: impl Into<String>) -> bool {
        let seq = self.take_seq();
        let applied = self.apply(seq, NormalizedResult::failed(self.policy));
        if applied {
            self.failure = Some(reason.into());
        }
        applied
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub fn policy(&self) -> InterpretPolicy {
        self.policy
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_seen_raw(&self) -> Option<&str> {
        self.last_seen_raw.as_deref()
    }

    pub fn normalized(&self) -> Option<&NormalizedResult> {
        self.normalized.as_ref()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn progress(&self) -> u8 {
        progress_for(self.phase)
    }
}

/// 100 once successful, 0 otherwise
pub fn progress_for(phase: Phase) -> u8 {
    match phase {
        Phase::Success => 100,
        _ => 0,
    }
}
