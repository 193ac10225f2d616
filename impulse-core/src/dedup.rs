//! Signal identity and the emit-once ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::decision::Verdict;
use crate::domain::Direction;

/// What makes two accepted verdicts "the same signal".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalIdentity {
    pub direction: Direction,
    /// Timestamp of the start candle.
    pub start_time: DateTime<Utc>,
}

impl SignalIdentity {
    pub fn new(direction: Direction, start_time: DateTime<Utc>) -> Self {
        Self {
            direction,
            start_time,
        }
    }

    /// Identity of an accepted verdict; `None` for rejections.
    pub fn from_verdict(verdict: &Verdict) -> Option<Self> {
        if !verdict.ok {
            return None;
        }
        Some(Self::new(verdict.direction?, verdict.start_time?))
    }

    /// Stable BLAKE3 hex digest of the canonical identity.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::json!({
            "direction": self.direction.as_str(),
            "start_time": self.start_time.timestamp(),
        });
        blake3::hash(canonical.to_string().as_bytes())
            .to_hex()
            .to_string()
    }
}

impl fmt::Display for SignalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.direction, self.start_time.to_rfc3339())
    }
}

/// Remembers the last emitted signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalLedger {
    last: Option<SignalIdentity>,
}

impl SignalLedger {
    pub fn new(last: Option<SignalIdentity>) -> Self {
        Self { last }
    }

    pub fn last(&self) -> Option<SignalIdentity> {
        self.last
    }

    /// Identity to emit for `verdict`, or `None` if it is rejected or was
    /// already emitted.
    pub fn admit(&self, verdict: &Verdict) -> Option<SignalIdentity> {
        let identity = SignalIdentity::from_verdict(verdict)?;
        if self.last == Some(identity) {
            debug!(%identity, "signal already emitted");
            return None;
        }
        Some(identity)
    }

    pub fn record(&mut self, identity: SignalIdentity) {
        self.last = Some(identity);
    }
}
