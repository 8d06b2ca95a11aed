//! Untrusted meminfo handling: a total parser followed by a validator.
//!
//! The raw blob comes from a guest and is bounded in size by the store it
//! is read from. Nothing numeric is trusted until [`ValidatedMeminfo`]
//! exists; the only way to obtain one is [`ValidatedMeminfo::from_raw`].

use std::collections::BTreeMap;
use std::num::IntErrorKind;

use serde::Serialize;

use crate::audit::{RejectionRecord, RejectionSink};
use crate::domain::Domain;
use crate::error::RejectReason;

/// Key → raw value mapping produced by [`parse_meminfo`].
pub type RawMeminfo = BTreeMap<String, String>;

pub const REQUIRED_KEYS: [&str; 6] = [
    "MemTotal",
    "MemFree",
    "Buffers",
    "Cached",
    "SwapTotal",
    "SwapFree",
];

const KIB: i64 = 1024;

/// Split `untrusted` into lines and keep the first two tokens of each.
///
/// Never fails. Lines with fewer than two tokens are skipped, trailing
/// colons are stripped from the key, and a later duplicate key wins.
pub fn parse_meminfo(untrusted: &str) -> RawMeminfo {
    let mut parsed = RawMeminfo::new();
    for line in untrusted.split('\n') {
        let mut words = line.split_whitespace();
        if let (Some(key), Some(value)) = (words.next(), words.next()) {
            parsed.insert(key.trim_end_matches(':').to_string(), value.to_string());
        }
    }
    parsed
}

/// Six memory counters in bytes that passed every consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidatedMeminfo {
    mem_total: i64,
    mem_free: i64,
    buffers: i64,
    cached: i64,
    swap_total: i64,
    swap_free: i64,
}

impl ValidatedMeminfo {
    /// Validate a parsed report. Values are kilobytes and get scaled to
    /// bytes. Magnitude is deliberately unbounded: a huge claim only lets
    /// a domain ask for more, it cannot take memory from others.
    pub fn from_raw(raw: &RawMeminfo) -> Result<Self, RejectReason> {
        let mem_total = scaled_field(raw, "MemTotal")?;
        let mem_free = scaled_field(raw, "MemFree")?;
        let buffers = scaled_field(raw, "Buffers")?;
        let cached = scaled_field(raw, "Cached")?;
        let swap_total = scaled_field(raw, "SwapTotal")?;
        let swap_free = scaled_field(raw, "SwapFree")?;

        if swap_total < swap_free {
            return Err(RejectReason::SwapInconsistent {
                swap_total,
                swap_free,
            });
        }

        let claimed = mem_free
            .checked_add(cached)
            .and_then(|sum| sum.checked_add(buffers))
            .ok_or(RejectReason::SumOverflow)?;
        if mem_total < claimed {
            return Err(RejectReason::MemInconsistent { mem_total, claimed });
        }

        // Both halves are non-negative now; their sum must still fit so
        // that mem_used() can use plain arithmetic.
        (mem_total - claimed)
            .checked_add(swap_total - swap_free)
            .ok_or(RejectReason::SumOverflow)?;

        Ok(Self {
            mem_total,
            mem_free,
            buffers,
            cached,
            swap_total,
            swap_free,
        })
    }

    /// Working-set estimate: resident memory not reclaimable as cache, plus
    /// whatever has been pushed out to swap.
    pub fn mem_used(&self) -> i64 {
        self.mem_total - self.mem_free - self.cached - self.buffers + self.swap_total
            - self.swap_free
    }

    pub fn mem_total(&self) -> i64 {
        self.mem_total
    }

    pub fn mem_free(&self) -> i64 {
        self.mem_free
    }

    pub fn buffers(&self) -> i64 {
        self.buffers
    }

    pub fn cached(&self) -> i64 {
        self.cached
    }

    pub fn swap_total(&self) -> i64 {
        self.swap_total
    }

    pub fn swap_free(&self) -> i64 {
        self.swap_free
    }
}

fn scaled_field(raw: &RawMeminfo, key: &'static str) -> Result<i64, RejectReason> {
    let value = raw.get(key).ok_or(RejectReason::MissingKey(key))?;
    let kib = value.parse::<i64>().map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => RejectReason::Overflow { key },
        _ => RejectReason::NotInteger {
            key,
            value: value.clone(),
        },
    })?;
    if kib < 0 {
        return Err(RejectReason::Negative { key, value: kib });
    }
    kib.checked_mul(KIB).ok_or(RejectReason::Overflow { key })
}

/// Outcome of validating one report against its domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(ValidatedMeminfo),
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn accepted(self) -> Option<ValidatedMeminfo> {
        match self {
            Self::Accepted(meminfo) => Some(meminfo),
            Self::Rejected(_) => None,
        }
    }
}

/// Validate `raw` as reported by `domain`, reporting any rejection to `sink`.
///
/// `domain` is only read for diagnostic context.
pub fn validate_meminfo(domain: &Domain, raw: &RawMeminfo, sink: &dyn RejectionSink) -> Verdict {
    match ValidatedMeminfo::from_raw(raw) {
        Ok(meminfo) => Verdict::Accepted(meminfo),
        Err(reason) => {
            sink.meminfo_rejected(&RejectionRecord {
                domain: domain.id(),
                memory_actual: domain.memory_actual,
                reason: reason.clone(),
                raw: raw.clone(),
            });
            Verdict::Rejected(reason)
        }
    }
}

#[cfg(test)]
#[path = "meminfo_tests.rs"]
mod tests;
