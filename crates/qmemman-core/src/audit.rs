//! Audit trail for rejected meminfo reports.
//!
//! A rejection may be an honest glitch or a hostile guest; either way it is
//! recorded with the domain id and the full raw report, then balancing goes
//! on without that domain.

use std::sync::Mutex;

use serde::Serialize;

use crate::domain::DomainId;
use crate::error::RejectReason;
use crate::meminfo::RawMeminfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectionRecord {
    pub domain: DomainId,
    pub memory_actual: i64,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: RejectReason,
    pub raw: RawMeminfo,
}

fn serialize_reason<S: serde::Serializer>(
    reason: &RejectReason,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(reason)
}

/// Receives every rejected report. Implementations must not panic.
pub trait RejectionSink {
    fn meminfo_rejected(&self, record: &RejectionRecord);
}

/// Emits rejections as `warn` level tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl RejectionSink for TracingSink {
    fn meminfo_rejected(&self, record: &RejectionRecord) {
        tracing::warn!(
            domain = %record.domain,
            memory_actual = record.memory_actual,
            reason = %record.reason,
            raw = ?record.raw,
            "suspicious meminfo"
        );
    }
}

/// Keeps rejections in memory, for tests and audit tooling.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<RejectionRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<RejectionRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RejectionSink for RecordingSink {
    fn meminfo_rejected(&self, record: &RejectionRecord) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
    }
}
