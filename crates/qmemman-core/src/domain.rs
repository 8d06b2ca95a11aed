//! Per-domain balancing state.
//!
//! A [`Domain`] is either live (it has an accepted meminfo report) or
//! excluded from balancing. There is no third state: reports are replaced
//! wholesale and a rejected report discards whatever was known before.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit::RejectionSink;
use crate::meminfo::{ValidatedMeminfo, Verdict, parse_meminfo, validate_meminfo};
use crate::plan::MemoryTarget;

/// Hypervisor domain identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(u32);

impl DomainId {
    /// The host management domain.
    pub const PRIVILEGED: Self = Self(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_privileged(self) -> bool {
        self == Self::PRIVILEGED
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for DomainId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    id: DomainId,
    /// Bytes currently allocated, as reported by the hypervisor.
    pub memory_actual: i64,
    meminfo: Option<ValidatedMeminfo>,
    /// Set by the caller when a ballooning request to this domain stalled.
    pub no_progress: bool,
}

impl Domain {
    pub fn new(id: DomainId, memory_actual: i64) -> Self {
        Self {
            id,
            memory_actual,
            meminfo: None,
            no_progress: false,
        }
    }

    pub fn id(&self) -> DomainId {
        self.id
    }

    pub fn meminfo(&self) -> Option<&ValidatedMeminfo> {
        self.meminfo.as_ref()
    }

    /// Working-set estimate in bytes; `None` exactly when there is no
    /// accepted report.
    pub fn mem_used(&self) -> Option<i64> {
        self.meminfo.as_ref().map(ValidatedMeminfo::mem_used)
    }

    pub fn is_live(&self) -> bool {
        self.meminfo.is_some()
    }

    pub fn apply_report(&mut self, meminfo: ValidatedMeminfo) {
        self.meminfo = Some(meminfo);
    }

    pub fn clear_report(&mut self) {
        self.meminfo = None;
    }

    /// Parse and validate an untrusted report, then replace or clear the
    /// current snapshot. Returns whether the report was accepted.
    pub fn refresh(&mut self, untrusted: &str, sink: &dyn RejectionSink) -> bool {
        let raw = parse_meminfo(untrusted);
        match validate_meminfo(self, &raw, sink) {
            Verdict::Accepted(meminfo) => {
                self.apply_report(meminfo);
                true
            }
            Verdict::Rejected(_) => {
                self.clear_report();
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Accepted,
    Rejected,
    UnknownDomain,
}

/// Domain collection owned by the caller.
///
/// Calls into the balancer borrow the store immutably, so the snapshot is
/// stable for the whole computation. Callers sharing a store across threads
/// must serialize updates and balancing behind a single lock.
#[derive(Debug, Clone, Default)]
pub struct DomainStore {
    domains: BTreeMap<DomainId, Domain>,
}

impl DomainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a domain, returning the previous entry.
    pub fn insert(&mut self, domain: Domain) -> Option<Domain> {
        self.domains.insert(domain.id(), domain)
    }

    pub fn remove(&mut self, id: DomainId) -> Option<Domain> {
        self.domains.remove(&id)
    }

    pub fn get(&self, id: DomainId) -> Option<&Domain> {
        self.domains.get(&id)
    }

    pub fn get_mut(&mut self, id: DomainId) -> Option<&mut Domain> {
        self.domains.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// All domains in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Domain> {
        self.domains.values()
    }

    /// Domains with an accepted report, in id order.
    pub fn live_domains(&self) -> impl Iterator<Item = &Domain> {
        self.domains.values().filter(|d| d.is_live())
    }

    pub fn set_memory_actual(&mut self, id: DomainId, memory_actual: i64) -> bool {
        match self.domains.get_mut(&id) {
            Some(domain) => {
                domain.memory_actual = memory_actual;
                true
            }
            None => false,
        }
    }

    pub fn set_no_progress(&mut self, id: DomainId, no_progress: bool) -> bool {
        match self.domains.get_mut(&id) {
            Some(domain) => {
                domain.no_progress = no_progress;
                true
            }
            None => false,
        }
    }

    /// Feed a fresh untrusted report from domain `id`.
    pub fn refresh_meminfo(
        &mut self,
        id: DomainId,
        untrusted: &str,
        sink: &dyn RejectionSink,
    ) -> RefreshOutcome {
        let Some(domain) = self.domains.get_mut(&id) else {
            debug!(domain = %id, "meminfo update for unknown domain ignored");
            return RefreshOutcome::UnknownDomain;
        };
        if domain.refresh(untrusted, sink) {
            RefreshOutcome::Accepted
        } else {
            RefreshOutcome::Rejected
        }
    }

    /// Record that every target in `plan` has been reached.
    ///
    /// Returns the net bytes handed back to the host (negative when the
    /// plan consumed host memory). Targets for unknown domains are skipped.
    pub fn apply_plan(&mut self, plan: &[MemoryTarget]) -> i64 {
        let mut released = 0i64;
        for request in plan {
            if let Some(domain) = self.domains.get_mut(&request.domain) {
                released += domain.memory_actual - request.target_bytes;
                domain.memory_actual = request.target_bytes;
            }
        }
        released
    }
}

impl FromIterator<Domain> for DomainStore {
    fn from_iter<I: IntoIterator<Item = Domain>>(iter: I) -> Self {
        Self {
            domains: iter.into_iter().map(|d| (d.id(), d)).collect(),
        }
    }
}

impl Extend<Domain> for DomainStore {
    fn extend<I: IntoIterator<Item = Domain>>(&mut self, iter: I) {
        self.domains.extend(iter.into_iter().map(|d| (d.id(), d)));
    }
}

#[cfg(test)]
#[path = "domain_tests.rs"]
mod tests;
