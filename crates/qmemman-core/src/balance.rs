//! Steady-state redistribution of host memory across live domains.
//!
//! When free memory covers every domain's preference (surplus), all of it
//! is handed out in proportion to preference. Otherwise (scarcity) donors
//! are squeezed to their preference and whatever that frees, plus current
//! free memory, is split between acceptors.

use tracing::debug;

use crate::domain::{DomainId, DomainStore};
use crate::plan::{MemoryTarget, to_bytes};
use crate::policy::MemoryPolicy;
use crate::preference::prefmem;

/// One live domain, classified.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    id: DomainId,
    memory_actual: i64,
    prefmem: f64,
    need: f64,
}

impl Candidate {
    fn is_donor(&self) -> bool {
        self.need < 0.0
    }
}

/// Compute memory targets for every live domain in `domains`.
///
/// Requests that shrink a domain come first, then those that grow one;
/// each group is in domain-id order so a caller can free memory before
/// handing it out.
pub fn balance(
    xen_free_memory: i64,
    domains: &DomainStore,
    policy: &MemoryPolicy,
) -> Vec<MemoryTarget> {
    // Pass 1: classify against a single snapshot.
    let candidates: Vec<Candidate> = domains
        .live_domains()
        .filter_map(|domain| {
            let pref = prefmem(domain, policy)?;
            Some(Candidate {
                id: domain.id(),
                memory_actual: domain.memory_actual,
                prefmem: pref,
                // Same value as preference::memory_needed, without recomputing.
                need: pref - domain.memory_actual as f64,
            })
        })
        .collect();

    if candidates.is_empty() {
        debug!(xen_free_memory, "balance: no live domains");
        return Vec::new();
    }

    let total_memory_needed: f64 = candidates.iter().map(|c| c.need).sum();
    let total_mem_pref: f64 = candidates.iter().map(|c| c.prefmem).sum();
    let total_available_memory = xen_free_memory as f64 - total_memory_needed;

    if total_available_memory > 0.0 {
        balance_when_enough_memory(&candidates, total_mem_pref, total_available_memory, policy)
    } else {
        balance_when_low_on_memory(&candidates, xen_free_memory, policy)
    }
}

fn balance_when_enough_memory(
    candidates: &[Candidate],
    total_mem_pref: f64,
    total_available_memory: f64,
    policy: &MemoryPolicy,
) -> Vec<MemoryTarget> {
    if total_mem_pref <= 0.0 {
        // Every preference is zero: there is no proportion to split by.
        debug!(
            total_available_memory,
            "balance(enough): all preferences are zero, nothing to distribute"
        );
        return Vec::new();
    }

    let mut donors_rq = Vec::new();
    let mut acceptors_rq = Vec::new();
    for candidate in candidates {
        let scale = candidate.prefmem / total_mem_pref;
        let target_nonint = candidate.prefmem + scale * total_available_memory;
        let target = to_bytes(policy.surplus_safety_factor * target_nonint);
        let request = MemoryTarget::new(candidate.id, target);
        if target < candidate.memory_actual {
            donors_rq.push(request);
        } else {
            acceptors_rq.push(request);
        }
    }

    debug!(
        total_available_memory,
        donors = donors_rq.len(),
        acceptors = acceptors_rq.len(),
        "balance(enough)"
    );
    donors_rq.extend(acceptors_rq);
    donors_rq
}

fn balance_when_low_on_memory(
    candidates: &[Candidate],
    xen_free_memory: i64,
    policy: &MemoryPolicy,
) -> Vec<MemoryTarget> {
    let mut donors_rq = Vec::new();
    let mut squeezed_mem = xen_free_memory as f64;
    for donor in candidates.iter().filter(|c| c.is_donor()) {
        let avail = -donor.need;
        if avail < policy.min_squeeze_bytes as f64 {
            // Most likely already squeezed to its preference.
            debug!(domain = %donor.id, avail, "balance(low): donor surplus too small, skipped");
            continue;
        }
        squeezed_mem += avail;
        donors_rq.push(MemoryTarget::new(donor.id, to_bytes(donor.prefmem)));
    }

    if squeezed_mem < 0.0 {
        debug!(
            xen_free_memory,
            squeezed_mem, "balance(low): host overcommitted, squeezing donors only"
        );
        return donors_rq;
    }

    let acceptors: Vec<&Candidate> = candidates.iter().filter(|c| !c.is_donor()).collect();
    let total_mem_pref_acceptors: f64 = acceptors.iter().map(|c| c.prefmem).sum();
    if total_mem_pref_acceptors <= 0.0 {
        return donors_rq;
    }

    for acceptor in acceptors {
        let scale = acceptor.prefmem / total_mem_pref_acceptors;
        let target_nonint = acceptor.memory_actual as f64 + scale * squeezed_mem;
        donors_rq.push(MemoryTarget::new(acceptor.id, to_bytes(target_nonint)));
    }

    debug!(
        xen_free_memory,
        squeezed_mem,
        requests = donors_rq.len(),
        "balance(low)"
    );
    donors_rq
}

impl DomainStore {
    /// [`balance`] under the default policy.
    pub fn balance(&self, xen_free_memory: i64) -> Vec<MemoryTarget> {
        balance(xen_free_memory, self, &MemoryPolicy::default())
    }
}

#[cfg(test)]
#[path = "balance_tests.rs"]
mod tests;
