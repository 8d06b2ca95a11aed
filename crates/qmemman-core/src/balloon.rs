//! On-demand ballooning: free a fixed amount of memory right now, e.g. to
//! admit a new domain.
//!
//! The plan is safely sufficient rather than exact. Donors are asked for a
//! little more than their share; the excess flows back on the next
//! [`crate::balance`] call.

use tracing::debug;

use crate::domain::{DomainId, DomainStore};
use crate::plan::{MemoryTarget, to_bytes};
use crate::policy::MemoryPolicy;
use crate::preference::memory_needed;

/// Plan how to free `requested_bytes` from donors.
///
/// Domains without usage data or flagged `no_progress` never donate. An
/// empty plan means the request cannot be met and the caller must not go
/// ahead with whatever needed the memory.
pub fn balloon(
    requested_bytes: i64,
    domains: &DomainStore,
    policy: &MemoryPolicy,
) -> Vec<MemoryTarget> {
    if requested_bytes <= 0 {
        debug!(requested_bytes, "balloon: non-positive request refused");
        return Vec::new();
    }

    let mut donors: Vec<(DomainId, i64, f64)> = Vec::new();
    let mut total_available = 0.0f64;
    for domain in domains.live_domains().filter(|d| !d.no_progress) {
        let Some(need) = memory_needed(domain, policy) else {
            continue;
        };
        if need < 0.0 {
            debug!(
                domain = %domain.id(),
                memory_actual = domain.memory_actual,
                available = -need,
                "balloon: donor"
            );
            donors.push((domain.id(), domain.memory_actual, -need));
            total_available -= need;
        }
    }

    debug!(
        requested_bytes,
        total_available,
        donors = donors.len(),
        "balloon: request"
    );
    if total_available < requested_bytes as f64 {
        return Vec::new();
    }

    let scale = requested_bytes as f64 / total_available;
    donors
        .into_iter()
        .map(|(id, memory_actual, available)| {
            let borrowed = available * scale * policy.balloon_safety_factor;
            debug!(domain = %id, borrowed, "balloon: borrow");
            // The safety factor can push a nearly idle donor below zero.
            let target = to_bytes((memory_actual as f64 - borrowed).max(0.0));
            MemoryTarget::new(id, target)
        })
        .collect()
}

impl DomainStore {
    /// [`balloon`] under the default policy.
    pub fn balloon(&self, requested_bytes: i64) -> Vec<MemoryTarget> {
        balloon(requested_bytes, self, &MemoryPolicy::default())
    }
}

#[cfg(test)]
#[path = "balloon_tests.rs"]
mod tests;
