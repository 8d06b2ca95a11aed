//! Preferred allocation per domain.
//!
//! Results stay in floating point; callers round once, at the very end.
//! The balancer's proportional split relies on
//! `memory_needed == prefmem - memory_actual` holding exactly.

use crate::domain::Domain;
use crate::policy::MemoryPolicy;

/// Preferred allocation in bytes, or `None` for a domain without usage data.
pub fn prefmem(domain: &Domain, policy: &MemoryPolicy) -> Option<f64> {
    let mem_used = domain.mem_used()? as f64;
    let pref = mem_used * policy.cache_factor;
    if domain.id().is_privileged() {
        Some(pref + policy.dom0_boost_bytes as f64)
    } else {
        Some(pref)
    }
}

/// Positive when the domain wants more memory, negative when it could give
/// `-memory_needed` away.
pub fn memory_needed(domain: &Domain, policy: &MemoryPolicy) -> Option<f64> {
    Some(prefmem(domain, policy)? - domain.memory_actual as f64)
}
