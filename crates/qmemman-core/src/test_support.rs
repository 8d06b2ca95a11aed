//! Builders shared by unit tests.

use crate::domain::{Domain, DomainId};
use crate::meminfo::{ValidatedMeminfo, parse_meminfo};
use crate::policy::{MIB, MemoryPolicy};

/// Report whose working set is exactly `used_kib` KiB.
pub(crate) fn report_using(used_kib: i64) -> String {
    format!(
        "MemTotal: {used_kib} kB\nMemFree: 0 kB\nBuffers: 0 kB\nCached: 0 kB\n\
         SwapTotal: 0 kB\nSwapFree: 0 kB\n"
    )
}

/// Live domain with `mem_used` of `used_mib` MiB.
pub(crate) fn live_domain(id: u32, memory_actual: i64, used_mib: i64) -> Domain {
    let raw = parse_meminfo(&report_using(used_mib * 1024));
    let mut domain = Domain::new(DomainId::new(id), memory_actual);
    domain.apply_report(ValidatedMeminfo::from_raw(&raw).expect("valid report"));
    assert_eq!(domain.mem_used(), Some(used_mib * MIB));
    domain
}

/// Policy with `prefmem == mem_used` for non-privileged domains, so
/// scenarios can be written in round MiB.
pub(crate) fn flat_policy() -> MemoryPolicy {
    MemoryPolicy {
        cache_factor: 1.0,
        ..Default::default()
    }
}
