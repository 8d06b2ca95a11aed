//! Dynamic memory balancing across hypervisor domains.
//!
//! Guests report their own memory usage, which is untrusted. Reports go
//! through [`parse_meminfo`] and [`validate_meminfo`] before anything in
//! them is used; [`balance`] and [`balloon`] then turn a stable snapshot of
//! the [`DomainStore`] into "set memory target" requests. Nothing here
//! talks to the hypervisor.

pub mod audit;
pub mod balance;
pub mod balloon;
pub mod config;
pub mod domain;
pub mod error;
pub mod meminfo;
pub mod plan;
pub mod policy;
pub mod preference;

pub use audit::{RecordingSink, RejectionRecord, RejectionSink, TracingSink};
pub use balance::balance;
pub use balloon::balloon;
pub use config::QmemmanConfig;
pub use domain::{Domain, DomainId, DomainStore, RefreshOutcome};
pub use error::{PolicyError, RejectReason};
pub use meminfo::{RawMeminfo, ValidatedMeminfo, Verdict, parse_meminfo, validate_meminfo};
pub use plan::{MemoryTarget, total_target_bytes};
pub use policy::MemoryPolicy;
pub use preference::{memory_needed, prefmem};

#[cfg(test)]
pub(crate) mod test_support;
