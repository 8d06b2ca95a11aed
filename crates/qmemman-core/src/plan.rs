use serde::{Deserialize, Serialize};

use crate::domain::DomainId;

/// One "set memory target" request for the hypervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTarget {
    pub domain: DomainId,
    pub target_bytes: i64,
}

impl MemoryTarget {
    pub fn new(domain: DomainId, target_bytes: i64) -> Self {
        Self {
            domain,
            target_bytes,
        }
    }
}

/// Truncate a non-negative float byte count. Rounding happens here and
/// nowhere earlier in a computation.
pub(crate) fn to_bytes(value: f64) -> i64 {
    value.floor() as i64
}

/// Sum of targets, for logging and tests.
pub fn total_target_bytes(plan: &[MemoryTarget]) -> i64 {
    plan.iter().map(|request| request.target_bytes).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bytes_floors() {
        assert_eq!(to_bytes(1023.999), 1023);
        assert_eq!(to_bytes(0.0), 0);
        assert_eq!(to_bytes(4096.0), 4096);
    }

    #[test]
    fn test_to_bytes_saturates_on_nan_and_overflow() {
        assert_eq!(to_bytes(f64::NAN), 0);
        assert_eq!(to_bytes(1e30), i64::MAX);
    }

    #[test]
    fn test_total_target_bytes() {
        let plan = [
            MemoryTarget::new(DomainId::new(1), 100),
            MemoryTarget::new(DomainId::new(2), 250),
        ];
        assert_eq!(total_target_bytes(&plan), 350);
        assert_eq!(total_target_bytes(&[]), 0);
    }
}
