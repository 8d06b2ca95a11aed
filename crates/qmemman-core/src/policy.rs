//! Balancing tunables.
//!
//! The scale factors below are part of the algorithm's contract, not
//! cosmetic knobs: the conservation and feasibility guarantees of
//! [`crate::balance`] and [`crate::balloon`] assume them.

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

pub const MIB: i64 = 1024 * 1024;

/// Working set is multiplied by this to leave room for page cache.
pub const CACHE_FACTOR: f64 = 1.3;

/// Extra preferred memory for domain 0, which serves block devices and
/// needs a large page cache.
pub const DOM0_MEM_BOOST: i64 = 350 * MIB;

/// Downward bias on surplus targets so float rounding never asks for a
/// byte more than the host has.
pub const SURPLUS_SAFETY_FACTOR: f64 = 0.999;

/// Upward bias on ballooning borrowings so a donor yielding slightly less
/// than asked does not leave the caller waiting on an unreachable target.
pub const BALLOON_SAFETY_FACTOR: f64 = 1.05;

/// Donors with less squeezable surplus than this are left alone under
/// scarcity; they were most likely squeezed already.
pub const MIN_SQUEEZE: i64 = 10 * MIB;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryPolicy {
    pub cache_factor: f64,
    pub dom0_boost_bytes: i64,
    pub surplus_safety_factor: f64,
    pub balloon_safety_factor: f64,
    pub min_squeeze_bytes: i64,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self {
            cache_factor: CACHE_FACTOR,
            dom0_boost_bytes: DOM0_MEM_BOOST,
            surplus_safety_factor: SURPLUS_SAFETY_FACTOR,
            balloon_safety_factor: BALLOON_SAFETY_FACTOR,
            min_squeeze_bytes: MIN_SQUEEZE,
        }
    }
}

impl MemoryPolicy {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Reject tunables that would break conservation or feasibility.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if !self.cache_factor.is_finite() || self.cache_factor < 1.0 {
            return Err(PolicyError::CacheFactor(self.cache_factor));
        }
        if !(self.surplus_safety_factor > 0.0 && self.surplus_safety_factor <= 1.0) {
            return Err(PolicyError::SurplusSafetyFactor(self.surplus_safety_factor));
        }
        if !self.balloon_safety_factor.is_finite() || self.balloon_safety_factor < 1.0 {
            return Err(PolicyError::BalloonSafetyFactor(self.balloon_safety_factor));
        }
        if self.dom0_boost_bytes < 0 {
            return Err(PolicyError::NegativeBytes {
                field: "dom0_boost_bytes",
                value: self.dom0_boost_bytes,
            });
        }
        if self.min_squeeze_bytes < 0 {
            return Err(PolicyError::NegativeBytes {
                field: "min_squeeze_bytes",
                value: self.min_squeeze_bytes,
            });
        }
        Ok(())
    }
}
