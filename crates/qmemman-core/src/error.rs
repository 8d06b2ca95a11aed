/// Why an untrusted meminfo report was refused.
///
/// Every variant is recoverable: the reporting domain is simply treated as
/// having no usage data until its next acceptable report.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("Required key '{0}' is missing")]
    MissingKey(&'static str),

    #[error("Value of '{key}' is not an integer: {value:?}")]
    NotInteger { key: &'static str, value: String },

    #[error("Value of '{key}' is negative: {value}")]
    Negative { key: &'static str, value: i64 },

    #[error("Value of '{key}' does not fit in 64 bits once scaled to bytes")]
    Overflow { key: &'static str },

    #[error("SwapFree ({swap_free}) exceeds SwapTotal ({swap_total})")]
    SwapInconsistent { swap_total: i64, swap_free: i64 },

    #[error("MemFree + Cached + Buffers ({claimed}) exceeds MemTotal ({mem_total})")]
    MemInconsistent { mem_total: i64, claimed: i64 },

    #[error("MemFree + Cached + Buffers does not fit in 64 bits")]
    SumOverflow,
}

/// Invalid balancing tunables.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("policy.cache_factor must be a finite value >= 1.0 (got {0})")]
    CacheFactor(f64),

    #[error("policy.surplus_safety_factor must be in (0, 1] (got {0})")]
    SurplusSafetyFactor(f64),

    #[error("policy.balloon_safety_factor must be a finite value >= 1.0 (got {0})")]
    BalloonSafetyFactor(f64),

    #[error("policy.{field} must be >= 0 (got {value})")]
    NegativeBytes { field: &'static str, value: i64 },
}
