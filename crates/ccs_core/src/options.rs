//! crates/ccs_core/src/options.rs
//! Run options. Every policy that changes engine behaviour on imperfect
//! input is explicit here; defaults reproduce the stored-table behaviour.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What happens to map units present in one table but absent from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum JoinPolicy {
    /// Drop unmatched map units (each drop is logged).
    #[default]
    Inner,
    /// Fail on the first unmatched map unit.
    Strict,
}

/// Curve buckets outside 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BucketPolicy {
    #[default]
    Reject,
    Clamp,
}

/// Divergent duplicate projected values for one (map unit, attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DuplicatePolicy {
    /// Average and report a warning.
    #[default]
    Average,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct CalcOptions {
    pub join_policy: JoinPolicy,
    pub bucket_policy: BucketPolicy,
    pub duplicate_policy: DuplicatePolicy,
}

impl JoinPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            JoinPolicy::Inner => "inner",
            JoinPolicy::Strict => "strict",
        }
    }
}

impl BucketPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            BucketPolicy::Reject => "reject",
            BucketPolicy::Clamp => "clamp",
        }
    }
}

impl DuplicatePolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            DuplicatePolicy::Average => "average",
            DuplicatePolicy::Reject => "reject",
        }
    }
}
