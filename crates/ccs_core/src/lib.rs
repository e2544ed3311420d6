//! ccs_core: Core types for the conservation credit engine.
//!
//! This crate is **I/O-free**. It defines the stable types shared across the
//! workspace (`ccs_algo`, `ccs_io`, `ccs_pipeline`, `ccs_report`, `ccs_cli`).
//!
//! - Map unit identity: `MapUnitId`, digests: `Sha256`
//! - Habitat domains: `Season`, `Meadow`, `ConiferPhase`, `SageSpecies`,
//!   `MgmtCategory`, `HabitatType`, `Effort`, `Attribute`
//! - Input rows (`entities`) and derived report rows (`results`)
//! - Run options (`options`) and ordering helpers (`determinism`)
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]

pub mod errors {
    use core::fmt;

    /// Parse/validation failures for core tokens and enums.
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum CoreError {
        InvalidId(String),
        UnknownToken { kind: &'static str, token: String },
        DomainOutOfRange(&'static str),
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidId(s) => write!(f, "invalid map unit id: {s:?}"),
                CoreError::UnknownToken { kind, token } => write!(f, "unknown {kind}: {token:?}"),
                CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
            }
        }
    }

    impl std::error::Error for CoreError {}
}

pub mod ids;
pub mod domain;
pub mod entities;
pub mod results;
pub mod options;
pub mod determinism;

pub use errors::CoreError;
pub use ids::{MapUnitId, Sha256};
pub use domain::{
    Attribute, ConiferPhase, Effort, HabitatType, Meadow, MgmtCategory, SageSpecies, Season,
};
pub use options::{BucketPolicy, CalcOptions, DuplicatePolicy, JoinPolicy};

/// Tolerance used when checking fractions that must sum to one.
pub const FRACTION_SUM_TOLERANCE: f64 = 1e-6;
