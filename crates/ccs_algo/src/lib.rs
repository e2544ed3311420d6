// crates/ccs_algo/src/lib.rs
#![forbid(unsafe_code)]

//! Pure credit-calculation engine. Every operation consumes immutable input
//! tables and returns freshly allocated output tables ordered by map unit.

use core::fmt;

use ccs_core::{Attribute, MapUnitId, MgmtCategory, Season};

pub mod curves;
pub mod weights;
pub mod join;
pub mod scoring;
pub mod baseline;
pub mod facres;
pub mod credits;

// ----------------------------- Scenarios -----------------------------

#[cfg(feature = "scenario")]
pub mod scenario {
    pub mod improvement;
    pub mod projection;
    pub mod report;

    pub use improvement::{
        apply_improvement, base_families, run_base_scenarios, run_scenario, EffortLevels, Improvement,
        ScenarioFamily, ScenarioRun,
    };
    pub use projection::{
        calc_conifer_credits, calc_scenario_credits, project_attributes, Projection, ScenarioContext,
        ScenarioCredits, CONIFER_KEY,
    };
    pub use report::run_scenario_report;
}

pub use baseline::{correct_baseline, pivot_baseline};
pub use credits::{calc_credits, classify_habitat, mgmt_multiplier};
pub use curves::CurveBook;
pub use facres::calc_facres;
pub use scoring::{season_scores, OverrideRule, ScoringEngine, OVERRIDE_ORDER};
pub use weights::{aggregate_function_weights, ResolvedWeights, ScoringWeights};

// ----------------------------- Stages -----------------------------

/// Computation stage a failure is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Scoring,
    BaselineCorrection,
    FunctionalAcres,
    Credits,
    Scenario,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Scoring => "scoring",
            Stage::BaselineCorrection => "baseline-correction",
            Stage::FunctionalAcres => "functional-acre",
            Stage::Credits => "credit",
            Stage::Scenario => "scenario",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------- Errors -----------------------------

/// Curve lookup failures for a present attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum ScoringError {
    /// NaN or infinite input.
    NonNumeric { curve: String, value: f64 },
    /// `floor(value × scale)` outside 0..=100 under the reject policy.
    OutOfRange { curve: String, value: f64, bucket: f64 },
    UnknownCurve(String),
}

/// Project configuration (curves, lookup, weights, policy) is unusable.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigurationError {
    UnknownCurve(String),
    CurveShape { curve: String, len: usize },
    CurveValue { curve: String, bucket: usize, value: f64 },
    MissingLookup(String),
    DuplicateWeight { season: Season, attribute: String },
    InvalidWeight { season: Season, attribute: String, value: f64 },
    MissingWeight { season: Season, attribute: String },
    MissingFunctionWeight { season: Season, function: String },
    ZeroFunctionWeight { season: Season, function: String },
    MissingMultiplier(MgmtCategory),
}

/// A single map unit's inputs cannot be evaluated.
#[derive(Clone, Debug, PartialEq)]
pub enum InputError {
    MissingPrecipWeights,
    PrecipWeightsSum { arid: f64, mesic: f64 },
    MissingHsi(Season),
    MissingBaselineSeason(Season),
    DuplicateRow { table: &'static str },
    DivergentDuplicate { attribute: Attribute, values: Vec<f64> },
    NonFinite(&'static str),
}

/// Stage-tagged engine failure. Carries the map unit when one is at fault.
#[derive(Clone, Debug, PartialEq)]
pub enum CalcError {
    Scoring { stage: Stage, map_unit: MapUnitId, source: ScoringError },
    Input { stage: Stage, map_unit: MapUnitId, source: InputError },
    Join { stage: Stage, map_unit: MapUnitId, missing_from: &'static str },
    Configuration { stage: Stage, source: ConfigurationError },
    /// Failure while evaluating one scenario branch.
    Scenario { scenario: String, source: Box<CalcError> },
}

pub type CalcResult<T> = Result<T, CalcError>;

impl CalcError {
    pub fn stage(&self) -> Stage {
        match self {
            CalcError::Scoring { stage, .. }
            | CalcError::Input { stage, .. }
            | CalcError::Join { stage, .. }
            | CalcError::Configuration { stage, .. } => *stage,
            CalcError::Scenario { .. } => Stage::Scenario,
        }
    }

    pub fn map_unit(&self) -> Option<&MapUnitId> {
        match self {
            CalcError::Scoring { map_unit, .. }
            | CalcError::Input { map_unit, .. }
            | CalcError::Join { map_unit, .. } => Some(map_unit),
            CalcError::Configuration { .. } => None,
            CalcError::Scenario { source, .. } => source.map_unit(),
        }
    }

    pub(crate) fn config(stage: Stage, source: ConfigurationError) -> Self {
        CalcError::Configuration { stage, source }
    }

    pub(crate) fn input(stage: Stage, map_unit: &MapUnitId, source: InputError) -> Self {
        CalcError::Input { stage, map_unit: map_unit.clone(), source }
    }
}

/// Per-unit failure before the stage and map unit are attached.
#[derive(Clone, Debug, PartialEq)]
pub enum UnitError {
    Scoring(ScoringError),
    Input(InputError),
    Configuration(ConfigurationError),
}

impl From<ScoringError> for UnitError {
    fn from(e: ScoringError) -> Self {
        UnitError::Scoring(e)
    }
}
impl From<InputError> for UnitError {
    fn from(e: InputError) -> Self {
        UnitError::Input(e)
    }
}
impl From<ConfigurationError> for UnitError {
    fn from(e: ConfigurationError) -> Self {
        UnitError::Configuration(e)
    }
}

impl UnitError {
    pub fn at(self, stage: Stage, map_unit: &MapUnitId) -> CalcError {
        match self {
            UnitError::Scoring(source) => CalcError::Scoring { stage, map_unit: map_unit.clone(), source },
            UnitError::Input(source) => CalcError::Input { stage, map_unit: map_unit.clone(), source },
            UnitError::Configuration(source) => CalcError::Configuration { stage, source },
        }
    }
}

impl fmt::Display for ScoringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringError::NonNumeric { curve, value } => {
                write!(f, "non-numeric value {value} for curve {curve}")
            }
            ScoringError::OutOfRange { curve, value, bucket } => {
                write!(f, "value {value} for curve {curve} falls in bucket {bucket}, outside 0..=100")
            }
            ScoringError::UnknownCurve(c) => write!(f, "unknown curve {c}"),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ConfigurationError::*;
        match self {
            UnknownCurve(c) => write!(f, "scoring curve {c} is not defined"),
            CurveShape { curve, len } => write!(f, "curve {curve} has {len} buckets, expected 101"),
            CurveValue { curve, bucket, value } => {
                write!(f, "curve {curve} bucket {bucket} has invalid score {value}")
            }
            MissingLookup(k) => write!(f, "curve lookup has no attribute for score {k}"),
            DuplicateWeight { season, attribute } => {
                write!(f, "duplicate scoring weight for ({season}, {attribute})")
            }
            InvalidWeight { season, attribute, value } => {
                write!(f, "scoring weight for ({season}, {attribute}) must be finite and >= 0, got {value}")
            }
            MissingWeight { season, attribute } => {
                write!(f, "missing scoring weight for ({season}, {attribute})")
            }
            MissingFunctionWeight { season, function } => {
                write!(f, "missing function weight for ({season}, {function})")
            }
            ZeroFunctionWeight { season, function } => {
                write!(f, "function weight for ({season}, {function}) is zero")
            }
            MissingMultiplier(cat) => write!(f, "no policy multiplier for management category {cat}"),
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use InputError::*;
        match self {
            MissingPrecipWeights => write!(f, "non-meadow map unit lacks arid/mesic weights"),
            PrecipWeightsSum { arid, mesic } => {
                write!(f, "arid ({arid}) + mesic ({mesic}) must equal 1")
            }
            MissingHsi(season) => write!(f, "indirect-benefit map unit lacks the {season} HSI"),
            MissingBaselineSeason(season) => write!(f, "standard baseline lacks season {season}"),
            DuplicateRow { table } => write!(f, "map unit appears more than once in {table}"),
            DivergentDuplicate { attribute, values } => {
                write!(f, "projected {attribute} duplicates disagree: {values:?}")
            }
            NonFinite(field) => write!(f, "{field} is not a finite number"),
        }
    }
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcError::Scoring { stage, map_unit, source } => {
                write!(f, "{stage} failed for map unit {map_unit}: {source}")
            }
            CalcError::Input { stage, map_unit, source } => {
                write!(f, "{stage} failed for map unit {map_unit}: {source}")
            }
            CalcError::Join { stage, map_unit, missing_from } => {
                write!(f, "{stage} failed for map unit {map_unit}: missing from {missing_from}")
            }
            CalcError::Configuration { stage, source } => {
                write!(f, "{stage} configuration error: {source}")
            }
            CalcError::Scenario { scenario, source } => write!(f, "scenario {scenario}: {source}"),
        }
    }
}

impl std::error::Error for ScoringError {}
impl std::error::Error for ConfigurationError {}
impl std::error::Error for InputError {}

impl std::error::Error for CalcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CalcError::Scoring { source, .. } => Some(source),
            CalcError::Input { source, .. } => Some(source),
            CalcError::Configuration { source, .. } => Some(source),
            CalcError::Scenario { source, .. } => Some(source.as_ref()),
            CalcError::Join { .. } => None,
        }
    }
}
