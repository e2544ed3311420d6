//! ccs_pipeline: orchestration of the credit engine.
//!
//! load (ccs_io) → current credits → projected credits → scenario report → run record.
//! All math lives in `ccs_algo`; all file formats, hashing and writes in `ccs_io`.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::path::Path;

use ccs_algo::CalcError;
use ccs_core::entities::ProjectedValue;
use ccs_core::results::{CreditRow, ScenarioReport};
use ccs_core::CalcOptions;
use ccs_io::loader::{self, LoadedProject};
use ccs_io::manifest::{InputTable, ManifestError};
use ccs_io::IoError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod artifacts;
pub mod build_run_record;
pub mod calculator;
pub mod scenario;

pub use artifacts::{write_outputs, WrittenFile};
pub use build_run_record::{ProjectionSource, RunRecord};
pub use calculator::{run_calculator, Calibration, CalculatorRun};
pub use scenario::{run_scenario_report, ScenarioOutputs};

/// Engine identifiers recorded in every run record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMeta {
    pub name: String,
    pub version: String,
}

/// An externally supplied projected-values table and its raw digest.
#[derive(Debug, Clone)]
pub struct ProjectedOverride {
    pub rows: Vec<ProjectedValue>,
    pub sha256: String,
}

/// Loaded project plus everything that shapes one run.
#[derive(Debug)]
pub struct PipelineCtx {
    pub loaded: LoadedProject,
    pub engine_meta: EngineMeta,
    /// Effective options (manifest options with any caller overrides applied).
    pub options: CalcOptions,
    pub projected_override: Option<ProjectedOverride>,
    /// Also build the scenario report.
    pub scenarios: bool,
}

impl PipelineCtx {
    /// Context with the manifest's own options, no override, scenarios on.
    pub fn new(loaded: LoadedProject) -> Self {
        let options = loaded.manifest.options;
        PipelineCtx { loaded, engine_meta: engine_identifiers(), options, projected_override: None, scenarios: true }
    }
}

/// Output tables, intermediates and the run record of one run.
#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    pub current_credits: Vec<CreditRow>,
    pub projected_credits: Vec<CreditRow>,
    pub scenario: Option<ScenarioOutputs>,
    pub intermediates: CalculatorRun,
    pub run_record: RunRecord,
}

impl PipelineOutputs {
    pub fn scenario_report(&self) -> Option<&ScenarioReport> {
        self.scenario.as_ref().map(|s| &s.report)
    }
}

/// Single error surface for orchestration.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("io: {0}")]
    Io(String),
    #[error("manifest: {0}")]
    Manifest(String),
    /// Input bytes do not match a declared digest.
    #[error("verify: {0}")]
    Verify(String),
    #[error("validate: {0}")]
    Validate(String),
    #[error(transparent)]
    Calc(#[from] CalcError),
    #[error("build: {0}")]
    Build(String),
}

impl From<IoError> for PipelineError {
    fn from(e: IoError) -> Self {
        use PipelineError::*;
        match e {
            IoError::Path(m) => Io(m),
            IoError::Json { table, msg } => Validate(format!("{table}: {msg}")),
            IoError::Manifest(m @ ManifestError::DigestMismatch { .. }) => Verify(m.to_string()),
            IoError::Manifest(m @ ManifestError::Io(..)) => Io(m.to_string()),
            IoError::Manifest(m) => Manifest(m.to_string()),
            IoError::Hash(h) => Build(h.to_string()),
            IoError::Validation(v) => Validate(v.to_string()),
        }
    }
}

/// Run one project: current and projected credits, optional scenario report, run record.
pub fn run_project(ctx: &PipelineCtx) -> Result<PipelineOutputs, PipelineError> {
    let inputs = &ctx.loaded.inputs;
    let _span = tracing::info_span!("run_project", project = ctx.loaded.manifest.id.as_deref().unwrap_or("-")).entered();

    let over = ctx.projected_override.as_ref().map(|o| o.rows.as_slice());
    let run = run_calculator(inputs, ctx.options, over)?;
    let scenario = if ctx.scenarios { Some(run_scenario_report(inputs, ctx.options, &run)?) } else { None };

    let mut outputs = BTreeMap::new();
    outputs.insert("current_credits".to_string(), build_run_record::output_digest("current_credits", &run.current_credits)?);
    outputs.insert(
        "projected_credits".to_string(),
        build_run_record::output_digest("projected_credits", &run.projected_credits)?,
    );
    if let Some(s) = &scenario {
        outputs.insert("scenario_report".to_string(), build_run_record::output_digest("scenario_report", &s.report)?);
    }

    let mut input_digests: BTreeMap<String, String> =
        ctx.loaded.input_digests.iter().map(|(t, d)| (t.to_string(), d.clone())).collect();
    let projection_source = match &ctx.projected_override {
        Some(o) => {
            input_digests.insert(InputTable::ProjectedValues.to_string(), o.sha256.clone());
            ProjectionSource::Override
        }
        None => ProjectionSource::Manifest,
    };

    let run_record = build_run_record::build_run_record(build_run_record::RunRecordParts {
        engine: ctx.engine_meta.clone(),
        project: ctx.loaded.manifest.id.clone(),
        inputs: input_digests,
        projection_source,
        options: ctx.options,
        outputs,
        divergent_duplicates: &run.divergent,
    })?;

    tracing::info!(
        run_id = %run_record.id,
        current = run.current_credits.len(),
        projected = run.projected_credits.len(),
        divergent = run.divergent.len(),
        "run complete"
    );
    Ok(PipelineOutputs {
        current_credits: run.current_credits.clone(),
        projected_credits: run.projected_credits.clone(),
        scenario,
        intermediates: run,
        run_record,
    })
}

/// Convenience entry: load a manifest and run it with its own options.
pub fn run_from_manifest_path<P: AsRef<Path>>(path: P) -> Result<PipelineOutputs, PipelineError> {
    let loaded = loader::load_project(path.as_ref())?;
    run_project(&PipelineCtx::new(loaded))
}

/// Check a loaded project resolves: curves, weights and curve lookup bind into an engine.
pub fn validate_project(loaded: &LoadedProject, options: CalcOptions) -> Result<(), PipelineError> {
    let calibration = Calibration::resolve(&loaded.inputs, options)?;
    calibration.engine(&loaded.inputs)?;
    Ok(())
}

pub fn engine_identifiers() -> EngineMeta {
    EngineMeta { name: "ccs_engine".to_string(), version: env!("CARGO_PKG_VERSION").to_string() }
}
